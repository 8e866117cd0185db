use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CategorySet, TraitRecord};

/// One raw survey/catalog row: user traits plus free-text category description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusRow {
    #[serde(flatten)]
    pub traits: TraitRecord,
    #[serde(alias = "perfume_category", alias = "preferred_note")]
    pub category: String,
}

impl CorpusRow {
    pub fn new(traits: TraitRecord, category: impl Into<String>) -> Self {
        Self {
            traits,
            category: category.into(),
        }
    }
}

/// A historical like/dislike reaction to a recommended category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEvent {
    /// Traits of the user at the time of the recommendation
    pub traits: TraitRecord,
    pub category: String,
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
}

impl FeedbackEvent {
    /// Whole days elapsed between the event and `now`, never negative
    pub fn age_in_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days().max(0)
    }
}

/// Where a training example came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Corpus,
    Feedback,
}

/// A labelled, weighted example handed to the classifier
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    pub record: TraitRecord,
    pub labels: CategorySet,
    pub weight: f64,
    pub provenance: Provenance,
}

impl TrainingExample {
    /// Corpus example with the fixed weight of 1.0
    pub fn corpus(record: TraitRecord, labels: CategorySet) -> Self {
        Self {
            record,
            labels,
            weight: 1.0,
            provenance: Provenance::Corpus,
        }
    }

    pub fn feedback(record: TraitRecord, labels: CategorySet, weight: f64) -> Self {
        Self {
            record,
            labels,
            weight,
            provenance: Provenance::Feedback,
        }
    }
}
