use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    error::ModelResult,
    models::{Category, FeedbackEvent, RecommendationRecord},
};

use super::FeedbackProvider;

/// Why a feedback submission was refused
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeedbackRejection {
    #[error("Recommendation {0} does not exist")]
    UnknownRecommendation(Uuid),
    #[error("Recommendation {0} already has feedback")]
    AlreadyRated(Uuid),
}

/// Like/dislike counts for one category
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CategoryFeedback {
    pub recommended: usize,
    pub liked: usize,
    pub disliked: usize,
    /// Liked share of rated recommendations, `None` before any rating
    pub like_rate: Option<f64>,
}

/// Aggregate view of served recommendations and their feedback
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedbackStats {
    pub total_recommendations: usize,
    pub rated: usize,
    pub liked: usize,
    pub disliked: usize,
    pub like_rate: Option<f64>,
    pub per_category: BTreeMap<Category, CategoryFeedback>,
}

fn rate(liked: usize, disliked: usize) -> Option<f64> {
    let rated = liked + disliked;
    (rated > 0).then(|| liked as f64 / rated as f64)
}

/// In-memory history of served recommendations.
///
/// Stands in for a persistent store: records are never evicted and the
/// whole history, along with the engine's feedback counter, is lost on
/// restart.
#[derive(Debug, Default)]
pub struct RecommendationLog {
    records: RwLock<HashMap<Uuid, RecommendationRecord>>,
}

impl RecommendationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, record: RecommendationRecord) {
        self.records.write().insert(record.id, record);
    }

    pub fn get(&self, id: Uuid) -> Option<RecommendationRecord> {
        self.records.read().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Stores a like or dislike; each recommendation accepts one rating
    pub fn set_feedback(
        &self,
        id: Uuid,
        is_liked: bool,
    ) -> Result<RecommendationRecord, FeedbackRejection> {
        let mut records = self.records.write();
        let record = records
            .get_mut(&id)
            .ok_or(FeedbackRejection::UnknownRecommendation(id))?;
        if record.is_liked.is_some() {
            return Err(FeedbackRejection::AlreadyRated(id));
        }
        record.is_liked = Some(is_liked);
        Ok(record.clone())
    }

    /// Rated recommendations as training feedback, oldest first
    pub fn feedback_events(&self) -> Vec<FeedbackEvent> {
        let mut events: Vec<FeedbackEvent> = self
            .records
            .read()
            .values()
            .filter_map(|r| {
                r.is_liked.map(|is_liked| FeedbackEvent {
                    traits: r.traits.clone(),
                    category: r.category.as_str().to_string(),
                    is_liked,
                    created_at: r.created_at,
                })
            })
            .collect();
        events.sort_by_key(|e| e.created_at);
        events
    }

    pub fn stats(&self) -> FeedbackStats {
        let records = self.records.read();
        let mut stats = FeedbackStats {
            total_recommendations: records.len(),
            ..Default::default()
        };

        for record in records.values() {
            let entry = stats.per_category.entry(record.category).or_default();
            entry.recommended += 1;
            match record.is_liked {
                Some(true) => {
                    entry.liked += 1;
                    stats.liked += 1;
                }
                Some(false) => {
                    entry.disliked += 1;
                    stats.disliked += 1;
                }
                None => {}
            }
        }

        for entry in stats.per_category.values_mut() {
            entry.like_rate = rate(entry.liked, entry.disliked);
        }
        stats.rated = stats.liked + stats.disliked;
        stats.like_rate = rate(stats.liked, stats.disliked);
        stats
    }
}

#[async_trait::async_trait]
impl FeedbackProvider for RecommendationLog {
    async fn load_feedback(&self) -> ModelResult<Vec<FeedbackEvent>> {
        let events = self.feedback_events();
        tracing::debug!(events = events.len(), "Collected feedback from log");
        Ok(events)
    }

    fn name(&self) -> &'static str {
        "recommendation_log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TraitRecord;
    use chrono::{Duration, Utc};

    fn record(category: Category, minutes_ago: i64) -> RecommendationRecord {
        RecommendationRecord {
            id: Uuid::new_v4(),
            traits: TraitRecord {
                age: Some(28),
                ..Default::default()
            },
            category,
            perfume_id: None,
            confidence: 0.7,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
            is_liked: None,
        }
    }

    #[test]
    fn test_feedback_is_accepted_once() {
        let log = RecommendationLog::new();
        let rec = record(Category::Citrus, 0);
        let id = rec.id;
        log.record(rec);

        let updated = log.set_feedback(id, true).unwrap();
        assert_eq!(updated.is_liked, Some(true));
        assert_eq!(
            log.set_feedback(id, false),
            Err(FeedbackRejection::AlreadyRated(id))
        );
        assert_eq!(log.get(id).unwrap().is_liked, Some(true));
    }

    #[test]
    fn test_unknown_recommendation() {
        let log = RecommendationLog::new();
        let id = Uuid::new_v4();
        assert_eq!(
            log.set_feedback(id, true),
            Err(FeedbackRejection::UnknownRecommendation(id))
        );
    }

    #[test]
    fn test_feedback_events_only_include_rated() {
        let log = RecommendationLog::new();
        let newer = record(Category::Woody, 1);
        let older = record(Category::Citrus, 10);
        let unrated = record(Category::Musk, 5);
        let (newer_id, older_id) = (newer.id, older.id);
        log.record(newer);
        log.record(older);
        log.record(unrated);

        log.set_feedback(newer_id, false).unwrap();
        log.set_feedback(older_id, true).unwrap();

        let events = log.feedback_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].category, "citrus");
        assert!(events[0].is_liked);
        assert_eq!(events[1].category, "woody");
        assert!(!events[1].is_liked);
    }

    #[test]
    fn test_stats() {
        let log = RecommendationLog::new();
        let mut ids = Vec::new();
        for category in [Category::Citrus, Category::Citrus, Category::Citrus, Category::Woody] {
            let rec = record(category, 0);
            ids.push(rec.id);
            log.record(rec);
        }
        log.set_feedback(ids[0], true).unwrap();
        log.set_feedback(ids[1], false).unwrap();
        log.set_feedback(ids[2], true).unwrap();

        let stats = log.stats();
        assert_eq!(stats.total_recommendations, 4);
        assert_eq!(stats.rated, 3);
        assert_eq!(stats.liked, 2);
        assert_eq!(stats.disliked, 1);

        let citrus = stats.per_category[&Category::Citrus];
        assert_eq!(citrus.recommended, 3);
        assert!((citrus.like_rate.unwrap() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(stats.per_category[&Category::Woody].like_rate, None);
    }

    #[tokio::test]
    async fn test_log_is_a_feedback_provider() {
        let log = RecommendationLog::new();
        let rec = record(Category::Floral, 0);
        let id = rec.id;
        log.record(rec);
        log.set_feedback(id, true).unwrap();

        let events = log.load_feedback().await.unwrap();
        assert_eq!(events.len(), 1);
    }
}
