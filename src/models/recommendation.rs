use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Category, CategorySet, ConfidenceMap, TraitRecord};

/// A category assigned to a note layer together with its confidence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteChoice {
    pub category: Category,
    pub confidence: f64,
}

/// Three-layer scent profile derived from a confidence map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteSelection {
    pub top: NoteChoice,
    pub middle: NoteChoice,
    pub base: NoteChoice,
    /// Categories not chosen for any layer, highest confidence first
    pub others: Vec<NoteChoice>,
}

/// Result of a single model inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Hard multilabel decision
    pub categories: CategorySet,
    pub confidence: ConfidenceMap,
    pub notes: NoteSelection,
}

impl Prediction {
    /// The most confident category, ties resolved by taxonomy order
    pub fn primary(&self) -> NoteChoice {
        self.confidence
            .iter()
            .fold(None::<NoteChoice>, |best, (category, confidence)| match best {
                Some(b) if b.confidence >= *confidence => Some(b),
                _ => Some(NoteChoice {
                    category: *category,
                    confidence: *confidence,
                }),
            })
            .unwrap_or(self.notes.top)
    }
}

/// A served recommendation, kept for feedback collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub id: Uuid,
    pub traits: TraitRecord,
    pub category: Category,
    pub perfume_id: Option<Uuid>,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub is_liked: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::zero_confidence;

    fn choice(category: Category, confidence: f64) -> NoteChoice {
        NoteChoice {
            category,
            confidence,
        }
    }

    #[test]
    fn test_primary_picks_highest_confidence() {
        let mut confidence = zero_confidence();
        confidence.insert(Category::Woody, 0.4);
        confidence.insert(Category::Citrus, 0.7);

        let prediction = Prediction {
            categories: CategorySet::from([Category::Citrus]),
            confidence,
            notes: NoteSelection {
                top: choice(Category::Citrus, 0.7),
                middle: choice(Category::Floral, 0.0),
                base: choice(Category::Woody, 0.4),
                others: Vec::new(),
            },
        };
        assert_eq!(prediction.primary(), choice(Category::Citrus, 0.7));
    }

    #[test]
    fn test_primary_ties_prefer_declaration_order() {
        let mut confidence = zero_confidence();
        confidence.insert(Category::Musk, 0.5);
        confidence.insert(Category::Fruity, 0.5);

        let prediction = Prediction {
            categories: CategorySet::new(),
            confidence,
            notes: NoteSelection {
                top: choice(Category::Fruity, 0.5),
                middle: choice(Category::Floral, 0.0),
                base: choice(Category::Musk, 0.5),
                others: Vec::new(),
            },
        };
        assert_eq!(prediction.primary().category, Category::Fruity);
    }
}
