use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CategorySet, FeedbackEvent, TrainingExample};

use super::normalizer::CategoryNormalizer;

/// Turns like/dislike events into weighted training examples
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackWeighter {
    pub like_weight: f64,
    pub dislike_weight: f64,
    /// Days after which the linear decay reaches the floor
    pub horizon_days: f64,
    /// Smallest multiplier any event can decay to
    pub floor: f64,
}

impl Default for FeedbackWeighter {
    fn default() -> Self {
        Self {
            like_weight: 2.0,
            dislike_weight: 1.0,
            horizon_days: 365.0,
            floor: 0.1,
        }
    }
}

/// Counts of the feedback seen during one training run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackSummary {
    pub liked: usize,
    pub disliked: usize,
    /// Liked events whose category could not be used as a label
    pub unusable: usize,
}

impl FeedbackWeighter {
    fn base(&self, is_liked: bool) -> f64 {
        if is_liked {
            self.like_weight
        } else {
            self.dislike_weight
        }
    }

    /// Non-increasing in age, floored so old feedback never vanishes
    pub fn decay(&self, age_in_days: i64) -> f64 {
        let age = age_in_days.max(0) as f64;
        (1.0 - age / self.horizon_days).max(self.floor)
    }

    pub fn weight(&self, is_liked: bool, age_in_days: i64) -> f64 {
        self.base(is_liked) * self.decay(age_in_days)
    }

    /// Builds positive examples from liked events.
    ///
    /// Disliked events are only counted; they do not become negative examples.
    pub fn build_examples(
        &self,
        events: &[FeedbackEvent],
        normalizer: &CategoryNormalizer,
        now: DateTime<Utc>,
    ) -> (Vec<TrainingExample>, FeedbackSummary) {
        let mut summary = FeedbackSummary::default();
        let mut examples = Vec::new();

        for event in events {
            if !event.is_liked {
                summary.disliked += 1;
                continue;
            }
            summary.liked += 1;

            let labels: CategorySet = normalizer
                .normalize(&event.category)
                .into_iter()
                .filter(|c| !c.is_sentinel())
                .collect();
            if labels.is_empty() {
                summary.unusable += 1;
                tracing::debug!(category = %event.category, "Dropping feedback with unusable category");
                continue;
            }

            let weight = self.weight(true, event.age_in_days(now));
            examples.push(TrainingExample::feedback(event.traits.clone(), labels, weight));
        }

        tracing::info!(
            liked = summary.liked,
            disliked = summary.disliked,
            unusable = summary.unusable,
            examples = examples.len(),
            "Prepared feedback examples"
        );

        (examples, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Provenance, TraitRecord};
    use chrono::Duration;

    fn event(category: &str, is_liked: bool, days_ago: i64, now: DateTime<Utc>) -> FeedbackEvent {
        FeedbackEvent {
            traits: TraitRecord {
                age: Some(33),
                ..Default::default()
            },
            category: category.to_string(),
            is_liked,
            created_at: now - Duration::days(days_ago),
        }
    }

    #[test]
    fn test_like_outweighs_dislike() {
        let weighter = FeedbackWeighter::default();
        let liked = weighter.weight(true, 0);
        let disliked = weighter.weight(false, 0);
        assert!(liked > disliked);
        assert!(disliked > 0.0);
        assert_eq!(liked, 2.0 * disliked);
    }

    #[test]
    fn test_decay_is_monotonic() {
        let weighter = FeedbackWeighter::default();
        let mut previous = f64::INFINITY;
        for days in (0..800).step_by(7) {
            let w = weighter.weight(true, days);
            assert!(w <= previous);
            previous = w;
        }
    }

    #[test]
    fn test_decay_reaches_floor() {
        let weighter = FeedbackWeighter::default();
        for liked in [true, false] {
            let fresh = weighter.weight(liked, 0);
            let ancient = weighter.weight(liked, 10_000);
            assert!((ancient - fresh * weighter.floor).abs() < 1e-12);
            assert!(ancient > 0.0);
        }
    }

    #[test]
    fn test_negative_age_is_treated_as_fresh() {
        let weighter = FeedbackWeighter::default();
        assert_eq!(weighter.weight(true, -5), weighter.weight(true, 0));
    }

    #[test]
    fn test_build_examples_uses_only_likes() {
        let now = Utc::now();
        let weighter = FeedbackWeighter::default();
        let events = vec![
            event("woody", true, 0, now),
            event("citrus", false, 0, now),
            event("우디", true, 73, now),
            event("???", true, 0, now),
        ];

        let (examples, summary) =
            weighter.build_examples(&events, &CategoryNormalizer::new(), now);

        assert_eq!(summary.liked, 3);
        assert_eq!(summary.disliked, 1);
        assert_eq!(summary.unusable, 1);
        assert_eq!(examples.len(), 2);
        for example in &examples {
            assert_eq!(example.provenance, Provenance::Feedback);
            assert!(example.labels.contains(&Category::Woody));
        }
        assert_eq!(examples[0].weight, 2.0);
        assert!((examples[1].weight - 2.0 * (1.0 - 73.0 / 365.0)).abs() < 1e-9);
    }
}
