use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Whether the published model should be retrained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Stale,
    Fresh,
}

/// Age- and feedback-based retrain trigger
#[derive(Debug, Clone)]
pub struct RetrainPolicy {
    max_age: Duration,
    feedback_threshold: u64,
    last_retrain: Option<DateTime<Utc>>,
    feedback_since_retrain: u64,
}

impl Default for RetrainPolicy {
    fn default() -> Self {
        Self::new(Duration::days(7), 50)
    }
}

impl RetrainPolicy {
    pub fn new(max_age: Duration, feedback_threshold: u64) -> Self {
        Self {
            max_age,
            feedback_threshold,
            last_retrain: None,
            feedback_since_retrain: 0,
        }
    }

    pub fn last_retrain(&self) -> Option<DateTime<Utc>> {
        self.last_retrain
    }

    pub fn feedback_since_retrain(&self) -> u64 {
        self.feedback_since_retrain
    }

    pub fn feedback_threshold(&self) -> u64 {
        self.feedback_threshold
    }

    pub fn mark_trained(&mut self, at: DateTime<Utc>) {
        self.last_retrain = Some(at);
        self.feedback_since_retrain = 0;
    }

    pub fn observe_feedback(&mut self) {
        self.feedback_since_retrain = self.feedback_since_retrain.saturating_add(1);
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> Freshness {
        let Some(last) = self.last_retrain else {
            return Freshness::Stale;
        };
        if now - last >= self.max_age || self.feedback_since_retrain >= self.feedback_threshold {
            Freshness::Stale
        } else {
            Freshness::Fresh
        }
    }

    pub fn is_stale(&self) -> bool {
        self.state_at(Utc::now()) == Freshness::Stale
    }
}
