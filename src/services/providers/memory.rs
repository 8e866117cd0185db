use crate::{
    error::ModelResult,
    models::{CorpusRow, FeedbackEvent},
};

use super::{CorpusProvider, FeedbackProvider};

/// Corpus held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticCorpus {
    rows: Vec<CorpusRow>,
}

impl StaticCorpus {
    pub fn new(rows: Vec<CorpusRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait::async_trait]
impl CorpusProvider for StaticCorpus {
    async fn load_corpus(&self) -> ModelResult<Vec<CorpusRow>> {
        Ok(self.rows.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Fixed list of feedback events
#[derive(Debug, Clone, Default)]
pub struct StaticFeedback {
    events: Vec<FeedbackEvent>,
}

impl StaticFeedback {
    pub fn new(events: Vec<FeedbackEvent>) -> Self {
        Self { events }
    }

    /// No feedback at all
    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl FeedbackProvider for StaticFeedback {
    async fn load_feedback(&self) -> ModelResult<Vec<FeedbackEvent>> {
        Ok(self.events.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
