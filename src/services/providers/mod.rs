//! Training data sources
//!
//! The engine never reads files or history directly. Corpus rows and
//! feedback events are pulled through these traits on every training run,
//! so sources can be swapped (seed data, JSON exports, the live
//! recommendation log) or mocked in tests.
use crate::{
    error::ModelResult,
    models::{CorpusRow, FeedbackEvent},
};

pub mod json_file;
pub mod log;
pub mod memory;
pub mod seed;

pub use json_file::JsonCorpusFile;
pub use log::{CategoryFeedback, FeedbackRejection, FeedbackStats, RecommendationLog};
pub use memory::{StaticCorpus, StaticFeedback};
pub use seed::SeedCorpus;

/// Source of labelled survey rows
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CorpusProvider: Send + Sync {
    /// Loads every corpus row; rows are normalized and filtered by the engine
    async fn load_corpus(&self) -> ModelResult<Vec<CorpusRow>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Source of historical like/dislike events
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FeedbackProvider: Send + Sync {
    async fn load_feedback(&self) -> ModelResult<Vec<FeedbackEvent>>;

    fn name(&self) -> &'static str;
}
