use std::sync::Arc;

use crate::services::providers::{CorpusProvider, FeedbackProvider, RecommendationLog};
use crate::services::{Catalog, RecommendationEngine};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RecommendationEngine>,
    pub catalog: Arc<Catalog>,
    /// Served recommendations; also the feedback source for retraining
    pub log: Arc<RecommendationLog>,
    pub corpus: Arc<dyn CorpusProvider>,
}

impl AppState {
    /// Creates state with the seeded catalog and an empty recommendation log
    pub fn new(engine: Arc<RecommendationEngine>, corpus: Arc<dyn CorpusProvider>) -> Self {
        Self {
            engine,
            catalog: Arc::new(Catalog::seeded()),
            log: Arc::new(RecommendationLog::new()),
            corpus,
        }
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn with_log(mut self, log: Arc<RecommendationLog>) -> Self {
        self.log = log;
        self
    }

    pub fn feedback(&self) -> Arc<dyn FeedbackProvider> {
        self.log.clone()
    }
}
