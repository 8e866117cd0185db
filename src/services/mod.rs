pub mod catalog;
pub mod classifier;
pub mod encoder;
pub mod engine;
pub mod feedback;
pub mod forest;
pub mod metrics;
pub mod normalizer;
pub mod notes;
pub mod providers;
pub mod retrain;
pub mod scheduler;

pub use catalog::{reason_for, Catalog, CatalogMatch, MatchFactor};
pub use engine::{
    EngineConfig, EngineStatus, LoadOutcome, ModelState, RecommendationEngine, TrainingOutcome,
    TrainingReport,
};
pub use normalizer::CategoryNormalizer;
pub use notes::select_notes;
pub use retrain::{Freshness, RetrainPolicy};
pub use scheduler::{RetrainScheduler, SchedulerHandle};
