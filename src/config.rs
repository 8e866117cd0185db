use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::services::classifier::{ClassifierConfig, SearchGrid, Strategy};
use crate::services::encoder::FeatureLayout;
use crate::services::engine::{EngineConfig, DEFAULT_MODEL_PATH};
use crate::services::feedback::FeedbackWeighter;
use crate::services::forest::ForestParams;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Location of the persisted model artifact
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// JSON corpus file; the built-in seed corpus is used when unset
    #[serde(default)]
    pub corpus_path: Option<PathBuf>,

    #[serde(default = "default_retrain_max_age_days")]
    pub retrain_max_age_days: i64,

    #[serde(default = "default_feedback_retrain_threshold")]
    pub feedback_retrain_threshold: u64,

    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,

    /// Maximum tree depth, unlimited when unset
    #[serde(default)]
    pub max_depth: Option<usize>,

    #[serde(default = "default_random_seed")]
    pub random_seed: u64,

    /// Cross-validated hyper-parameter search on every retrain
    #[serde(default = "default_true")]
    pub hyperparameter_search: bool,

    /// Classifier chain instead of independent per-category classifiers
    #[serde(default)]
    pub classifier_chain: bool,

    /// Also encode cost and durability preferences
    #[serde(default)]
    pub extended_traits: bool,

    #[serde(default = "default_feedback_like_weight")]
    pub feedback_like_weight: f64,

    #[serde(default = "default_feedback_dislike_weight")]
    pub feedback_dislike_weight: f64,

    #[serde(default = "default_feedback_horizon_days")]
    pub feedback_horizon_days: f64,

    #[serde(default = "default_feedback_weight_floor")]
    pub feedback_weight_floor: f64,

    /// How often the scheduler checks whether the model is stale
    #[serde(default = "default_scheduler_interval_secs")]
    pub scheduler_interval_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_model_path() -> PathBuf {
    PathBuf::from(DEFAULT_MODEL_PATH)
}

fn default_retrain_max_age_days() -> i64 {
    7
}

fn default_feedback_retrain_threshold() -> u64 {
    50
}

fn default_n_estimators() -> usize {
    100
}

fn default_random_seed() -> u64 {
    42
}

fn default_true() -> bool {
    true
}

fn default_feedback_like_weight() -> f64 {
    2.0
}

fn default_feedback_dislike_weight() -> f64 {
    1.0
}

fn default_feedback_horizon_days() -> f64 {
    365.0
}

fn default_feedback_weight_floor() -> f64 {
    0.1
}

fn default_scheduler_interval_secs() -> u64 {
    3600
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.n_estimators == 0 {
            anyhow::bail!("N_ESTIMATORS must be at least 1");
        }
        if self.feedback_horizon_days <= 0.0 {
            anyhow::bail!("FEEDBACK_HORIZON_DAYS must be positive");
        }
        if !(0.0..=1.0).contains(&self.feedback_weight_floor) {
            anyhow::bail!("FEEDBACK_WEIGHT_FLOOR must be within [0, 1]");
        }
        if self.scheduler_interval_secs == 0 {
            anyhow::bail!("SCHEDULER_INTERVAL_SECS must be at least 1");
        }
        Ok(())
    }

    pub fn scheduler_interval(&self) -> Duration {
        Duration::from_secs(self.scheduler_interval_secs)
    }

    /// Engine settings derived from this configuration
    pub fn engine_config(&self) -> EngineConfig {
        let params = ForestParams {
            n_estimators: self.n_estimators,
            max_depth: self.max_depth,
            seed: self.random_seed,
            ..Default::default()
        };

        EngineConfig {
            layout: if self.extended_traits {
                FeatureLayout::extended()
            } else {
                FeatureLayout::standard()
            },
            classifier: ClassifierConfig {
                strategy: if self.classifier_chain {
                    Strategy::Chain
                } else {
                    Strategy::OneVsRest
                },
                params,
                search: self
                    .hyperparameter_search
                    .then(|| SearchGrid::around(params)),
                ..Default::default()
            },
            weighter: FeedbackWeighter {
                like_weight: self.feedback_like_weight,
                dislike_weight: self.feedback_dislike_weight,
                horizon_days: self.feedback_horizon_days,
                floor: self.feedback_weight_floor,
            },
            max_age: chrono::Duration::days(self.retrain_max_age_days),
            feedback_threshold: self.feedback_retrain_threshold,
            model_path: self.model_path.clone(),
        }
    }
}
