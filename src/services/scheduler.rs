use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::ModelError;

use super::engine::{RecommendationEngine, TrainingOutcome};
use super::providers::{CorpusProvider, FeedbackProvider};

/// Handle for gracefully shutting down the retrain scheduler
pub struct SchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signals the scheduler and waits for it to stop.
    ///
    /// A training run already in progress finishes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Retrain scheduler shutdown signal sent");
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Retrain scheduler task failed");
        }
    }
}

/// Periodically retrains the model once it goes stale
pub struct RetrainScheduler {
    engine: Arc<RecommendationEngine>,
    corpus: Arc<dyn CorpusProvider>,
    feedback: Arc<dyn FeedbackProvider>,
}

impl RetrainScheduler {
    pub fn new(
        engine: Arc<RecommendationEngine>,
        corpus: Arc<dyn CorpusProvider>,
        feedback: Arc<dyn FeedbackProvider>,
    ) -> Self {
        Self {
            engine,
            corpus,
            feedback,
        }
    }

    /// Retrains and saves when the model is stale.
    ///
    /// Failures are logged and swallowed so the next tick can try again.
    pub async fn check(&self) -> Option<TrainingOutcome> {
        if !self.engine.is_stale() {
            return None;
        }

        tracing::info!("Model is stale, retraining");
        match self
            .engine
            .train_and_save(self.corpus.as_ref(), self.feedback.as_ref(), false)
            .await
        {
            Ok(outcome) => {
                if let TrainingOutcome::Trained(report) = &outcome {
                    tracing::info!(
                        micro_f1 = report.evaluation.micro_f1,
                        feedback = report.feedback_examples,
                        "Scheduled retrain finished"
                    );
                }
                Some(outcome)
            }
            Err(ModelError::TrainingInProgress) => {
                tracing::debug!("Training already running, skipping scheduled retrain");
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "Scheduled retrain failed");
                None
            }
        }
    }

    /// Spawns the polling loop on the runtime
    pub fn spawn(self, every: Duration) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let task = tokio::spawn(async move {
            tracing::info!(interval_secs = every.as_secs(), "Retrain scheduler started");
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.check().await;
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Retrain scheduler stopped");
                        break;
                    }
                }
            }
        });

        SchedulerHandle { shutdown_tx, task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CorpusRow, TraitRecord};
    use crate::services::classifier::ClassifierConfig;
    use crate::services::engine::EngineConfig;
    use crate::services::forest::ForestParams;
    use crate::services::providers::{StaticCorpus, StaticFeedback};

    fn scheduler(dir: &tempfile::TempDir) -> RetrainScheduler {
        let config = EngineConfig {
            classifier: ClassifierConfig {
                params: ForestParams {
                    n_estimators: 5,
                    ..Default::default()
                },
                search: None,
                ..Default::default()
            },
            model_path: dir.path().join("model.json"),
            ..Default::default()
        };
        let rows = (0..20u32)
            .map(|i| {
                let traits = TraitRecord {
                    age: Some(20 + i * 2),
                    ..Default::default()
                };
                CorpusRow::new(traits, if i < 10 { "citrus" } else { "amber" })
            })
            .collect();

        RetrainScheduler::new(
            Arc::new(RecommendationEngine::new(config)),
            Arc::new(StaticCorpus::new(rows)),
            Arc::new(StaticFeedback::empty()),
        )
    }

    #[tokio::test]
    async fn test_check_trains_stale_model_once() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = scheduler(&dir);

        let first = scheduler.check().await;
        assert!(matches!(first, Some(TrainingOutcome::Trained(_))));
        assert!(dir.path().join("model.json").exists());

        assert!(scheduler.check().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_spawned_scheduler_trains_and_shuts_down() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = scheduler(&dir);
        let engine = scheduler.engine.clone();

        let handle = scheduler.spawn(Duration::from_millis(20));
        for _ in 0..500 {
            if engine.is_trained() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        handle.shutdown().await;

        assert!(engine.is_trained());
    }
}
