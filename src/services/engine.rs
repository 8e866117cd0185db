//! Model lifecycle: training, publication, inference and persistence.
//!
//! The published [`ModelState`] is immutable and shared through an `Arc`.
//! A training run builds a complete new state on the blocking pool and swaps
//! it in with a single write, so readers never observe a half-trained model
//! and a failed run leaves the previous state in service.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::models::{
    Category, CategorySet, CorpusRow, FeedbackEvent, Prediction, TraitRecord, TrainingExample,
};

use super::classifier::{
    self, ClassifierConfig, ClassifierError, LabelBinarizer, MultilabelClassifier, SearchOutcome,
    Strategy,
};
use super::encoder::{EncodingSchema, FeatureEncoder, FeatureLayout};
use super::feedback::{FeedbackSummary, FeedbackWeighter};
use super::forest::ForestParams;
use super::metrics::EvaluationReport;
use super::normalizer::CategoryNormalizer;
use super::notes::select_notes;
use super::providers::{CorpusProvider, FeedbackProvider};
use super::retrain::{Freshness, RetrainPolicy};

/// Bumped whenever the artifact layout changes
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

pub const DEFAULT_MODEL_PATH: &str = "ml_models/perfume_recommendation_model.json";

/// Everything the engine needs to train and persist a model
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub layout: FeatureLayout,
    pub classifier: ClassifierConfig,
    pub weighter: FeedbackWeighter,
    /// Model age at which a retrain is due
    pub max_age: Duration,
    /// Feedback events since the last retrain at which a retrain is due
    pub feedback_threshold: u64,
    pub model_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            layout: FeatureLayout::standard(),
            classifier: ClassifierConfig::default(),
            weighter: FeedbackWeighter::default(),
            max_age: Duration::days(7),
            feedback_threshold: 50,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
        }
    }
}

/// Summary of one successful training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub trained_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub corpus_rows: usize,
    pub corpus_examples: usize,
    /// Corpus rows whose category text had no usable taxonomy token
    pub dropped_rows: usize,
    pub feedback: FeedbackSummary,
    pub feedback_examples: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub feature_columns: usize,
    pub strategy: Strategy,
    pub params: ForestParams,
    pub search: Option<SearchOutcome>,
    /// Examples per category across corpus and feedback
    pub label_distribution: BTreeMap<Category, usize>,
    pub evaluation: EvaluationReport,
}

/// A fitted, immutable model ready for inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    schema: EncodingSchema,
    classifier: MultilabelClassifier,
    report: TrainingReport,
}

impl ModelState {
    pub fn schema(&self) -> &EncodingSchema {
        &self.schema
    }

    pub fn classifier(&self) -> &MultilabelClassifier {
        &self.classifier
    }

    pub fn binarizer(&self) -> &LabelBinarizer {
        self.classifier.binarizer()
    }

    pub fn report(&self) -> &TrainingReport {
        &self.report
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.report.trained_at
    }

    pub fn predict(&self, record: &TraitRecord) -> ModelResult<Prediction> {
        let vector = self.schema.transform(record);
        let (categories, confidence) = self.classifier.predict(&vector)?;
        let notes = select_notes(&confidence);
        Ok(Prediction {
            categories,
            confidence,
            notes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TrainingOutcome {
    /// The model was fresh and training was not forced
    Skipped { last_retrain: DateTime<Utc> },
    Trained(TrainingReport),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoadOutcome {
    Loaded { trained_at: DateTime<Utc> },
    Trained(TrainingReport),
}

/// Point-in-time view of the engine for status endpoints
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub trained: bool,
    pub freshness: Freshness,
    pub training_in_progress: bool,
    pub last_retrain: Option<DateTime<Utc>>,
    pub feedback_since_retrain: u64,
    pub feedback_threshold: u64,
    pub report: Option<TrainingReport>,
}

/// Turns raw rows and events into a published-ready model state.
///
/// Pure CPU work; callers run it on the blocking pool.
pub fn build_state(
    config: &EngineConfig,
    normalizer: &CategoryNormalizer,
    rows: Vec<CorpusRow>,
    events: Vec<FeedbackEvent>,
    now: DateTime<Utc>,
) -> ModelResult<ModelState> {
    let started = Instant::now();
    let corpus_rows = rows.len();

    let mut examples = Vec::with_capacity(rows.len());
    for row in rows {
        let labels: CategorySet = normalizer
            .normalize(&row.category)
            .into_iter()
            .filter(|c| !c.is_sentinel())
            .collect();
        if labels.is_empty() {
            tracing::debug!(category = %row.category, "Dropping corpus row with unusable category");
            continue;
        }
        examples.push(TrainingExample::corpus(row.traits, labels));
    }
    let corpus_examples = examples.len();
    let dropped_rows = corpus_rows - corpus_examples;
    if dropped_rows > 0 {
        tracing::warn!(dropped = dropped_rows, "Dropped corpus rows without a usable category");
    }

    let (feedback_examples, feedback) = config.weighter.build_examples(&events, normalizer, now);
    let n_feedback = feedback_examples.len();
    examples.extend(feedback_examples);

    if examples.len() < 2 {
        return Err(ClassifierError::InsufficientData {
            required: 2,
            got: examples.len(),
        }
        .into());
    }

    let schema = FeatureEncoder::new(config.layout.clone()).fit(examples.iter().map(|e| &e.record))?;
    let binarizer = LabelBinarizer::default();
    let x = schema.transform_batch(examples.iter().map(|e| &e.record));
    let y: Vec<Vec<bool>> = examples.iter().map(|e| binarizer.transform(&e.labels)).collect();
    let w: Vec<f64> = examples.iter().map(|e| e.weight).collect();

    let mut label_distribution = BTreeMap::new();
    for category in examples.iter().flat_map(|e| e.labels.iter()) {
        *label_distribution.entry(*category).or_insert(0) += 1;
    }

    tracing::info!(
        corpus = corpus_examples,
        feedback = n_feedback,
        columns = schema.width(),
        "Fitting classifier"
    );
    let fitted = classifier::fit_and_evaluate(&x, &y, &w, &config.classifier)?;

    let collapsed = fitted.evaluation.collapsed();
    if !collapsed.is_empty() {
        tracing::warn!(categories = ?collapsed, "Categories never predicted on the hold-out split");
    }

    let report = TrainingReport {
        trained_at: now,
        duration_ms: started.elapsed().as_millis() as u64,
        corpus_rows,
        corpus_examples,
        dropped_rows,
        feedback,
        feedback_examples: n_feedback,
        train_size: fitted.train_size,
        test_size: fitted.test_size,
        feature_columns: schema.width(),
        strategy: fitted.classifier.strategy(),
        params: fitted.classifier.params(),
        search: fitted.search,
        label_distribution,
        evaluation: fitted.evaluation,
    };

    Ok(ModelState {
        schema,
        classifier: fitted.classifier,
        report,
    })
}

#[derive(Serialize)]
struct ArtifactRef<'a> {
    format_version: u32,
    state: &'a ModelState,
}

#[derive(Deserialize)]
struct ArtifactHeader {
    format_version: u32,
}

#[derive(Deserialize)]
struct Artifact {
    state: ModelState,
}

/// Writes the artifact to a sibling temp file and renames it into place
fn write_artifact(path: &Path, state: &ModelState) -> ModelResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("json.tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer(
            &mut writer,
            &ArtifactRef {
                format_version: ARTIFACT_FORMAT_VERSION,
                state,
            },
        )
        .map_err(std::io::Error::from)?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Reads a saved model; `Ok(None)` when no artifact exists
fn read_artifact(path: &Path) -> ModelResult<Option<ModelState>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let header: ArtifactHeader = serde_json::from_str(&text)
        .map_err(|e| ModelError::CorruptArtifact(format!("unreadable header: {}", e)))?;
    if header.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(ModelError::CorruptArtifact(format!(
            "format version {} (expected {})",
            header.format_version, ARTIFACT_FORMAT_VERSION
        )));
    }

    let artifact: Artifact = serde_json::from_str(&text)
        .map_err(|e| ModelError::CorruptArtifact(e.to_string()))?;
    let state = artifact.state;
    if state.classifier.n_features() != state.schema.width() {
        return Err(ModelError::CorruptArtifact(format!(
            "classifier expects {} columns, schema produces {}",
            state.classifier.n_features(),
            state.schema.width()
        )));
    }
    Ok(Some(state))
}

fn join_error(e: tokio::task::JoinError) -> ModelError {
    ModelError::Task(e.to_string())
}

/// Owns the published model and coordinates retraining
pub struct RecommendationEngine {
    config: EngineConfig,
    normalizer: CategoryNormalizer,
    state: RwLock<Option<Arc<ModelState>>>,
    policy: Mutex<RetrainPolicy>,
    /// Held for the whole duration of a training run
    training: tokio::sync::Mutex<()>,
}

impl RecommendationEngine {
    pub fn new(config: EngineConfig) -> Self {
        let policy = RetrainPolicy::new(config.max_age, config.feedback_threshold);
        Self {
            config,
            normalizer: CategoryNormalizer::new(),
            state: RwLock::new(None),
            policy: Mutex::new(policy),
            training: tokio::sync::Mutex::new(()),
        }
    }

    /// Replaces the category normalizer, e.g. one extended with extra keywords
    pub fn with_normalizer(mut self, normalizer: CategoryNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &CategoryNormalizer {
        &self.normalizer
    }

    /// The published model, if any
    pub fn current(&self) -> Option<Arc<ModelState>> {
        self.state.read().clone()
    }

    pub fn is_trained(&self) -> bool {
        self.state.read().is_some()
    }

    pub fn is_stale(&self) -> bool {
        !self.is_trained() || self.policy.lock().is_stale()
    }

    /// Counts one feedback event towards the retrain threshold
    pub fn observe_feedback(&self) {
        self.policy.lock().observe_feedback();
    }

    pub fn predict(&self, record: &TraitRecord) -> ModelResult<Prediction> {
        let state = self.current().ok_or(ModelError::NotTrained)?;
        state.predict(record)
    }

    pub fn status(&self) -> EngineStatus {
        let policy = self.policy.lock().clone();
        let current = self.current();
        EngineStatus {
            trained: current.is_some(),
            freshness: if current.is_some() {
                policy.state_at(Utc::now())
            } else {
                Freshness::Stale
            },
            training_in_progress: self.training.try_lock().is_err(),
            last_retrain: policy.last_retrain(),
            feedback_since_retrain: policy.feedback_since_retrain(),
            feedback_threshold: policy.feedback_threshold(),
            report: current.map(|s| s.report.clone()),
        }
    }

    fn fresh_since(&self) -> Option<DateTime<Utc>> {
        if !self.is_trained() {
            return None;
        }
        let policy = self.policy.lock();
        match policy.state_at(Utc::now()) {
            Freshness::Fresh => policy.last_retrain(),
            Freshness::Stale => None,
        }
    }

    fn publish(&self, state: ModelState) {
        let trained_at = state.trained_at();
        *self.state.write() = Some(Arc::new(state));
        self.policy.lock().mark_trained(trained_at);
    }

    /// Trains a new model unless the current one is fresh and `force` is off.
    ///
    /// Only one run may be in flight; a concurrent call fails with
    /// [`ModelError::TrainingInProgress`]. On failure the previous model
    /// stays published.
    #[tracing::instrument(skip_all, fields(corpus = corpus.name(), feedback = feedback.name(), force = force))]
    pub async fn train(
        &self,
        corpus: &dyn CorpusProvider,
        feedback: &dyn FeedbackProvider,
        force: bool,
    ) -> ModelResult<TrainingOutcome> {
        let _guard = self
            .training
            .try_lock()
            .map_err(|_| ModelError::TrainingInProgress)?;

        if !force {
            if let Some(last_retrain) = self.fresh_since() {
                tracing::info!(%last_retrain, "Model is fresh, skipping training");
                return Ok(TrainingOutcome::Skipped { last_retrain });
            }
        }

        let report = self.run_training(corpus, feedback).await?;
        Ok(TrainingOutcome::Trained(report))
    }

    /// Caller must hold the training lock
    async fn run_training(
        &self,
        corpus: &dyn CorpusProvider,
        feedback: &dyn FeedbackProvider,
    ) -> ModelResult<TrainingReport> {
        let rows = corpus.load_corpus().await?;
        let events = feedback.load_feedback().await?;

        let config = self.config.clone();
        let normalizer = self.normalizer.clone();
        let built = tokio::task::spawn_blocking(move || {
            build_state(&config, &normalizer, rows, events, Utc::now())
        })
        .await
        .map_err(join_error)?;

        let state = match built {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(error = %e, trained = self.is_trained(), "Training failed, keeping previous model");
                return Err(e);
            }
        };

        let report = state.report.clone();
        self.publish(state);
        tracing::info!(
            examples = report.train_size + report.test_size,
            micro_f1 = report.evaluation.micro_f1,
            macro_f1 = report.evaluation.macro_f1,
            duration_ms = report.duration_ms,
            "Published new model"
        );
        Ok(report)
    }

    /// Trains and, when a new model was produced, writes the artifact
    pub async fn train_and_save(
        &self,
        corpus: &dyn CorpusProvider,
        feedback: &dyn FeedbackProvider,
        force: bool,
    ) -> ModelResult<TrainingOutcome> {
        let outcome = self.train(corpus, feedback, force).await?;
        if let TrainingOutcome::Trained(_) = outcome {
            self.save().await?;
        }
        Ok(outcome)
    }

    /// Writes the published model to the configured artifact path
    pub async fn save(&self) -> ModelResult<PathBuf> {
        let state = self.current().ok_or(ModelError::NotTrained)?;
        let path = self.config.model_path.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_artifact(&target, &state))
            .await
            .map_err(join_error)??;
        tracing::info!(path = %path.display(), "Saved model artifact");
        Ok(path)
    }

    /// Publishes the saved model, or trains and saves one when no artifact exists.
    ///
    /// A corrupt or incompatible artifact is an error, never silently replaced.
    #[tracing::instrument(skip_all, fields(path = %self.config.model_path.display()))]
    pub async fn load_or_train(
        &self,
        corpus: &dyn CorpusProvider,
        feedback: &dyn FeedbackProvider,
    ) -> ModelResult<LoadOutcome> {
        let path = self.config.model_path.clone();
        let loaded = tokio::task::spawn_blocking(move || read_artifact(&path))
            .await
            .map_err(join_error)??;

        match loaded {
            Some(state) => {
                let trained_at = state.trained_at();
                self.publish(state);
                tracing::info!(%trained_at, "Loaded model artifact");
                Ok(LoadOutcome::Loaded { trained_at })
            }
            None => {
                tracing::info!("No model artifact, training from scratch");
                let report = {
                    let _guard = self
                        .training
                        .try_lock()
                        .map_err(|_| ModelError::TrainingInProgress)?;
                    self.run_training(corpus, feedback).await?
                };
                self.save().await?;
                Ok(LoadOutcome::Trained(report))
            }
        }
    }
}
