use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Category, CategorySet, ConfidenceMap};

use super::forest::{ForestParams, RandomForest};
use super::metrics::{self, EvaluationReport};

/// Error types for the multilabel classifier
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Need at least {required} usable examples, got {got}")]
    InsufficientData { required: usize, got: usize },
    #[error("No example carries any taxonomy category")]
    DegenerateLabels,
    #[error("Feature vector has {got} columns, model expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Fixed-order bit vector encoding of category sets over the taxonomy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelBinarizer {
    classes: Vec<Category>,
}

impl Default for LabelBinarizer {
    fn default() -> Self {
        Self {
            classes: Category::TAXONOMY.to_vec(),
        }
    }
}

impl LabelBinarizer {
    pub fn classes(&self) -> &[Category] {
        &self.classes
    }

    /// Bits for every class; the `other` sentinel has no column and is ignored
    pub fn transform(&self, labels: &CategorySet) -> Vec<bool> {
        self.classes.iter().map(|c| labels.contains(c)).collect()
    }

    pub fn inverse_transform(&self, bits: &[bool]) -> CategorySet {
        self.classes
            .iter()
            .zip(bits)
            .filter(|(_, &bit)| bit)
            .map(|(c, _)| *c)
            .collect()
    }
}

/// How per-category classifiers relate to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Independent classifier per category
    OneVsRest,
    /// Category `k` also sees the decisions for categories `0..k`
    Chain,
}

/// Grid of forest hyper-parameters explored by cross-validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchGrid {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_leaf: Vec<usize>,
    pub folds: usize,
}

impl SearchGrid {
    pub fn around(base: ForestParams) -> Self {
        Self {
            n_estimators: vec![(base.n_estimators / 2).max(1), base.n_estimators],
            max_depth: vec![base.max_depth, Some(8)],
            min_samples_leaf: vec![base.min_samples_leaf, 4],
            folds: 3,
        }
    }

    fn candidates(&self, seed: u64) -> Vec<ForestParams> {
        let mut out = Vec::new();
        for &n_estimators in &self.n_estimators {
            for &max_depth in &self.max_depth {
                for &min_samples_leaf in &self.min_samples_leaf {
                    let params = ForestParams {
                        n_estimators,
                        max_depth,
                        min_samples_leaf,
                        seed,
                    };
                    if !out.contains(&params) {
                        out.push(params);
                    }
                }
            }
        }
        out
    }
}

/// Training options of the classifier core
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    pub strategy: Strategy,
    pub params: ForestParams,
    pub search: Option<SearchGrid>,
    /// Share of examples held out for evaluation
    pub test_fraction: f64,
    /// Probability at or above which a category is part of the hard decision
    pub threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let params = ForestParams::default();
        Self {
            strategy: Strategy::OneVsRest,
            params,
            search: Some(SearchGrid::around(params)),
            test_fraction: 0.2,
            threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum LabelModel {
    /// The category had a single label value in training
    Constant(f64),
    Forest(RandomForest),
}

impl LabelModel {
    fn fit(x: &[Vec<f64>], y: &[bool], w: &[f64], params: ForestParams) -> Self {
        if y.iter().all(|&b| !b) {
            LabelModel::Constant(0.0)
        } else if y.iter().all(|&b| b) {
            LabelModel::Constant(1.0)
        } else {
            LabelModel::Forest(RandomForest::fit(x, y, w, params))
        }
    }

    fn proba(&self, row: &[f64]) -> f64 {
        match self {
            LabelModel::Constant(p) => *p,
            LabelModel::Forest(forest) => forest.predict_proba(row),
        }
    }
}

/// Fitted multilabel classifier over the taxonomy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultilabelClassifier {
    binarizer: LabelBinarizer,
    strategy: Strategy,
    params: ForestParams,
    threshold: f64,
    n_features: usize,
    models: Vec<LabelModel>,
}

impl MultilabelClassifier {
    /// Fits one model per category (or a chain) on binarized labels.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[Vec<bool>],
        weights: &[f64],
        strategy: Strategy,
        params: ForestParams,
        threshold: f64,
    ) -> Self {
        let binarizer = LabelBinarizer::default();
        let n_features = x.first().map_or(0, Vec::len);

        let models = (0..binarizer.classes().len())
            .map(|k| {
                let target: Vec<bool> = y.iter().map(|bits| bits[k]).collect();
                let params = ForestParams {
                    seed: params.seed.wrapping_add(1_000 * k as u64),
                    ..params
                };
                match strategy {
                    Strategy::OneVsRest => LabelModel::fit(x, &target, weights, params),
                    Strategy::Chain => {
                        let augmented: Vec<Vec<f64>> = x
                            .iter()
                            .zip(y)
                            .map(|(row, bits)| chain_row(row, &bits[..k]))
                            .collect();
                        LabelModel::fit(&augmented, &target, weights, params)
                    }
                }
            })
            .collect();

        Self {
            binarizer,
            strategy,
            params,
            threshold,
            n_features,
            models,
        }
    }

    pub fn binarizer(&self) -> &LabelBinarizer {
        &self.binarizer
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn params(&self) -> ForestParams {
        self.params
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Per-category probabilities and hard decisions, in binarizer order
    fn infer(&self, row: &[f64]) -> (Vec<f64>, Vec<bool>) {
        let mut probabilities = Vec::with_capacity(self.models.len());
        let mut decisions = Vec::with_capacity(self.models.len());
        for model in &self.models {
            let p = match self.strategy {
                Strategy::OneVsRest => model.proba(row),
                Strategy::Chain => model.proba(&chain_row(row, &decisions)),
            };
            probabilities.push(p);
            decisions.push(p >= self.threshold);
        }
        (probabilities, decisions)
    }

    fn check_width(&self, row: &[f64]) -> Result<(), ClassifierError> {
        if row.len() != self.n_features {
            return Err(ClassifierError::DimensionMismatch {
                expected: self.n_features,
                got: row.len(),
            });
        }
        Ok(())
    }

    pub fn predict_bits(&self, row: &[f64]) -> Result<Vec<bool>, ClassifierError> {
        self.check_width(row)?;
        Ok(self.infer(row).1)
    }

    /// Hard category set plus a confidence for every taxonomy category
    pub fn predict(&self, row: &[f64]) -> Result<(CategorySet, ConfidenceMap), ClassifierError> {
        self.check_width(row)?;
        let (probabilities, decisions) = self.infer(row);

        let confidence: ConfidenceMap = self
            .binarizer
            .classes()
            .iter()
            .zip(&probabilities)
            .map(|(c, p)| (*c, p.clamp(0.0, 1.0)))
            .collect();

        Ok((self.binarizer.inverse_transform(&decisions), confidence))
    }
}

fn chain_row(row: &[f64], previous: &[bool]) -> Vec<f64> {
    let mut out = Vec::with_capacity(row.len() + previous.len());
    out.extend_from_slice(row);
    out.extend(previous.iter().map(|&b| if b { 1.0 } else { 0.0 }));
    out
}

/// Score of one hyper-parameter candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub params: ForestParams,
    pub mean_micro_f1: f64,
}

/// Outcome of the cross-validated hyper-parameter search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub best: ForestParams,
    pub best_score: f64,
    pub candidates: Vec<CandidateScore>,
}

/// A fitted classifier together with how it was chosen and how it scored
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub classifier: MultilabelClassifier,
    pub evaluation: EvaluationReport,
    pub search: Option<SearchOutcome>,
    pub train_size: usize,
    pub test_size: usize,
}

struct Dataset<'a> {
    x: &'a [Vec<f64>],
    y: &'a [Vec<bool>],
    w: &'a [f64],
}

impl Dataset<'_> {
    fn subset(&self, indices: &[usize]) -> (Vec<Vec<f64>>, Vec<Vec<bool>>, Vec<f64>) {
        (
            indices.iter().map(|&i| self.x[i].clone()).collect(),
            indices.iter().map(|&i| self.y[i].clone()).collect(),
            indices.iter().map(|&i| self.w[i]).collect(),
        )
    }
}

/// Splits, optionally searches hyper-parameters, fits and evaluates.
///
/// The published classifier is the one fitted on the training split and
/// scored on the held-out split.
pub fn fit_and_evaluate(
    x: &[Vec<f64>],
    y: &[Vec<bool>],
    weights: &[f64],
    config: &ClassifierConfig,
) -> Result<FitOutcome, ClassifierError> {
    let n = x.len();
    if n < 2 {
        return Err(ClassifierError::InsufficientData { required: 2, got: n });
    }
    if !y.iter().any(|bits| bits.iter().any(|&b| b)) {
        return Err(ClassifierError::DegenerateLabels);
    }

    let data = Dataset { x, y, w: weights };

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut StdRng::seed_from_u64(config.params.seed));
    let n_test = ((n as f64 * config.test_fraction).round() as usize).clamp(1, n - 1);
    let (test_idx, train_idx) = order.split_at(n_test);

    let (x_train, y_train, w_train) = data.subset(train_idx);
    let (x_test, y_test, _) = data.subset(test_idx);

    let search = match &config.search {
        Some(grid) if x_train.len() >= grid.folds.max(2) => {
            let train = Dataset {
                x: &x_train,
                y: &y_train,
                w: &w_train,
            };
            Some(grid_search(&train, grid, config))
        }
        Some(grid) => {
            tracing::warn!(
                train = x_train.len(),
                folds = grid.folds,
                "Too few examples for cross-validation, using default parameters"
            );
            None
        }
        None => None,
    };
    let params = search.as_ref().map_or(config.params, |s| s.best);

    let classifier = MultilabelClassifier::fit(
        &x_train,
        &y_train,
        &w_train,
        config.strategy,
        params,
        config.threshold,
    );

    let y_pred: Vec<Vec<bool>> = x_test.iter().map(|row| classifier.infer(row).1).collect();
    let evaluation = metrics::evaluate(classifier.binarizer().classes(), &y_test, &y_pred);

    Ok(FitOutcome {
        classifier,
        evaluation,
        search,
        train_size: train_idx.len(),
        test_size: test_idx.len(),
    })
}

/// Held-out index sets of a seeded k-fold split.
///
/// Indices are shuffled once and dealt to folds by their shuffled position.
fn fold_indices(n: usize, folds: usize, seed: u64) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));

    let mut held_out = vec![Vec::new(); folds];
    for (pos, i) in order.into_iter().enumerate() {
        held_out[pos % folds].push(i);
    }
    held_out
}

fn grid_search(data: &Dataset<'_>, grid: &SearchGrid, config: &ClassifierConfig) -> SearchOutcome {
    let n = data.x.len();
    let folds = grid.folds.max(2).min(n);
    let held_out_sets = fold_indices(n, folds, config.params.seed.wrapping_add(7));

    let candidates: Vec<CandidateScore> = grid
        .candidates(config.params.seed)
        .into_iter()
        .map(|params| {
            let mut scores = Vec::with_capacity(folds);
            for held_out in &held_out_sets {
                let kept: Vec<usize> = (0..n).filter(|i| !held_out.contains(i)).collect();
                if held_out.is_empty() || kept.is_empty() {
                    continue;
                }
                let (x_fit, y_fit, w_fit) = data.subset(&kept);
                let (x_val, y_val, _) = data.subset(held_out);
                let model = MultilabelClassifier::fit(
                    &x_fit,
                    &y_fit,
                    &w_fit,
                    config.strategy,
                    params,
                    config.threshold,
                );
                let y_pred: Vec<Vec<bool>> = x_val.iter().map(|row| model.infer(row).1).collect();
                scores.push(metrics::micro_f1(&y_val, &y_pred));
            }
            let mean_micro_f1 = if scores.is_empty() {
                0.0
            } else {
                scores.iter().sum::<f64>() / scores.len() as f64
            };
            tracing::debug!(?params, score = mean_micro_f1, "Evaluated candidate");
            CandidateScore {
                params,
                mean_micro_f1,
            }
        })
        .collect();

    // First candidate wins ties so the search is deterministic
    let best = candidates
        .iter()
        .fold(None::<&CandidateScore>, |best, c| match best {
            Some(b) if b.mean_micro_f1 >= c.mean_micro_f1 => Some(b),
            _ => Some(c),
        })
        .copied()
        .unwrap_or(CandidateScore {
            params: config.params,
            mean_micro_f1: 0.0,
        });

    tracing::info!(
        best = ?best.params,
        score = best.mean_micro_f1,
        candidates = candidates.len(),
        "Hyper-parameter search finished"
    );

    SearchOutcome {
        best: best.params,
        best_score: best.mean_micro_f1,
        candidates,
    }
}
