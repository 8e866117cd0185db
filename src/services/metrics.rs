use serde::{Deserialize, Serialize};

use crate::models::Category;

/// True/predicted counts of one category over an evaluation set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryContingency {
    pub category: Category,
    /// Examples that truly carry the category
    pub support: usize,
    pub predicted: usize,
    pub true_positives: usize,
}

impl CategoryContingency {
    pub fn false_positives(&self) -> usize {
        self.predicted - self.true_positives
    }

    pub fn false_negatives(&self) -> usize {
        self.support - self.true_positives
    }

    pub fn f1(&self) -> f64 {
        f1(self.true_positives, self.false_positives(), self.false_negatives())
    }

    /// The category occurs in the data but the model never predicts it
    pub fn is_collapsed(&self) -> bool {
        self.support > 0 && self.predicted == 0
    }
}

/// Multilabel evaluation summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub samples: usize,
    /// Fraction of examples whose whole label set was predicted exactly
    pub exact_match: f64,
    /// Fraction of wrong label bits
    pub hamming_loss: f64,
    pub micro_f1: f64,
    /// Mean F1 over categories that occur in truth or predictions
    pub macro_f1: f64,
    pub per_category: Vec<CategoryContingency>,
}

impl EvaluationReport {
    pub fn collapsed(&self) -> Vec<Category> {
        self.per_category
            .iter()
            .filter(|c| c.is_collapsed())
            .map(|c| c.category)
            .collect()
    }
}

fn f1(tp: usize, fp: usize, fn_: usize) -> f64 {
    let denominator = 2 * tp + fp + fn_;
    if denominator == 0 {
        0.0
    } else {
        2.0 * tp as f64 / denominator as f64
    }
}

/// Evaluates binarized predictions against binarized truth.
///
/// Rows are examples, columns follow `categories`.
pub fn evaluate(categories: &[Category], y_true: &[Vec<bool>], y_pred: &[Vec<bool>]) -> EvaluationReport {
    let samples = y_true.len().min(y_pred.len());
    let mut per_category: Vec<CategoryContingency> = categories
        .iter()
        .map(|&category| CategoryContingency {
            category,
            support: 0,
            predicted: 0,
            true_positives: 0,
        })
        .collect();

    let mut exact = 0usize;
    let mut wrong_bits = 0usize;

    for (truth, pred) in y_true.iter().zip(y_pred) {
        let mut all_match = true;
        for (k, counts) in per_category.iter_mut().enumerate() {
            let (t, p) = (truth[k], pred[k]);
            if t {
                counts.support += 1;
            }
            if p {
                counts.predicted += 1;
            }
            if t && p {
                counts.true_positives += 1;
            }
            if t != p {
                wrong_bits += 1;
                all_match = false;
            }
        }
        if all_match {
            exact += 1;
        }
    }

    let (tp, fp, fn_) = per_category.iter().fold((0, 0, 0), |(tp, fp, fn_), c| {
        (
            tp + c.true_positives,
            fp + c.false_positives(),
            fn_ + c.false_negatives(),
        )
    });

    let active: Vec<f64> = per_category
        .iter()
        .filter(|c| c.support > 0 || c.predicted > 0)
        .map(CategoryContingency::f1)
        .collect();
    let macro_f1 = if active.is_empty() {
        0.0
    } else {
        active.iter().sum::<f64>() / active.len() as f64
    };

    let bits = samples * categories.len();
    EvaluationReport {
        samples,
        exact_match: if samples == 0 { 0.0 } else { exact as f64 / samples as f64 },
        hamming_loss: if bits == 0 { 0.0 } else { wrong_bits as f64 / bits as f64 },
        micro_f1: f1(tp, fp, fn_),
        macro_f1,
        per_category,
    }
}

/// Micro-averaged F1 alone, used as the cross-validation score
pub fn micro_f1(y_true: &[Vec<bool>], y_pred: &[Vec<bool>]) -> f64 {
    let (mut tp, mut fp, mut fn_) = (0, 0, 0);
    for (truth, pred) in y_true.iter().zip(y_pred) {
        for (&t, &p) in truth.iter().zip(pred) {
            match (t, p) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
                (false, false) => {}
            }
        }
    }
    f1(tp, fp, fn_)
}
