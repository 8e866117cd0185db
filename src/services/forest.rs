//! Weighted random forest for a single binary target.
//!
//! Trees are CART classifiers grown on bootstrap samples with Gini impurity
//! computed over sample weights and a random subset of features per split
//! (more features are inspected when the subset yields no valid split).
//! Nodes are stored flat (pre-order, child indices) so fitted forests
//! serialize without deep nesting.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Forest hyper-parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Node {
    /// Split feature, `None` for leaves
    feature: Option<usize>,
    threshold: f64,
    /// Weighted fraction of positive samples that reached the node
    value: f64,
    left: usize,
    right: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn predict_proba(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            let node = &self.nodes[idx];
            match node.feature {
                Some(feature) if row[feature] <= node.threshold => idx = node.left,
                Some(_) => idx = node.right,
                None => return node.value,
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes[idx].feature {
                None => 0,
                Some(_) => 1 + walk(nodes, nodes[idx].left).max(walk(nodes, nodes[idx].right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [bool],
    weights: Vec<f64>,
    max_depth: Option<usize>,
    min_samples_leaf: usize,
    max_features: usize,
    nodes: Vec<Node>,
}

/// Gini impurity of a binary node: 2p(1-p)
fn gini(positive: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    let p = positive / total;
    2.0 * p * (1.0 - p)
}

impl<'a> TreeBuilder<'a> {
    fn totals(&self, indices: &[usize]) -> (f64, f64) {
        indices.iter().fold((0.0, 0.0), |(total, pos), &i| {
            let w = self.weights[i];
            (total + w, if self.y[i] { pos + w } else { pos })
        })
    }

    fn build(&mut self, indices: &[usize], depth: usize, rng: &mut StdRng) -> usize {
        let (total, positive) = self.totals(indices);
        let value = if total > 0.0 { positive / total } else { 0.0 };

        let idx = self.nodes.len();
        self.nodes.push(Node {
            feature: None,
            threshold: 0.0,
            value,
            left: 0,
            right: 0,
        });

        let pure = positive <= 0.0 || positive >= total;
        let depth_reached = self.max_depth.is_some_and(|max| depth >= max);
        if pure || depth_reached || indices.len() < 2 * self.min_samples_leaf {
            return idx;
        }

        let Some(split) = self.best_split(indices, total, positive, rng) else {
            return idx;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.x[i][split.feature] <= split.threshold);

        let left_idx = self.build(&left, depth + 1, rng);
        let right_idx = self.build(&right, depth + 1, rng);

        let node = &mut self.nodes[idx];
        node.feature = Some(split.feature);
        node.threshold = split.threshold;
        node.left = left_idx;
        node.right = right_idx;
        idx
    }

    fn best_split(
        &self,
        indices: &[usize],
        total: f64,
        positive: f64,
        rng: &mut StdRng,
    ) -> Option<Split> {
        let n_features = self.x[indices[0]].len();
        let parent = gini(positive, total);
        let mut order: Vec<usize> = (0..n_features).collect();
        order.shuffle(rng);

        // Keep looking past `max_features` until at least one valid split exists
        let mut best: Option<Split> = None;
        for (visited, feature) in order.into_iter().enumerate() {
            if visited >= self.max_features && best.is_some() {
                break;
            }
            let mut sorted = indices.to_vec();
            sorted.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let (mut left_w, mut left_pos) = (0.0, 0.0);
            for j in 0..sorted.len() - 1 {
                let i = sorted[j];
                left_w += self.weights[i];
                if self.y[i] {
                    left_pos += self.weights[i];
                }

                let here = self.x[i][feature];
                let next = self.x[sorted[j + 1]][feature];
                if here >= next {
                    continue;
                }
                let left_count = j + 1;
                if left_count < self.min_samples_leaf
                    || sorted.len() - left_count < self.min_samples_leaf
                {
                    continue;
                }

                let right_w = total - left_w;
                let impurity = (left_w * gini(left_pos, left_w)
                    + right_w * gini(positive - left_pos, right_w))
                    / total;
                let gain = parent - impurity;
                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(Split {
                        feature,
                        threshold: (here + next) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }
}

/// Bagged ensemble of weighted decision trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fits the forest. Rows of `x` must share one width and `x`, `y`,
    /// `sample_weight` must have the same length.
    pub fn fit(x: &[Vec<f64>], y: &[bool], sample_weight: &[f64], params: ForestParams) -> Self {
        let n_samples = x.len();
        let n_features = x.first().map_or(0, Vec::len);
        let max_features = ((n_features as f64).sqrt().round() as usize).max(1);

        let mut trees = Vec::with_capacity(params.n_estimators);
        for t in 0..params.n_estimators {
            let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(t as u64));

            // Bootstrap multiplicities fold into the sample weights
            let mut counts = vec![0usize; n_samples];
            for _ in 0..n_samples {
                counts[rng.gen_range(0..n_samples)] += 1;
            }
            let weights: Vec<f64> = counts
                .iter()
                .zip(sample_weight)
                .map(|(&c, &w)| c as f64 * w)
                .collect();
            let indices: Vec<usize> = (0..n_samples).filter(|&i| weights[i] > 0.0).collect();
            if indices.is_empty() {
                continue;
            }

            let mut builder = TreeBuilder {
                x,
                y,
                weights,
                max_depth: params.max_depth,
                min_samples_leaf: params.min_samples_leaf.max(1),
                max_features,
                nodes: Vec::new(),
            };
            builder.build(&indices, 0, &mut rng);
            trees.push(DecisionTree {
                nodes: builder.nodes,
            });
        }

        Self {
            params,
            n_features,
            trees,
        }
    }

    /// Mean positive probability over all trees
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict_proba(row)).sum();
        sum / self.trees.len() as f64
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn params(&self) -> ForestParams {
        self.params
    }

    pub fn max_tree_depth(&self) -> usize {
        self.trees.iter().map(DecisionTree::depth).max().unwrap_or(0)
    }
}
