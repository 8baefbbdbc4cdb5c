//! Isolation forest: an ensemble of random partitioning trees.
//!
//! Points that are isolated after few random splits get short average path
//! lengths and therefore low scores. Scores follow the usual convention:
//! `score_samples` lies in `[-1, 0)` and the decision function shifts it by
//! the `contamination` percentile so that outliers are negative.

use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::debug;

use super::stats::percentile_sorted;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Error)]
pub enum ForestError {
    #[error("cannot fit an isolation forest on an empty dataset")]
    EmptyInput,
    #[error("contamination must be in (0, 0.5], got {0}")]
    InvalidContamination(f64),
    #[error("n_estimators must be at least 1")]
    NoEstimators,
}

/// Fitting parameters.
#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_samples: usize,
    pub contamination: f64,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.05,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

#[derive(Debug, Clone)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn fit<const D: usize>(data: &[[f64; D]], indices: &mut [usize], max_depth: usize, rng: &mut StdRng) -> Self {
        let mut nodes = Vec::new();
        grow(data, indices, 0, max_depth, rng, &mut nodes);
        Self { nodes }
    }

    /// Depth at which `point` lands, plus the expected remaining depth of
    /// the leaf it ends in.
    fn path_length<const D: usize>(&self, point: &[f64; D]) -> f64 {
        let mut node = 0;
        let mut depth = 0.0;
        loop {
            match &self.nodes[node] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if point[*feature] <= *threshold { *left } else { *right };
                    depth += 1.0;
                }
                Node::Leaf { size } => return depth + average_path_length(*size),
            }
        }
    }
}

fn grow<const D: usize>(
    data: &[[f64; D]],
    indices: &mut [usize],
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
    nodes: &mut Vec<Node>,
) -> usize {
    let id = nodes.len();
    nodes.push(Node::Leaf { size: indices.len() });

    if depth >= max_depth || indices.len() <= 1 {
        return id;
    }

    // Try features in random order until one still has spread at this node
    let mut features: Vec<usize> = (0..D).collect();
    features.shuffle(rng);
    let split = features.into_iter().find_map(|f| {
        let (lo, hi) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
            (lo.min(data[i][f]), hi.max(data[i][f]))
        });
        (hi > lo).then_some((f, lo, hi))
    });
    let Some((feature, lo, hi)) = split else {
        return id;
    };

    // `hi - lo` overflows when the node spans more than f64::MAX
    let u: f64 = rng.gen();
    let span = hi - lo;
    let threshold = if span.is_finite() { lo + u * span } else { lo * (1.0 - u) + hi * u };
    let mid = partition(indices, |i| data[i][feature] <= threshold);
    let (left_idx, right_idx) = indices.split_at_mut(mid);

    let left = grow(data, left_idx, depth + 1, max_depth, rng, nodes);
    let right = grow(data, right_idx, depth + 1, max_depth, rng, nodes);
    nodes[id] = Node::Split {
        feature,
        threshold,
        left,
        right,
    };
    id
}

/// In-place partition; returns the number of elements satisfying `pred`,
/// which are moved to the front.
fn partition<F>(indices: &mut [usize], pred: F) -> usize
where
    F: Fn(usize) -> bool,
{
    let mut mid = 0;
    for j in 0..indices.len() {
        if pred(indices[j]) {
            indices.swap(mid, j);
            mid += 1;
        }
    }
    mid
}

/// Average path length of an unsuccessful BST search over `n` points, used
/// to normalize depths.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// A fitted forest.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
    offset: f64,
}

impl IsolationForest {
    /// Fit on `data`, seeding every random choice from `params.seed`.
    pub fn fit<const D: usize>(data: &[[f64; D]], params: &ForestParams) -> Result<Self, ForestError> {
        if data.is_empty() {
            return Err(ForestError::EmptyInput);
        }
        if params.n_estimators == 0 {
            return Err(ForestError::NoEstimators);
        }
        if !(params.contamination > 0.0 && params.contamination <= 0.5) {
            return Err(ForestError::InvalidContamination(params.contamination));
        }

        let sample_size = params.max_samples.clamp(1, data.len());
        let max_depth = (sample_size.max(2) as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(params.seed);

        let trees = (0..params.n_estimators)
            .map(|_| {
                let mut indices = index::sample(&mut rng, data.len(), sample_size).into_vec();
                IsolationTree::fit(data, &mut indices, max_depth, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            sample_size,
            offset: 0.0,
        };

        let mut training_scores = forest.score_samples(data);
        training_scores.sort_by(|a, b| a.total_cmp(b));
        forest.offset = percentile_sorted(&training_scores, 100.0 * params.contamination);

        debug!(
            trees = forest.trees.len(),
            sample_size,
            max_depth,
            offset = forest.offset,
            "Fitted isolation forest"
        );
        Ok(forest)
    }

    /// Raw anomaly scores in `[-1, 0)`; lower is more abnormal.
    pub fn score_samples<const D: usize>(&self, data: &[[f64; D]]) -> Vec<f64> {
        let norm = average_path_length(self.sample_size);
        data.iter()
            .map(|point| {
                let mean_depth = self.trees.iter().map(|t| t.path_length(point)).sum::<f64>()
                    / self.trees.len() as f64;
                if norm > 0.0 {
                    -(2f64.powf(-mean_depth / norm))
                } else {
                    -1.0
                }
            })
            .collect()
    }

    /// Scores shifted by the fitted offset; negative means outlier.
    pub fn decision_function<const D: usize>(&self, data: &[[f64; D]]) -> Vec<f64> {
        self.score_samples(data).into_iter().map(|s| s - self.offset).collect()
    }
}
