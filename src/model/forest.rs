//! Randomized partitioning trees and path-length scoring.

use crate::error::{Error, Result};
use crate::features::FeatureMatrix;
use crate::model::{Label, ModelConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Minimum number of rows the model can characterize "normal" from.
pub const MIN_SAMPLES: usize = 2;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Expected path length of an unsuccessful BST search among `n` points.
///
/// Normalizes raw path lengths so scores are comparable across subsample
/// sizes; also serves as the depth credit for unsplit leaves.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        value: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Recursively partition `rows` on random feature/value pairs until every
/// row is isolated or the depth limit is reached.
fn build_tree(rows: &[&[f64]], depth: usize, depth_limit: usize, rng: &mut StdRng) -> Node {
    if rows.len() <= 1 || depth >= depth_limit {
        return Node::Leaf { size: rows.len() };
    }

    let n_features = rows[0].len();
    let feature = rng.gen_range(0..n_features);

    let mut min_val = f64::INFINITY;
    let mut max_val = f64::NEG_INFINITY;
    for row in rows {
        min_val = min_val.min(row[feature]);
        max_val = max_val.max(row[feature]);
    }

    // No spread on the chosen feature, nothing to split
    if max_val <= min_val {
        return Node::Leaf { size: rows.len() };
    }

    let value = rng.gen_range(min_val..max_val);
    let (left, right): (Vec<&[f64]>, Vec<&[f64]>) =
        rows.iter().copied().partition(|row| row[feature] < value);

    if left.is_empty() || right.is_empty() {
        return Node::Leaf { size: rows.len() };
    }

    Node::Split {
        feature,
        value,
        left: Box::new(build_tree(&left, depth + 1, depth_limit, rng)),
        right: Box::new(build_tree(&right, depth + 1, depth_limit, rng)),
    }
}

/// Splits traversed before `row` lands in a leaf, plus the expected depth
/// still hidden inside an unsplit leaf.
fn path_length(node: &Node, row: &[f64], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            feature,
            value,
            left,
            right,
        } => {
            if row[*feature] < *value {
                path_length(left, row, depth + 1)
            } else {
                path_length(right, row, depth + 1)
            }
        }
    }
}

/// Isolation-forest outlier detector.
///
/// Fit once per run on a feature matrix, then query for scores or labels.
/// All randomness flows from the configured seed, so identical input and
/// configuration reproduce identical labels.
pub struct IsolationForest {
    config: ModelConfig,
    trees: Vec<Node>,
    /// `c(n)` normalizer fixed at fit time
    expected_depth: f64,
    /// Decision threshold calibrated on the training scores
    threshold: f64,
}

impl IsolationForest {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            expected_depth: 0.0,
            threshold: 0.0,
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Score threshold above which a sample is labeled anomalous.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Build the ensemble and calibrate the decision threshold so that at
    /// most a `contamination` fraction of the training rows exceeds it.
    pub fn fit(&mut self, matrix: &FeatureMatrix) -> Result<()> {
        self.config.validate()?;

        let n = matrix.n_rows();
        if n < MIN_SAMPLES {
            return Err(Error::InsufficientData {
                got: n,
                min: MIN_SAMPLES,
            });
        }

        let subsample = self.config.max_samples.min(n);
        let depth_limit = (subsample as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        let trees: Vec<Node> = (0..self.config.n_estimators)
            .map(|_| {
                let rows: Vec<&[f64]> = if subsample == n {
                    // Window no larger than the cap: every tree sees all samples
                    matrix.rows().iter().map(|r| r.as_slice()).collect()
                } else {
                    rand::seq::index::sample(&mut rng, n, subsample)
                        .iter()
                        .map(|i| matrix.row(i))
                        .collect()
                };
                build_tree(&rows, 0, depth_limit, &mut rng)
            })
            .collect();
        self.trees = trees;
        self.expected_depth = average_path_length(subsample);

        let mut scores: Vec<f64> = (0..n).map(|i| self.score_row(matrix.row(i))).collect();
        scores.sort_by(|a, b| b.total_cmp(a));
        let cutoff = (self.config.contamination * n as f64).floor() as usize;
        self.threshold = scores[cutoff.min(n - 1)];

        debug!(
            rows = n,
            trees = self.trees.len(),
            subsample,
            threshold = self.threshold,
            "isolation forest fitted"
        );
        Ok(())
    }

    /// Normalized anomaly score in (0, 1); higher means more isolated.
    fn score_row(&self, row: &[f64]) -> f64 {
        let total: f64 = self
            .trees
            .iter()
            .map(|tree| path_length(tree, row, 0))
            .sum();
        let avg = total / self.trees.len() as f64;
        2f64.powf(-avg / self.expected_depth)
    }

    /// Anomaly score per row, in matrix order.
    pub fn score_samples(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
        if !self.is_fitted() {
            return Err(Error::Config("model has not been fitted".to_string()));
        }
        Ok((0..matrix.n_rows())
            .map(|i| self.score_row(matrix.row(i)))
            .collect())
    }

    /// Label a single score against the calibrated threshold.
    pub fn label_for(&self, score: f64) -> Label {
        if score > self.threshold {
            Label::Anomalous
        } else {
            Label::Normal
        }
    }

    /// One label per row, in matrix order.
    pub fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<Label>> {
        Ok(self
            .score_samples(matrix)?
            .into_iter()
            .map(|score| self.label_for(score))
            .collect())
    }

    pub fn fit_predict(&mut self, matrix: &FeatureMatrix) -> Result<Vec<Label>> {
        self.fit(matrix)?;
        self.predict(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(values: &[f64]) -> FeatureMatrix {
        FeatureMatrix::new(values.iter().map(|&v| vec![v]).collect())
    }

    fn config(contamination: f64, seed: u64) -> ModelConfig {
        ModelConfig {
            contamination,
            seed,
            ..ModelConfig::default()
        }
    }

    #[test]
    fn test_average_path_length_reference_points() {
        assert_eq!(average_path_length(0), 0.0);
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        // grows with n, sublinearly
        assert!(average_path_length(100) > average_path_length(10));
        assert!(average_path_length(100) < 100.0);
    }

    #[test]
    fn test_insufficient_data_rejected() {
        let mut forest = IsolationForest::new(ModelConfig::default());
        let err = forest.fit(&matrix(&[])).unwrap_err();
        assert!(matches!(err, Error::InsufficientData { got: 0, min: 2 }));

        let err = forest.fit(&matrix(&[1.0])).unwrap_err();
        assert!(matches!(err, Error::InsufficientData { got: 1, min: 2 }));
    }

    #[test]
    fn test_predict_before_fit_rejected() {
        let forest = IsolationForest::new(ModelConfig::default());
        assert!(forest.predict(&matrix(&[1.0, 2.0])).is_err());
    }

    #[test]
    fn test_single_outlier_is_flagged() {
        let mut values = vec![1.0; 9];
        values.push(100.0);
        let mut forest = IsolationForest::new(config(0.1, 42));

        let labels = forest.fit_predict(&matrix(&values)).unwrap();
        assert_eq!(labels.len(), 10);
        assert_eq!(labels[9], Label::Anomalous);
        assert!(labels[..9].iter().all(|&l| l == Label::Normal));
    }

    #[test]
    fn test_identical_values_all_normal() {
        let values = vec![1.0; 10];
        let mut forest = IsolationForest::new(config(0.2, 42));

        let labels = forest.fit_predict(&matrix(&values)).unwrap();
        assert!(labels.iter().all(|&l| l == Label::Normal));
    }

    #[test]
    fn test_identical_values_normal_at_any_contamination() {
        for contamination in [0.05, 0.2, 0.5] {
            let mut forest = IsolationForest::new(config(contamination, 7));
            let labels = forest.fit_predict(&matrix(&[3.5; 12])).unwrap();
            assert!(labels.iter().all(|&l| l == Label::Normal));
        }
    }

    #[test]
    fn test_fixed_seed_is_deterministic() {
        let values: Vec<f64> = (0..50).map(|i| (i as f64 * 0.73).sin() * 10.0).collect();
        let m = matrix(&values);

        let mut first = IsolationForest::new(config(0.1, 1234));
        let mut second = IsolationForest::new(config(0.1, 1234));
        let labels_a = first.fit_predict(&m).unwrap();
        let labels_b = second.fit_predict(&m).unwrap();

        assert_eq!(labels_a, labels_b);
        assert_eq!(first.threshold(), second.threshold());
        assert_eq!(
            first.score_samples(&m).unwrap(),
            second.score_samples(&m).unwrap()
        );
    }

    #[test]
    fn test_scores_are_in_unit_interval() {
        let values: Vec<f64> = (0..100).map(|i| (i % 17) as f64).collect();
        let mut forest = IsolationForest::new(config(0.1, 3));
        forest.fit(&matrix(&values)).unwrap();

        for score in forest.score_samples(&matrix(&values)).unwrap() {
            assert!(score > 0.0 && score < 1.0, "score out of range: {score}");
        }
    }

    #[test]
    fn test_contamination_calibration_on_gaussian() {
        use rand::distributions::Distribution;
        use statrs::distribution::Normal;

        let normal = Normal::new(0.0, 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(99);
        let values: Vec<f64> = (0..1000).map(|_| normal.sample(&mut rng)).collect();

        let contamination = 0.1;
        let mut forest = IsolationForest::new(config(contamination, 42));
        let labels = forest.fit_predict(&matrix(&values)).unwrap();

        let flagged = labels.iter().filter(|l| l.is_anomalous()).count();
        let fraction = flagged as f64 / values.len() as f64;
        assert!(
            (fraction - contamination).abs() <= 0.05,
            "anomalous fraction {fraction} not within 0.05 of {contamination}"
        );
    }

    #[test]
    fn test_fits_window_smaller_than_subsample_cap() {
        let mut forest = IsolationForest::new(config(0.25, 5));
        let labels = forest.fit_predict(&matrix(&[1.0, 2.0, 1.5, 40.0])).unwrap();
        assert_eq!(labels.len(), 4);
        assert_eq!(labels[3], Label::Anomalous);
    }
}
