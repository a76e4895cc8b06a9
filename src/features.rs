//! Feature construction for the anomaly model.

use crate::collector::SampleWindow;

/// Row-major numeric matrix: one row per sample, one column per feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: Vec<Vec<f64>>,
    n_features: usize,
}

impl FeatureMatrix {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        let n_features = rows.first().map(|r| r.len()).unwrap_or(0);
        Self { rows, n_features }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.rows[index]
    }
}

/// Reshapes a sample window into the model's input shape.
///
/// Pure and total: every sample becomes exactly one row with a single
/// feature column holding the scalar value. The single-column shape leaves
/// room for more features without touching the rest of the pipeline.
pub struct FeatureBuilder;

impl FeatureBuilder {
    pub fn build(window: &SampleWindow) -> FeatureMatrix {
        let rows = window.samples().iter().map(|s| vec![s.value]).collect();
        FeatureMatrix::new(rows)
    }
}
