//! Isolation-forest anomaly model.
//!
//! An unsupervised outlier detector built from randomized partitioning
//! trees: outliers sit in sparse regions of the feature space and are
//! isolated in fewer splits than typical points.

pub mod forest;

use crate::error::{Error, Result};
use crate::source::MetricSample;
use serde::{Deserialize, Serialize};

pub use forest::IsolationForest;

/// Model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Expected fraction of anomalous samples, in (0, 0.5]
    pub contamination: f64,
    /// Seed for the tree-building RNG
    pub seed: u64,
    /// Number of trees in the ensemble
    pub n_estimators: usize,
    /// Subsample cap per tree; smaller windows use all samples
    pub max_samples: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            contamination: 0.2,
            seed: 42,
            n_estimators: 100,
            max_samples: 256,
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(Error::Config(format!(
                "contamination must be in (0, 0.5], got {}",
                self.contamination
            )));
        }
        if self.n_estimators == 0 {
            return Err(Error::Config("n_estimators must be at least 1".to_string()));
        }
        if self.max_samples < 2 {
            return Err(Error::Config("max_samples must be at least 2".to_string()));
        }
        Ok(())
    }
}

/// Per-sample decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Normal,
    Anomalous,
}

impl Label {
    /// Integer convention of the reference scoring: -1 anomalous, +1 normal.
    pub fn to_i8(self) -> i8 {
        match self {
            Label::Normal => 1,
            Label::Anomalous => -1,
        }
    }

    pub fn is_anomalous(self) -> bool {
        matches!(self, Label::Anomalous)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Normal => write!(f, "normal"),
            Label::Anomalous => write!(f, "anomalous"),
        }
    }
}

/// A sample paired with its model decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredSample {
    pub sample: MetricSample,
    /// Normalized anomaly score in (0, 1); higher means more isolated
    pub score: f64,
    pub label: Label,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_integer_convention() {
        assert_eq!(Label::Anomalous.to_i8(), -1);
        assert_eq!(Label::Normal.to_i8(), 1);
    }

    #[test]
    fn test_config_validation_bounds() {
        assert!(ModelConfig::default().validate().is_ok());

        let mut config = ModelConfig::default();
        config.contamination = 0.0;
        assert!(config.validate().is_err());

        config.contamination = 0.51;
        assert!(config.validate().is_err());

        config.contamination = 0.5;
        assert!(config.validate().is_ok());

        config.n_estimators = 0;
        assert!(config.validate().is_err());
    }
}
