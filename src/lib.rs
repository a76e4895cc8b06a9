//! # promsentinel
//!
//! Samples scalar time-series values from a Prometheus-compatible backend
//! and flags statistically anomalous samples with an isolation-forest
//! model, without hand-tuned thresholds.
//!
//! The pipeline is strictly linear: a [`source::MetricSource`] feeds the
//! [`collector::SampleCollector`], the window is reshaped by
//! [`features::FeatureBuilder`], scored by [`model::IsolationForest`], and
//! the scored samples come out as a [`pipeline::AnomalyReport`].

pub mod collector;
pub mod config;
pub mod error;
pub mod features;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod retry;
pub mod source;

pub use error::{Error, Result};
pub use pipeline::{AnomalyReport, Pipeline, PipelineOutcome};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::Config("test".to_string());
        assert!(err.to_string().contains("test"));
    }
}
