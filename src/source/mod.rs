//! Metric source abstraction and the Prometheus-backed implementation.

pub mod prometheus;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use prometheus::PrometheusSource;

/// A single scalar observation from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Unix timestamp in seconds, as the backend reports it
    pub timestamp: f64,
    /// Scalar sample value
    pub value: f64,
}

impl MetricSample {
    pub fn new(timestamp: f64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Point-in-time query capability against a monitoring backend.
///
/// One call returns the latest data point of every series matching the
/// query expression, in the order the backend lists them.
#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn instant_query(&self, query: &str) -> Result<Vec<MetricSample>>;
}
