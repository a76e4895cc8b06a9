//! Sample acquisition from a metric source.
//!
//! The collector owns the two supported acquisition modes and hides them
//! behind one contract: the rest of the pipeline only ever sees an ordered
//! [`SampleWindow`].

use crate::error::{Error, Result};
use crate::source::{MetricSample, MetricSource};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// How samples are pulled from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectMode {
    /// One batched instant query; one sample per matching series
    Instant,
    /// Repeated point queries; first series value per call
    Poll,
}

/// Collector settings
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub mode: CollectMode,
    /// Spacing between point queries in poll mode
    pub poll_interval: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            mode: CollectMode::Instant,
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Ordered sequence of samples owned by a single pipeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleWindow {
    samples: Vec<MetricSample>,
}

impl SampleWindow {
    pub fn new(samples: Vec<MetricSample>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }
}

/// Pulls a bounded, ordered window of scalar samples from a [`MetricSource`].
pub struct SampleCollector<'a> {
    source: &'a dyn MetricSource,
    config: CollectorConfig,
}

impl<'a> SampleCollector<'a> {
    pub fn new(source: &'a dyn MetricSource, config: CollectorConfig) -> Self {
        Self { source, config }
    }

    /// Collect up to `count` samples for the query, in receipt order.
    ///
    /// Fails with [`Error::EmptyResult`] when the backend answers but has no
    /// data points for the query, and with [`Error::MalformedResponse`] when
    /// a sample value is not a finite number.
    pub async fn collect(&self, query: &str, count: usize) -> Result<SampleWindow> {
        if count == 0 {
            return Err(Error::Config(
                "sample count must be at least 1".to_string(),
            ));
        }

        let samples = match self.config.mode {
            CollectMode::Instant => self.collect_instant(query, count).await?,
            CollectMode::Poll => self.collect_poll(query, count).await?,
        };

        if samples.is_empty() {
            return Err(Error::EmptyResult);
        }

        validate_finite(&samples)?;
        debug!(
            query,
            collected = samples.len(),
            requested = count,
            mode = ?self.config.mode,
            "sample window collected"
        );
        Ok(SampleWindow::new(samples))
    }

    async fn collect_instant(&self, query: &str, count: usize) -> Result<Vec<MetricSample>> {
        let mut samples = self.source.instant_query(query).await?;
        samples.truncate(count);
        Ok(samples)
    }

    async fn collect_poll(&self, query: &str, count: usize) -> Result<Vec<MetricSample>> {
        let mut samples = Vec::with_capacity(count);
        for i in 0..count {
            if i > 0 && !self.config.poll_interval.is_zero() {
                tokio::time::sleep(self.config.poll_interval).await;
            }
            let points = self.source.instant_query(query).await?;
            if let Some(first) = points.first() {
                samples.push(*first);
            }
        }
        Ok(samples)
    }
}

fn validate_finite(samples: &[MetricSample]) -> Result<()> {
    for sample in samples {
        if !sample.value.is_finite() {
            return Err(Error::MalformedResponse(format!(
                "non-finite sample value: {}",
                sample.value
            )));
        }
    }
    Ok(())
}
