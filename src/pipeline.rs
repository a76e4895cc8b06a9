//! The anomaly-scoring pipeline: collect → build → fit → predict.
//!
//! Strictly linear and repeatable: every run owns its window, matrix and
//! model, so invocations are independent unless the caller reuses state on
//! purpose.

use crate::collector::{CollectorConfig, SampleCollector};
use crate::error::{Error, Result};
use crate::features::FeatureBuilder;
use crate::model::{IsolationForest, ModelConfig, ScoredSample};
use crate::source::MetricSource;
use tracing::{debug, info};

/// Everything one run needs besides the source.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Query expression evaluated against the backend
    pub query: String,
    /// Number of samples to collect, at least 1
    pub sample_count: usize,
    pub collector: CollectorConfig,
    pub model: ModelConfig,
}

/// Scored output of a run that had data to evaluate.
#[derive(Debug, Clone)]
pub struct AnomalyReport {
    pub query: String,
    pub samples: Vec<ScoredSample>,
}

impl AnomalyReport {
    /// True when at least one sample was labeled anomalous.
    pub fn anomaly_detected(&self) -> bool {
        self.samples.iter().any(|s| s.label.is_anomalous())
    }

    pub fn anomaly_count(&self) -> usize {
        self.samples.iter().filter(|s| s.label.is_anomalous()).count()
    }
}

/// Terminal outcome of a run that did not fail.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// The query matched no data points; nothing to evaluate
    NoData,
    Report(AnomalyReport),
}

/// Callable pipeline object; see [`Pipeline::run`].
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        if config.sample_count == 0 {
            return Err(Error::Config(
                "sample count must be at least 1".to_string(),
            ));
        }
        config.model.validate()?;
        Ok(Self { config })
    }

    /// Run the pipeline once against the given source.
    ///
    /// An empty query result is a benign [`PipelineOutcome::NoData`]; every
    /// other component failure propagates unchanged and nothing is partially
    /// reported. The pipeline never retries — that policy belongs to the
    /// caller.
    pub async fn run(&self, source: &dyn MetricSource) -> Result<PipelineOutcome> {
        let collector = SampleCollector::new(source, self.config.collector.clone());
        let window = match collector
            .collect(&self.config.query, self.config.sample_count)
            .await
        {
            Ok(window) => window,
            Err(Error::EmptyResult) => {
                info!(query = %self.config.query, "no data points to evaluate");
                return Ok(PipelineOutcome::NoData);
            }
            Err(e) => return Err(e),
        };

        let matrix = FeatureBuilder::build(&window);
        debug!(rows = matrix.n_rows(), "feature matrix built");

        let mut model = IsolationForest::new(self.config.model.clone());
        model.fit(&matrix)?;
        let scores = model.score_samples(&matrix)?;

        let samples: Vec<ScoredSample> = window
            .samples()
            .iter()
            .zip(scores)
            .map(|(&sample, score)| ScoredSample {
                sample,
                score,
                label: model.label_for(score),
            })
            .collect();

        let report = AnomalyReport {
            query: self.config.query.clone(),
            samples,
        };
        info!(
            query = %report.query,
            samples = report.samples.len(),
            anomalies = report.anomaly_count(),
            "pipeline run complete"
        );
        Ok(PipelineOutcome::Report(report))
    }
}
