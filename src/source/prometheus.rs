//! Prometheus HTTP API client.
//!
//! Issues instant queries against `/api/v1/query` and parses the vector
//! response shape into [`MetricSample`]s.

use crate::error::{Error, Result};
use crate::source::{MetricSample, MetricSource};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Instant-query client for a Prometheus-compatible backend.
#[derive(Debug)]
pub struct PrometheusSource {
    client: reqwest::Client,
    endpoint: Url,
}

impl PrometheusSource {
    /// Create a client for the given base URL with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid source url {base_url:?}: {e}")))?;
        // Url::join replaces the last path segment unless the base ends in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join("api/v1/query")
            .map_err(|e| Error::Config(format!("invalid source url {base_url:?}: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl MetricSource for PrometheusSource {
    async fn instant_query(&self, query: &str) -> Result<Vec<MetricSample>> {
        debug!(%query, endpoint = %self.endpoint, "issuing instant query");

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("query", query)])
            .send()
            .await
            .map_err(|e| Error::SourceUnavailable(e.to_string()))?;

        if response.status().is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| Error::SourceUnavailable(e.to_string()))?;
            parse_response(&body)
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            Err(Error::SourceUnavailable(format!(
                "backend returned {}: {}",
                status,
                error_text.trim()
            )))
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<QueryData>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(rename = "resultType")]
    result_type: String,
    result: Vec<SeriesValue>,
}

#[derive(Debug, Deserialize)]
struct SeriesValue {
    /// `[<unix seconds>, "<value>"]`; the value is a numeric string
    #[serde(default)]
    value: Option<(f64, String)>,
}

fn parse_response(body: &str) -> Result<Vec<MetricSample>> {
    let response: ApiResponse = serde_json::from_str(body)
        .map_err(|e| Error::MalformedResponse(format!("invalid query response: {e}")))?;

    if response.status != "success" {
        return Err(Error::SourceUnavailable(format!(
            "backend reported {}: {}",
            response.status,
            response.error.unwrap_or_else(|| "unknown error".to_string())
        )));
    }

    let data = response
        .data
        .ok_or_else(|| Error::MalformedResponse("response missing data field".to_string()))?;

    if data.result_type != "vector" {
        return Err(Error::MalformedResponse(format!(
            "unsupported result type: {}",
            data.result_type
        )));
    }

    data.result
        .into_iter()
        .map(|series| {
            let (timestamp, raw) = series.value.ok_or_else(|| {
                Error::MalformedResponse("series result missing value field".to_string())
            })?;
            let value: f64 = raw.parse().map_err(|_| {
                Error::MalformedResponse(format!("non-numeric sample value: {raw:?}"))
            })?;
            Ok(MetricSample::new(timestamp, value))
        })
        .collect()
}
