//! Rendering of scored samples for the operator.

use crate::pipeline::AnomalyReport;
use chrono::DateTime;
use std::fmt::Write;

/// Tabular view of a report, one line per scored sample.
pub fn render_table(report: &AnomalyReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "query: {}", report.query);
    let _ = writeln!(
        out,
        "{:>4}  {:<19}  {:>14}  {:>7}  {:>6}  label",
        "#", "timestamp", "value", "score", "flag"
    );
    for (i, scored) in report.samples.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>4}  {:<19}  {:>14.4}  {:>7.3}  {:>6}  {}",
            i,
            format_timestamp(scored.sample.timestamp),
            scored.sample.value,
            scored.score,
            scored.label.to_i8(),
            scored.label
        );
    }
    out
}

/// One-line summary for the end of the run.
pub fn render_summary(report: &AnomalyReport) -> String {
    if report.anomaly_detected() {
        format!(
            "⚠️  Anomaly detected! {} of {} samples flagged",
            report.anomaly_count(),
            report.samples.len()
        )
    } else {
        format!("No anomalies in {} samples", report.samples.len())
    }
}

fn format_timestamp(unix_seconds: f64) -> String {
    match DateTime::from_timestamp(unix_seconds as i64, 0) {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "-".to_string(),
    }
}
