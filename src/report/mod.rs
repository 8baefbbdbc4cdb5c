//! Summary construction and the JSON report sink.

pub mod text;

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::SeriesStats;
use crate::detect::{Anomaly, Method, Metric, Severity, Window};

pub const NO_DATA: &str = "No data loaded";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricStatistics {
    pub temperature: SeriesStats,
    pub humidity: SeriesStats,
}

impl MetricStatistics {
    pub fn get(&self, metric: Metric) -> &SeriesStats {
        match metric {
            Metric::Temperature => &self.temperature,
            Metric::Humidity => &self.humidity,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricCounts {
    pub temperature: usize,
    pub humidity: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodCounts {
    pub zscore: usize,
    pub rate_of_change: usize,
    pub isolation_forest: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyCounts {
    pub total: usize,
    pub by_severity: SeverityCounts,
    pub by_metric: MetricCounts,
    pub by_method: MethodCounts,
}

impl AnomalyCounts {
    pub fn tally(anomalies: &[Anomaly]) -> Self {
        let mut counts = Self {
            total: anomalies.len(),
            ..Self::default()
        };
        for a in anomalies {
            match a.severity {
                Severity::High => counts.by_severity.high += 1,
                Severity::Medium => counts.by_severity.medium += 1,
                Severity::Low => counts.by_severity.low += 1,
            }
            match a.metric {
                Metric::Temperature => counts.by_metric.temperature += 1,
                Metric::Humidity => counts.by_metric.humidity += 1,
            }
            match a.method {
                Method::Zscore => counts.by_method.zscore += 1,
                Method::RateOfChange => counts.by_method.rate_of_change += 1,
                Method::IsolationForest => counts.by_method.isolation_forest += 1,
            }
        }
        counts
    }
}

/// Result summary of one detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Set only when the run had nothing to analyze.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub data_points_analyzed: usize,
    pub time_range: TimeRange,
    pub statistics: MetricStatistics,
    pub anomalies: AnomalyCounts,
    /// The first `detail_limit` anomalies in report order.
    pub anomaly_details: Vec<Anomaly>,
}

impl Summary {
    /// Summarize `anomalies` (already merged and sorted) for `window`.
    /// Counts cover every anomaly; details are truncated to `detail_limit`.
    pub fn build(window: &Window, anomalies: &[Anomaly], detail_limit: usize) -> Self {
        if window.is_empty() {
            return Self::no_data();
        }

        let time_range = window
            .time_range()
            .map(|(start, end)| TimeRange {
                start: Some(start.to_string()),
                end: Some(end.to_string()),
            })
            .unwrap_or_default();

        Self {
            error: None,
            data_points_analyzed: window.len(),
            time_range,
            statistics: MetricStatistics {
                temperature: SeriesStats::from_optional(window.series(Metric::Temperature)),
                humidity: SeriesStats::from_optional(window.series(Metric::Humidity)),
            },
            anomalies: AnomalyCounts::tally(anomalies),
            anomaly_details: anomalies.iter().take(detail_limit).cloned().collect(),
        }
    }

    pub fn no_data() -> Self {
        Self {
            error: Some(NO_DATA.to_string()),
            data_points_analyzed: 0,
            time_range: TimeRange::default(),
            statistics: MetricStatistics::default(),
            anomalies: AnomalyCounts::default(),
            anomaly_details: Vec::new(),
        }
    }

    pub fn is_no_data(&self) -> bool {
        self.data_points_analyzed == 0
    }
}

/// What the report sink persists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub summary: Summary,
}

impl Report {
    pub fn new(summary: Summary) -> Self {
        Self {
            generated_at: Utc::now(),
            summary,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as pretty JSON, creating parent directories.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create report directory: {}", parent.display()))?;
        }
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("failed to write report: {}", path.display()))?;
        info!(path = %path.display(), "Report written");
        Ok(())
    }
}
