//! sensorsentry -- multi-method anomaly detection for paired temperature and
//! humidity readings.
//!
//! A run loads the most recent window of readings from a source, applies the
//! z-score, rate-of-change and isolation-forest detectors, merges their
//! findings and builds a ranked, severity-classified summary.

pub mod analysis;
pub mod config;
pub mod detect;
pub mod report;
pub mod source;
pub mod storage;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::DetectionConfig;
use crate::detect::{Anomaly, AnomalyEngine, Window};
use crate::report::{Report, Summary};
use crate::source::ReadingSource;

/// Detection output for one window.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Every merged anomaly, newest first.
    pub anomalies: Vec<Anomaly>,
    pub summary: Summary,
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The source had no readings; nothing was analyzed.
    NoData(Report),
    Completed { report: Report, anomalies: Vec<Anomaly> },
}

impl RunOutcome {
    pub fn report(&self) -> &Report {
        match self {
            RunOutcome::NoData(report) => report,
            RunOutcome::Completed { report, .. } => report,
        }
    }
}

/// Run all detectors over `window` and summarize. Pure and synchronous.
pub fn analyze(window: &Window, config: &DetectionConfig) -> Analysis {
    let engine = AnomalyEngine::new(config.clone());
    let anomalies = engine.detect_all(window);
    let summary = Summary::build(window, &anomalies, config.report.detail_limit);
    Analysis { anomalies, summary }
}

/// Fetch a window from `source` and analyze it.
pub async fn run(source: &dyn ReadingSource, limit: usize, config: &DetectionConfig) -> Result<RunOutcome> {
    info!(source = source.name(), limit, "Fetching sensor readings");
    let rows = source
        .fetch_recent(limit)
        .await
        .with_context(|| format!("failed to fetch readings from {}", source.name()))?;

    let window = Window::from_newest_first(rows);
    if window.is_empty() {
        warn!(source = source.name(), "No readings available; nothing to analyze");
        return Ok(RunOutcome::NoData(Report::new(Summary::no_data())));
    }

    let Analysis { anomalies, summary } = analyze(&window, config);
    info!(
        readings = summary.data_points_analyzed,
        anomalies = summary.anomalies.total,
        high = summary.anomalies.by_severity.high,
        "Analysis complete"
    );

    Ok(RunOutcome::Completed {
        report: Report::new(summary),
        anomalies,
    })
}
