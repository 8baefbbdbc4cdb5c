use std::collections::HashSet;

use tracing::{debug, info};

use super::multivariate::MultivariateDetector;
use super::rate::RateDetector;
use super::zscore::ZScoreDetector;
use super::{Anomaly, Method, Metric, Window};
use crate::config::DetectionConfig;

/// Runs every detector over one window and merges their findings.
pub struct AnomalyEngine {
    config: DetectionConfig,
}

impl AnomalyEngine {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    /// Run z-score and rate-of-change per metric, then the multivariate
    /// detector, and return the deduplicated list, newest first.
    pub fn detect_all(&self, window: &Window) -> Vec<Anomaly> {
        info!(readings = window.len(), "Running anomaly detection");

        let zscore = ZScoreDetector::new(&self.config.zscore);
        let rate = RateDetector::new(&self.config.rate);
        let multivariate = MultivariateDetector::new(&self.config.forest);

        let mut all = Vec::new();
        for metric in Metric::ALL {
            all.extend(zscore.detect(window, metric));
        }
        for metric in Metric::ALL {
            all.extend(rate.detect(window, metric));
        }
        all.extend(multivariate.detect(window));

        let raw = all.len();
        let merged = merge(all);
        debug!(raw, merged = merged.len(), "Merged detector output");
        merged
    }
}

/// Keep the first anomaly per `(source_id, method)` and order newest first.
/// Equal timestamps keep their relative order.
pub fn merge(anomalies: Vec<Anomaly>) -> Vec<Anomaly> {
    let mut seen: HashSet<(i64, Method)> = HashSet::new();
    let mut unique: Vec<Anomaly> = anomalies
        .into_iter()
        .filter(|a| seen.insert((a.source_id, a.method)))
        .collect();

    // sort_by is stable
    unique.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    unique
}
