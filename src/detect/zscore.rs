//! Univariate z-score detector.

use tracing::debug;

use super::{range_around, round_to, Anomaly, Method, Metric, Severity, Window};
use crate::analysis::stats::SeriesStats;
use crate::config::ZScoreConfig;

pub struct ZScoreDetector<'a> {
    config: &'a ZScoreConfig,
}

impl<'a> ZScoreDetector<'a> {
    pub fn new(config: &'a ZScoreConfig) -> Self {
        Self { config }
    }

    /// Flag readings whose `|value - mean| / std` exceeds the threshold.
    ///
    /// Produces nothing below `min_samples` valid values or on a constant
    /// series.
    pub fn detect(&self, window: &Window, metric: Metric) -> Vec<Anomaly> {
        let values: Vec<f64> = window.values(metric).map(|(_, v)| v).collect();
        if values.len() < self.config.min_samples {
            debug!(%metric, have = values.len(), needed = self.config.min_samples, "z-score: insufficient samples");
            return Vec::new();
        }

        let stats = SeriesStats::from_values(&values);
        if stats.std == 0.0 {
            debug!(%metric, "z-score: constant series, skipping");
            return Vec::new();
        }

        let expected_range = range_around(stats.mean, self.config.range_sigmas * stats.std);

        window
            .values(metric)
            .filter_map(|(reading, value)| {
                let z = (value - stats.mean).abs() / stats.std;
                if z <= self.config.threshold {
                    return None;
                }
                Some(Anomaly {
                    source_id: reading.id,
                    timestamp: reading.timestamp.clone(),
                    metric,
                    value,
                    expected_range,
                    deviation: round_to(z, 2),
                    method: Method::Zscore,
                    severity: self.severity(z),
                    message: format!(
                        "{} of {:?} is {:.1} standard deviations from mean ({:.1})",
                        metric.label(),
                        value,
                        z,
                        stats.mean
                    ),
                })
            })
            .collect()
    }

    pub fn severity(&self, z: f64) -> Severity {
        if z > self.config.high_above {
            Severity::High
        } else if z > self.config.medium_above {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Reading;

    fn window(temps: &[Option<f64>]) -> Window {
        Window::new(
            temps
                .iter()
                .enumerate()
                .map(|(i, t)| Reading::new(i as i64 + 1, format!("2024-01-01T00:{:02}:00Z", i), *t, Some(50.0)))
                .collect(),
        )
    }

    #[test]
    fn test_single_spike_is_flagged() {
        let mut temps = vec![Some(20.0); 9];
        temps.push(Some(40.0));
        let cfg = ZScoreConfig::default();
        let found = ZScoreDetector::new(&cfg).detect(&window(&temps), Metric::Temperature);

        // mean 22, std 6 -> z = 3.0 exactly for the spike, which is not > 3.0
        assert!(found.is_empty());

        let mut temps = vec![Some(20.0); 19];
        temps.push(Some(40.0));
        let found = ZScoreDetector::new(&cfg).detect(&window(&temps), Metric::Temperature);
        assert_eq!(found.len(), 1);
        let a = &found[0];
        assert_eq!(a.source_id, 20);
        assert_eq!(a.method, Method::Zscore);
        // mean 21, std = sqrt(19) ~ 4.359, z ~ 4.36
        assert_eq!(a.deviation, 4.36);
        assert_eq!(a.severity, Severity::High);
        assert!(a.expected_range.0 <= a.expected_range.1);
        assert!(a.message.starts_with("Temperature of 40.0 is 4.4 standard deviations"));
    }

    #[test]
    fn test_insufficient_samples() {
        let mut temps = vec![Some(20.0); 8];
        temps.push(Some(90.0));
        temps.push(None);
        let cfg = ZScoreConfig::default();
        assert!(ZScoreDetector::new(&cfg).detect(&window(&temps), Metric::Temperature).is_empty());
    }

    #[test]
    fn test_constant_series() {
        let cfg = ZScoreConfig::default();
        let temps = vec![Some(21.5); 30];
        assert!(ZScoreDetector::new(&cfg).detect(&window(&temps), Metric::Temperature).is_empty());
    }

    #[test]
    fn test_lower_threshold_is_respected() {
        let cfg = ZScoreConfig {
            threshold: 2.5,
            ..ZScoreConfig::default()
        };
        let mut temps = vec![Some(20.0); 9];
        temps.push(Some(40.0));
        let found = ZScoreDetector::new(&cfg).detect(&window(&temps), Metric::Temperature);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].deviation, 3.0);
        assert_eq!(found[0].severity, Severity::Low);
    }

    #[test]
    fn test_severity_tiers() {
        let cfg = ZScoreConfig::default();
        let d = ZScoreDetector::new(&cfg);
        assert_eq!(d.severity(3.2), Severity::Low);
        assert_eq!(d.severity(3.5), Severity::Low);
        assert_eq!(d.severity(3.6), Severity::Medium);
        assert_eq!(d.severity(4.0), Severity::Medium);
        assert_eq!(d.severity(4.01), Severity::High);
    }
}
