//! Rate-of-change detector: abrupt jumps between consecutive valid readings.

use super::{range_around, round_to, Anomaly, Method, Metric, Severity, Window};
use crate::config::RateConfig;

pub struct RateDetector<'a> {
    config: &'a RateConfig,
}

impl<'a> RateDetector<'a> {
    pub fn new(config: &'a RateConfig) -> Self {
        Self { config }
    }

    /// Compare each valid value with the previous valid value.
    /// Readings missing `metric` are skipped and never become the previous value.
    pub fn detect(&self, window: &Window, metric: Metric) -> Vec<Anomaly> {
        let threshold = self.config.threshold(metric);
        let mut anomalies = Vec::new();
        let mut prev: Option<f64> = None;

        for (reading, value) in window.values(metric) {
            if let Some(prev_value) = prev {
                let change = (value - prev_value).abs();
                if change > threshold {
                    anomalies.push(Anomaly {
                        source_id: reading.id,
                        timestamp: reading.timestamp.clone(),
                        metric,
                        value,
                        expected_range: range_around(prev_value, threshold),
                        deviation: round_to(change, 2),
                        method: Method::RateOfChange,
                        severity: self.severity(change, threshold),
                        message: format!(
                            "{} changed by {:.1} (from {:.1} to {:.1}) - exceeds threshold of {:?}",
                            metric.label(),
                            change,
                            prev_value,
                            value,
                            threshold
                        ),
                    });
                }
            }
            prev = Some(value);
        }

        anomalies
    }

    pub fn severity(&self, change: f64, threshold: f64) -> Severity {
        if change > threshold * self.config.high_factor {
            Severity::High
        } else if change > threshold * self.config.medium_factor {
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

    fn humidity_window(values: &[Option<f64>]) -> Window {
        Window::new(
            values
                .iter()
                .enumerate()
                .map(|(i, h)| Reading::new(i as i64 + 1, format!("2024-01-01T00:{:02}:00Z", i), Some(21.0), *h))
                .collect(),
        )
    }

    #[test]
    fn test_jump_over_threshold() {
        let cfg = RateConfig::default();
        let w = humidity_window(&[Some(40.0), Some(44.0), Some(52.0), Some(52.5)]);
        let found = RateDetector::new(&cfg).detect(&w, Metric::Humidity);
        assert_eq!(found.len(), 1);
        let a = &found[0];
        assert_eq!(a.source_id, 3);
        assert_eq!(a.deviation, 8.0);
        assert_eq!(a.expected_range, (39.0, 49.0));
        // 8 > 7.5 (1.5x) but not > 10 (2x)
        assert_eq!(a.severity, Severity::Medium);
        assert_eq!(
            a.message,
            "Humidity changed by 8.0 (from 44.0 to 52.0) - exceeds threshold of 5.0"
        );
    }

    #[test]
    fn test_missing_values_are_gaps() {
        let cfg = RateConfig::default();
        // 40 -> (missing) -> 47: compared against 40, so the 7 jump counts
        let w = humidity_window(&[Some(40.0), None, Some(47.0)]);
        let found = RateDetector::new(&cfg).detect(&w, Metric::Humidity);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source_id, 3);
        assert_eq!(found[0].severity, Severity::Low);
    }

    #[test]
    fn test_first_reading_never_triggers() {
        let cfg = RateConfig::default();
        let w = humidity_window(&[None, Some(99.0), Some(99.0)]);
        assert!(RateDetector::new(&cfg).detect(&w, Metric::Humidity).is_empty());
    }

    #[test]
    fn test_exactly_threshold_is_not_flagged() {
        let cfg = RateConfig::default();
        let w = humidity_window(&[Some(40.0), Some(45.0), Some(40.0)]);
        assert!(RateDetector::new(&cfg).detect(&w, Metric::Humidity).is_empty());
    }

    #[test]
    fn test_severity_tiers() {
        let cfg = RateConfig::default();
        let d = RateDetector::new(&cfg);
        assert_eq!(d.severity(2.5, 2.0), Severity::Low);
        assert_eq!(d.severity(3.0, 2.0), Severity::Low);
        assert_eq!(d.severity(3.5, 2.0), Severity::Medium);
        assert_eq!(d.severity(4.0, 2.0), Severity::Medium);
        assert_eq!(d.severity(20.0, 2.0), Severity::High);
    }
}
