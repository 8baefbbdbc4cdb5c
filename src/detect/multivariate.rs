//! Joint (temperature, humidity) outlier detection with an isolation forest.
//!
//! The forest is an optional capability (`forest` feature). When it is not
//! compiled in, disabled in config, or fails to fit, this detector warns and
//! contributes nothing; the rest of the run is unaffected.

use tracing::{debug, warn};

use super::{Anomaly, Window};
use crate::config::ForestConfig;

pub struct MultivariateDetector<'a> {
    config: &'a ForestConfig,
}

impl<'a> MultivariateDetector<'a> {
    pub fn new(config: &'a ForestConfig) -> Self {
        Self { config }
    }

    pub fn detect(&self, window: &Window) -> Vec<Anomaly> {
        if !self.config.enabled {
            debug!("isolation forest disabled in configuration");
            return Vec::new();
        }

        let pairs = window.pairs().count();
        if pairs < self.config.min_samples {
            debug!(have = pairs, needed = self.config.min_samples, "isolation forest: insufficient pairs");
            return Vec::new();
        }

        self.detect_with_forest(window)
    }

    #[cfg(not(feature = "forest"))]
    fn detect_with_forest(&self, _window: &Window) -> Vec<Anomaly> {
        warn!("isolation forest support not compiled in (enable the `forest` feature); skipping multivariate detection");
        Vec::new()
    }

    #[cfg(feature = "forest")]
    fn detect_with_forest(&self, window: &Window) -> Vec<Anomaly> {
        use super::{range_around, round_to, Method, Metric, Severity};
        use crate::analysis::forest::{ForestParams, IsolationForest};
        use crate::analysis::stats::SeriesStats;

        // Guards a constant axis in the per-axis standardization
        const AXIS_EPSILON: f64 = 1e-6;

        let (readings, points): (Vec<_>, Vec<[f64; 2]>) = window.pairs().unzip();

        let params = ForestParams {
            n_estimators: self.config.n_estimators,
            max_samples: self.config.max_samples,
            contamination: self.config.contamination,
            seed: self.config.seed,
        };
        let forest = match IsolationForest::fit(&points, &params) {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, "isolation forest could not be fitted; skipping multivariate detection");
                return Vec::new();
            }
        };
        let scores = forest.decision_function(&points);

        let axes = [
            SeriesStats::from_values(&points.iter().map(|p| p[0]).collect::<Vec<_>>()),
            SeriesStats::from_values(&points.iter().map(|p| p[1]).collect::<Vec<_>>()),
        ];

        let mut anomalies = Vec::new();
        for ((reading, point), &score) in readings.iter().zip(&points).zip(&scores) {
            if score >= 0.0 {
                continue;
            }

            let temp_dev = (point[0] - axes[0].mean).abs() / (axes[0].std + AXIS_EPSILON);
            let humid_dev = (point[1] - axes[1].mean).abs() / (axes[1].std + AXIS_EPSILON);
            let (metric, axis) = if temp_dev > humid_dev {
                (Metric::Temperature, 0)
            } else {
                (Metric::Humidity, 1)
            };

            let severity = if score < self.config.high_below {
                Severity::High
            } else if score < self.config.medium_below {
                Severity::Medium
            } else {
                Severity::Low
            };

            anomalies.push(Anomaly {
                source_id: reading.id,
                timestamp: reading.timestamp.clone(),
                metric,
                value: point[axis],
                expected_range: range_around(axes[axis].mean, 2.0 * axes[axis].std),
                deviation: round_to(score.abs(), 3),
                method: Method::IsolationForest,
                severity,
                message: format!(
                    "Multivariate anomaly detected: temp={:.1}, humidity={:.1} (anomaly score: {:.3})",
                    point[0], point[1], score
                ),
            });
        }

        debug!(flagged = anomalies.len(), points = points.len(), "isolation forest scan complete");
        anomalies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Reading;

    fn paired_window(n: usize) -> Window {
        Window::new(
            (0..n)
                .map(|i| {
                    Reading::new(
                        i as i64 + 1,
                        format!("2024-01-01T{:02}:{:02}:00Z", i / 60, i % 60),
                        Some(21.0 + (i % 5) as f64 * 0.2),
                        Some(45.0 + (i % 7) as f64 * 0.5),
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn test_below_minimum_pairs() {
        let cfg = ForestConfig::default();
        assert!(MultivariateDetector::new(&cfg).detect(&paired_window(19)).is_empty());
    }

    #[test]
    fn test_disabled_in_config() {
        let cfg = ForestConfig {
            enabled: false,
            ..ForestConfig::default()
        };
        assert!(MultivariateDetector::new(&cfg).detect(&paired_window(100)).is_empty());
    }

    #[test]
    fn test_bad_params_degrade_gracefully() {
        let cfg = ForestConfig {
            contamination: 2.0,
            ..ForestConfig::default()
        };
        assert!(MultivariateDetector::new(&cfg).detect(&paired_window(100)).is_empty());
    }

    #[cfg(feature = "forest")]
    #[test]
    fn test_flags_joint_outlier() {
        use crate::detect::{Method, Metric};

        let mut readings = paired_window(60).readings().to_vec();
        readings.push(Reading::new(999, "2024-01-01T01:00:00Z", Some(22.0), Some(95.0)));
        let window = Window::new(readings);

        let cfg = ForestConfig::default();
        let found = MultivariateDetector::new(&cfg).detect(&window);
        let outlier = found
            .iter()
            .find(|a| a.source_id == 999)
            .expect("outlier should be flagged");

        assert_eq!(outlier.method, Method::IsolationForest);
        assert_eq!(outlier.metric, Metric::Humidity);
        assert_eq!(outlier.value, 95.0);
        assert!(outlier.deviation > 0.0);
        assert!(outlier.expected_range.0 <= outlier.expected_range.1);
        assert!(outlier.message.contains("humidity=95.0"));
        // Contamination keeps the flagged set small
        assert!(found.len() <= 4);
    }
}
