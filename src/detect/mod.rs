//! Anomaly detection over a window of paired sensor readings.

pub mod engine;
pub mod multivariate;
pub mod rate;
pub mod reading;
pub mod zscore;

use serde::{Deserialize, Serialize};

pub use engine::AnomalyEngine;
pub use reading::{Reading, Window};

/// The two variables every reading carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Temperature,
    Humidity,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Temperature, Metric::Humidity];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
        }
    }

    /// Capitalized name used at the start of report messages.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Temperature => "Temperature",
            Metric::Humidity => "Humidity",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which detector produced an anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Zscore,
    RateOfChange,
    IsolationForest,
}

impl Method {
    pub const ALL: [Method; 3] = [Method::Zscore, Method::RateOfChange, Method::IsolationForest];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Zscore => "zscore",
            Method::RateOfChange => "rate_of_change",
            Method::IsolationForest => "isolation_forest",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity tiers, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding. Created by a detector and never mutated afterwards.
///
/// Field names on the wire follow the report format consumers already read
/// (`id`, `detection_method`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    #[serde(rename = "id")]
    pub source_id: i64,
    pub timestamp: String,
    pub metric: Metric,
    pub value: f64,
    pub expected_range: (f64, f64),
    pub deviation: f64,
    #[serde(rename = "detection_method")]
    pub method: Method,
    pub severity: Severity,
    pub message: String,
}

/// Round half away from zero to `places` decimals.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

/// Build an `(low, high)` range around `center`, rounded to 2 decimals.
pub(crate) fn range_around(center: f64, half_width: f64) -> (f64, f64) {
    let half_width = half_width.abs();
    (round_to(center - half_width, 2), round_to(center + half_width, 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_anomaly_wire_names() {
        let anomaly = Anomaly {
            source_id: 7,
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            metric: Metric::Humidity,
            value: 80.0,
            expected_range: (40.0, 60.0),
            deviation: 4.2,
            method: Method::RateOfChange,
            severity: Severity::High,
            message: "x".to_string(),
        };
        let json = serde_json::to_value(&anomaly).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["detection_method"], "rate_of_change");
        assert_eq!(json["metric"], "humidity");
        assert_eq!(json["severity"], "high");
        assert_eq!(json["expected_range"][0], 40.0);
    }

    #[test]
    fn test_range_around_is_ordered() {
        let (lo, hi) = range_around(10.0, -2.5);
        assert!(lo <= hi);
        assert_eq!((lo, hi), (7.5, 12.5));
    }

    #[test]
    fn test_round_to_keeps_huge_values() {
        assert_eq!(round_to(1.7e308, 2), 1.7e308);
        assert_eq!(round_to(2.346, 2), 2.35);
    }
}
