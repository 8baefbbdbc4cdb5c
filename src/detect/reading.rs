//! Reading ingestion and the analysis window.
//!
//! Rows arrive from a source as loosely typed JSON-ish records. They are
//! normalized exactly once here: malformed rows are dropped and anything
//! non-numeric becomes a missing value, so detectors only ever see
//! `Option<f64>`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::Metric;

/// A row as delivered by a reading source, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawReading {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub temperature: Value,
    #[serde(default)]
    pub humidity: Value,
    #[serde(default)]
    pub created_at: Value,
}

/// A validated, immutable sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub id: i64,
    pub timestamp: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

impl Reading {
    pub fn new(id: i64, timestamp: impl Into<String>, temperature: Option<f64>, humidity: Option<f64>) -> Self {
        Self {
            id,
            timestamp: timestamp.into(),
            temperature: temperature.filter(|v| v.is_finite()),
            humidity: humidity.filter(|v| v.is_finite()),
        }
    }

    /// Validate a raw row. Returns `None` when the row has no usable id or
    /// timestamp; bad metric values are kept as missing.
    pub fn from_raw(raw: &RawReading) -> Option<Self> {
        let id = integer(&raw.id)?;
        let timestamp = match &raw.created_at {
            Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => return None,
        };
        Some(Self {
            id,
            timestamp,
            temperature: numeric(&raw.temperature),
            humidity: numeric(&raw.humidity),
        })
    }

    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
        }
    }
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn numeric(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

/// A read-only snapshot of readings in chronological order.
#[derive(Debug, Clone, Default)]
pub struct Window {
    readings: Vec<Reading>,
}

impl Window {
    /// Build a window from readings that are already chronological.
    pub fn new(readings: Vec<Reading>) -> Self {
        Self { readings }
    }

    /// Build a window from source rows delivered newest first.
    ///
    /// Rows are reversed into chronological order and then stable-sorted by
    /// timestamp, so a source that hands back ascending rows still yields a
    /// correctly ordered window.
    pub fn from_newest_first(rows: Vec<RawReading>) -> Self {
        let total = rows.len();
        let mut readings: Vec<Reading> = rows.iter().rev().filter_map(Reading::from_raw).collect();

        let dropped = total - readings.len();
        if dropped > 0 {
            warn!(dropped, total, "Dropped malformed reading rows at ingestion");
        }

        readings.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        debug!(readings = readings.len(), "Built analysis window");
        Self { readings }
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Readings that carry a value for `metric`, in order.
    pub fn values(&self, metric: Metric) -> impl Iterator<Item = (&Reading, f64)> + '_ {
        self.readings
            .iter()
            .filter_map(move |r| r.value(metric).map(|v| (r, v)))
    }

    /// The raw (possibly missing) series for `metric`.
    pub fn series(&self, metric: Metric) -> Vec<Option<f64>> {
        self.readings.iter().map(|r| r.value(metric)).collect()
    }

    /// Readings where both temperature and humidity are present.
    pub fn pairs(&self) -> impl Iterator<Item = (&Reading, [f64; 2])> + '_ {
        self.readings.iter().filter_map(|r| match (r.temperature, r.humidity) {
            (Some(t), Some(h)) => Some((r, [t, h])),
            _ => None,
        })
    }

    /// First and last timestamps of the window.
    pub fn time_range(&self) -> Option<(&str, &str)> {
        let first = self.readings.first()?;
        let last = self.readings.last()?;
        Some((first.timestamp.as_str(), last.timestamp.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(v: Value) -> RawReading {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_non_numeric_values_become_missing() {
        let r = Reading::from_raw(&raw(json!({
            "id": 1,
            "temperature": "warm",
            "humidity": "41.5",
            "created_at": "2024-05-01T10:00:00Z"
        })))
        .unwrap();
        assert_eq!(r.temperature, None);
        assert_eq!(r.humidity, Some(41.5));
    }

    #[test]
    fn test_rows_without_id_or_timestamp_are_dropped() {
        assert!(Reading::from_raw(&raw(json!({"temperature": 20.0, "created_at": "t"}))).is_none());
        assert!(Reading::from_raw(&raw(json!({"id": 3, "temperature": 20.0}))).is_none());
        assert!(Reading::from_raw(&raw(json!({"id": 2.5, "created_at": "t"}))).is_none());
    }

    #[test]
    fn test_window_reverses_newest_first_rows() {
        let rows = vec![
            raw(json!({"id": 3, "temperature": 22.0, "humidity": null, "created_at": "2024-05-01T10:02:00Z"})),
            raw(json!({"id": 2, "temperature": 21.0, "humidity": 40.0, "created_at": "2024-05-01T10:01:00Z"})),
            raw(json!({"id": 1, "temperature": null, "humidity": 41.0, "created_at": "2024-05-01T10:00:00Z"})),
        ];
        let window = Window::from_newest_first(rows);
        let ids: Vec<i64> = window.readings().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(
            window.time_range(),
            Some(("2024-05-01T10:00:00Z", "2024-05-01T10:02:00Z"))
        );
        assert_eq!(window.values(Metric::Temperature).count(), 2);
        assert_eq!(window.pairs().count(), 1);
    }

    #[test]
    fn test_non_finite_values_are_missing() {
        let r = Reading::new(1, "t", Some(f64::NAN), Some(f64::INFINITY));
        assert_eq!(r.temperature, None);
        assert_eq!(r.humidity, None);
    }
}
