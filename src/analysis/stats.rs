use serde::{Deserialize, Serialize};

/// Descriptive statistics for one metric over the analysis window.
///
/// All-zero when there are no valid values; callers treat `std == 0.0` as
/// "cannot detect" rather than as a real spread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub mean: f64,
    pub std: f64,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub min: f64,
    pub max: f64,
}

impl SeriesStats {
    /// Compute stats over `values`, skipping missing entries.
    pub fn from_optional<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let present: Vec<f64> = values.into_iter().flatten().collect();
        Self::from_values(&present)
    }

    /// Compute stats over a complete series.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        // Population variance (divide by N)
        let variance = values.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n;

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let q1 = percentile_sorted(&sorted, 25.0);
        let q3 = percentile_sorted(&sorted, 75.0);

        Self {
            mean,
            std: variance.sqrt(),
            q1,
            q3,
            iqr: q3 - q1,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        }
    }
}

/// Percentile `p` (0..=100) of an ascending slice with linear interpolation
/// between closest ranks. Returns 0.0 for an empty slice.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        len => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (len - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let frac = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * frac
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_all_zero() {
        assert_eq!(SeriesStats::from_values(&[]), SeriesStats::default());
        assert_eq!(SeriesStats::from_optional(vec![None, None]), SeriesStats::default());
    }

    #[test]
    fn test_population_std() {
        let stats = SeriesStats::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(stats.mean, 5.0);
        // Population std of this classic set is exactly 2
        assert!((stats.std - 2.0).abs() < 1e-12);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
    }

    #[test]
    fn test_interpolated_quartiles() {
        // Matches the conventional linear percentile: q1 = 1.75, q3 = 3.25
        let stats = SeriesStats::from_values(&[4.0, 1.0, 3.0, 2.0]);
        assert!((stats.q1 - 1.75).abs() < 1e-12);
        assert!((stats.q3 - 3.25).abs() < 1e-12);
        assert!((stats.iqr - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_missing_values_are_skipped() {
        let stats = SeriesStats::from_optional(vec![Some(1.0), None, Some(3.0)]);
        assert_eq!(stats.mean, 2.0);
        assert_eq!(stats.std, 1.0);
    }

    #[test]
    fn test_percentile_single_value() {
        assert_eq!(percentile_sorted(&[42.0], 5.0), 42.0);
        assert_eq!(percentile_sorted(&[], 50.0), 0.0);
    }
}
