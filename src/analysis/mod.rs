//! Numeric building blocks shared by the detectors.

#[cfg(feature = "forest")]
pub mod forest;
pub mod stats;

pub use stats::SeriesStats;
