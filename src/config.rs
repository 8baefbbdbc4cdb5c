//! TOML configuration for sensorsentry.
//!
//! Every section has compiled-in defaults matching the reference detector
//! behavior, so an empty (or absent) file is a valid configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::detect::Metric;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SENSORSENTRY_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG: &str = "sensorsentry.toml";

/// Placeholder printed in place of credentials.
pub const REDACTED: &str = "<redacted>";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Resolve configuration, in order:
    /// 1. An explicit path (from `--config`); failing to load it is an error.
    /// 2. The path in `SENSORSENTRY_CONFIG`.
    /// 3. `./sensorsentry.toml`.
    /// 4. Compiled-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        Ok(Self::load_or_default())
    }

    /// Copy suitable for printing: credentials are masked.
    pub fn redacted(&self) -> Self {
        let mut cfg = self.clone();
        if cfg.source.supabase_key.is_some() {
            cfg.source.supabase_key = Some(REDACTED.to_string());
        }
        cfg
    }

    /// Like [`AppConfig::resolve`] without an explicit path; never fails.
    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "SENSORSENTRY_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let local = Path::new(LOCAL_CONFIG);
        if local.exists() {
            match Self::load(local) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %local.display(),
                        error = %e,
                        "local config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Where readings come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Supabase / PostgREST table over HTTP.
    Supabase,
    /// Local SQLite reading store.
    Sqlite,
    /// JSON array of readings on disk.
    File,
}

/// Reading source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Maximum number of most recent readings analyzed per run.
    pub limit: usize,
    /// Base URL of the Supabase project (e.g. `https://xyz.supabase.co`).
    pub supabase_url: Option<String>,
    /// API key sent as `apikey` and bearer token.
    pub supabase_key: Option<String>,
    /// Table holding the readings.
    pub table: String,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
    /// SQLite reading store.
    pub db_path: PathBuf,
    /// JSON file used by the `file` source.
    pub input_path: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Supabase,
            limit: 500,
            supabase_url: None,
            supabase_key: None,
            table: "sensor_readings".to_string(),
            timeout_secs: 30,
            db_path: PathBuf::from("data/sensorsentry.db"),
            input_path: PathBuf::from("readings.json"),
        }
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Thresholds and tier cutoffs for every detector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub zscore: ZScoreConfig,
    pub rate: RateConfig,
    pub forest: ForestConfig,
    pub report: ReportConfig,
}

/// Z-score detector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZScoreConfig {
    /// Flag when `z` strictly exceeds this.
    pub threshold: f64,
    /// `z` above this is medium severity.
    pub medium_above: f64,
    /// `z` above this is high severity.
    pub high_above: f64,
    /// Minimum valid values before the detector runs.
    pub min_samples: usize,
    /// Half-width of the reported expected range, in standard deviations.
    pub range_sigmas: f64,
}

impl Default for ZScoreConfig {
    fn default() -> Self {
        Self {
            threshold: 3.0,
            medium_above: 3.5,
            high_above: 4.0,
            min_samples: 10,
            range_sigmas: 2.0,
        }
    }
}

/// Rate-of-change detector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// Max temperature change between consecutive readings (degrees).
    pub temperature_threshold: f64,
    /// Max humidity change between consecutive readings (% RH).
    pub humidity_threshold: f64,
    /// Change above `threshold * medium_factor` is medium severity.
    pub medium_factor: f64,
    /// Change above `threshold * high_factor` is high severity.
    pub high_factor: f64,
}

impl RateConfig {
    pub fn threshold(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Temperature => self.temperature_threshold,
            Metric::Humidity => self.humidity_threshold,
        }
    }
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            temperature_threshold: 2.0,
            humidity_threshold: 5.0,
            medium_factor: 1.5,
            high_factor: 2.0,
        }
    }
}

/// Isolation-forest detector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub enabled: bool,
    /// Expected fraction of anomalous points; sets the decision offset.
    pub contamination: f64,
    pub n_estimators: usize,
    /// Sub-sample size per tree (capped at the number of points).
    pub max_samples: usize,
    pub seed: u64,
    /// Minimum complete (temperature, humidity) pairs before fitting.
    pub min_samples: usize,
    /// Scores below this are medium severity.
    pub medium_below: f64,
    /// Scores below this are high severity.
    pub high_below: f64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            contamination: 0.05,
            n_estimators: 100,
            max_samples: 256,
            seed: 42,
            min_samples: 20,
            medium_below: -0.1,
            high_below: -0.3,
        }
    }
}

/// Summary construction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Number of anomalies included in the detail list.
    pub detail_limit: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { detail_limit: 20 }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Report sink configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where the JSON report is written.
    pub report_path: PathBuf,
    /// Anomalies listed in the text report.
    pub top_anomalies: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report_path: PathBuf::from("anomalies_output.json"),
            top_anomalies: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Emit JSON log lines instead of human-readable ones.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
