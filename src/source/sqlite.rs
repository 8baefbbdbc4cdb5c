//! Local SQLite reading source, backed by [`crate::storage`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::{RawReading, ReadingSource, SourceError};
use crate::detect::Reading;
use crate::storage;

pub struct SqliteSource {
    db_path: PathBuf,
}

impl SqliteSource {
    pub fn new(db_path: &Path) -> Self {
        Self {
            db_path: db_path.to_path_buf(),
        }
    }
}

impl From<Reading> for RawReading {
    fn from(r: Reading) -> Self {
        Self {
            id: Value::from(r.id),
            temperature: r.temperature.map(Value::from).unwrap_or(Value::Null),
            humidity: r.humidity.map(Value::from).unwrap_or(Value::Null),
            created_at: Value::String(r.timestamp),
        }
    }
}

#[async_trait]
impl ReadingSource for SqliteSource {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn fetch_recent(&self, limit: usize) -> Result<Vec<RawReading>, SourceError> {
        // Opening the pool would create an empty store at a mistyped path
        if !self.db_path.exists() {
            return Err(SourceError::Io {
                path: self.db_path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "reading store does not exist"),
            });
        }

        let db_path = self.db_path.clone();

        // rusqlite is blocking; keep it off the async workers
        let readings = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<Reading>> {
            let pool = storage::open_pool(&db_path)?;
            storage::recent_readings(&pool, limit)
        })
        .await
        .map_err(|e| SourceError::Database(e.to_string()))?
        .map_err(|e| SourceError::Database(format!("{e:#}")))?;

        info!(rows = readings.len(), path = %self.db_path.display(), "Loaded readings from SQLite");
        Ok(readings.into_iter().map(RawReading::from).collect())
    }
}
