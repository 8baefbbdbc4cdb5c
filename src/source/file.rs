//! JSON file reading source (a dump of the reading table).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use super::{RawReading, ReadingSource, SourceError};

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Parse a JSON array of reading rows.
    pub fn load(path: &Path) -> Result<Vec<RawReading>, SourceError> {
        let content = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl ReadingSource for FileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    /// Rows may be stored in any order; they are returned newest first.
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<RawReading>, SourceError> {
        let mut rows = Self::load(&self.path)?;
        rows.sort_by(|a, b| timestamp_key(&b.created_at).cmp(&timestamp_key(&a.created_at)));
        rows.truncate(limit);
        info!(rows = rows.len(), path = %self.path.display(), "Loaded readings from file");
        Ok(rows)
    }
}

fn timestamp_key(value: &serde_json::Value) -> &str {
    value.as_str().unwrap_or("")
}
