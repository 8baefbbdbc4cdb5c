//! Reading sources: where the analysis window comes from.
//!
//! Every source returns up to `limit` of the most recent rows, newest first,
//! as [`RawReading`]s. Validation happens later in
//! [`Window::from_newest_first`](crate::detect::Window::from_newest_first).

pub mod file;
pub mod sqlite;
pub mod supabase;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{SourceConfig, SourceKind};
pub use crate::detect::reading::RawReading;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source is not configured: {0}")]
    NotConfigured(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("database error: {0}")]
    Database(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid reading payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A collaborator that supplies recent readings for one device stream.
#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Fetch up to `limit` most recent readings, newest first. An empty
    /// vector means there is no data, not an error.
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<RawReading>, SourceError>;
}

/// Build the source selected in `config`.
pub fn from_config(config: &SourceConfig) -> Result<Box<dyn ReadingSource>, SourceError> {
    let source: Box<dyn ReadingSource> = match config.kind {
        SourceKind::Supabase => Box::new(supabase::SupabaseSource::from_config(config)?),
        SourceKind::Sqlite => Box::new(sqlite::SqliteSource::new(&config.db_path)),
        SourceKind::File => Box::new(file::FileSource::new(&config.input_path)),
    };
    Ok(source)
}
