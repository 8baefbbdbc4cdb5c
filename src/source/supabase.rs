//! Supabase (PostgREST) reading source.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{RawReading, ReadingSource, SourceError};
use crate::config::SourceConfig;

pub struct SupabaseSource {
    client: reqwest::Client,
    base_url: String,
    key: Option<String>,
    table: String,
}

impl SupabaseSource {
    pub fn new(base_url: &str, key: Option<String>, table: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key,
            table: table.to_string(),
        })
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self, SourceError> {
        let url = config
            .supabase_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or(SourceError::NotConfigured("supabase_url (or SUPABASE_URL) is required"))?;
        Self::new(
            url,
            config.supabase_key.clone(),
            &config.table,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// REST endpoint selecting the newest `limit` rows.
    pub fn endpoint(&self, limit: usize) -> String {
        format!(
            "{}/rest/v1/{}?select=id,temperature,humidity,created_at&order=created_at.desc&limit={}",
            self.base_url, self.table, limit
        )
    }
}

#[async_trait]
impl ReadingSource for SupabaseSource {
    fn name(&self) -> &'static str {
        "supabase"
    }

    async fn fetch_recent(&self, limit: usize) -> Result<Vec<RawReading>, SourceError> {
        let url = self.endpoint(limit);
        debug!(%url, "Fetching readings");

        let mut req = self.client.get(&url).header("Accept", "application/json");
        if let Some(key) = &self.key {
            req = req.header("apikey", key).bearer_auth(key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let rows: Vec<RawReading> = resp.json().await?;
        info!(rows = rows.len(), table = %self.table, "Fetched readings from Supabase");
        Ok(rows)
    }
}
