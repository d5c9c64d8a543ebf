//! Supabase (PostgREST) table source.
//!
//! `GET {url}/rest/v1/{table}?select=*&offset=N&limit=PAGE`, repeated until a
//! page comes back shorter than `PAGE`.

use std::time::Duration;

use fplsnap_core::{Record, Table, TableKind};
use tracing::{debug, info};

use crate::error::SourceError;
use crate::http::FetchClient;
use crate::TableSource;

pub struct SupabaseSource {
    client: FetchClient,
    base_url: String,
    api_key: String,
    page_size: usize,
}

impl SupabaseSource {
    pub fn new(base_url: &str, api_key: &str, page_size: usize, timeout: Duration) -> Self {
        Self {
            client: FetchClient::new("Supabase", timeout, extract_postgrest_error),
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            page_size: page_size.max(1),
        }
    }

    /// Override the first retry interval (tests use zero).
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.client = self.client.with_backoff_base(base);
        self
    }

    fn fetch_rows(&self, table: &str) -> Result<Vec<Record>, SourceError> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let mut rows: Vec<Record> = Vec::new();
        let mut offset = 0usize;
        let mut previous_first: Option<serde_json::Value> = None;

        loop {
            let params = [
                ("select", "*".to_string()),
                ("offset", offset.to_string()),
                ("limit", self.page_size.to_string()),
            ];

            let body = self.client.request_with_retry(|http| {
                http.get(&url)
                    .header("apikey", &self.api_key)
                    .bearer_auth(&self.api_key)
                    .query(&params)
            })?;

            let batch = body.as_array().ok_or_else(|| {
                SourceError::upstream(
                    self.client.source_name(),
                    format!("'{table}' response is not a JSON array"),
                )
            })?;

            debug!(table, offset, rows = batch.len(), "fetched page");

            let full_page = batch.len() >= self.page_size;

            // A server that ignores offset would hand back the same page forever
            if full_page && batch.first().is_some() && previous_first.as_ref() == batch.first() {
                return Err(SourceError::upstream(
                    self.client.source_name(),
                    format!("'{table}' pagination stuck at offset {offset}"),
                ));
            }
            previous_first = batch.first().cloned();

            for (i, item) in batch.iter().enumerate() {
                let obj = item.as_object().ok_or_else(|| {
                    SourceError::upstream(
                        self.client.source_name(),
                        format!("'{table}' row {} is not an object", offset + i),
                    )
                })?;
                rows.push(obj.clone());
            }

            if !full_page {
                break;
            }
            offset += batch.len();
        }

        Ok(rows)
    }
}

impl TableSource for SupabaseSource {
    fn name(&self) -> &str {
        "supabase"
    }

    fn fetch_table(&self, kind: TableKind) -> Result<Table, SourceError> {
        let table = kind.upstream_name();
        info!(table, "fetching latest data");
        let rows = self.fetch_rows(table)?;
        info!(table, rows = rows.len(), "fetched");
        Ok(Table::from_records(table, rows))
    }
}

fn extract_postgrest_error(body: &serde_json::Value, status: u16) -> String {
    body["message"]
        .as_str()
        .or_else(|| body["error"].as_str())
        .or_else(|| body["msg"].as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("HTTP {status}"))
}

// ── Tests ───────────────────────────────────────────────────────────
