//! Summary store backed by a Supabase project (PostgREST over HTTP)

use super::{insertion_timestamp, sort_newest_first, NewSummary, SummaryRecord, SummaryStore};
use crate::config::{redact_url, SupabaseConfig};
use crate::errors::StoreError;
use crate::metrics::{record_skipped_rows, Outcome, StoreTimer};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

const BACKEND: &str = "supabase";
const TABLE: &str = "video_summaries";
const REQUIRED_FIELDS: &[&str] = &[
    "id",
    "video_id",
    "title",
    "summary",
    "language",
    "timestamp",
    "source_urls",
];

/// Row shape sent on insert; `id` is assigned by the database
#[derive(Serialize)]
struct InsertRow<'a> {
    video_id: &'a str,
    title: &'a str,
    summary: &'a str,
    language: &'a str,
    source_urls: &'a str,
    timestamp: String,
}

/// PostgREST client for the `video_summaries` table
pub struct SupabaseStore {
    client: reqwest::Client,
    table_url: String,
    key: String,
    closed: AtomicBool,
}

impl SupabaseStore {
    /// Build the client and run the liveness probe
    pub async fn connect(config: &SupabaseConfig) -> Result<Self, StoreError> {
        let url = non_empty(config.url.as_deref()).ok_or_else(|| StoreError::Configuration {
            message: "Supabase URL is not set (SUPABASE_URL or store.supabase.url)".to_string(),
        })?;
        let key = non_empty(config.key.as_deref()).ok_or_else(|| StoreError::Configuration {
            message: "Supabase API key is not set (SUPABASE_KEY or store.supabase.key)".to_string(),
        })?;

        info!(url = %redact_url(url), "Initializing Supabase client...");

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let store = Self {
            client,
            table_url: format!("{}/rest/v1/{}", url.trim_end_matches('/'), TABLE),
            key: key.to_string(),
            closed: AtomicBool::new(false),
        };

        if !store.verify_connection().await {
            return Err(StoreError::Connection {
                message: "Supabase connection verification failed; check credentials and network"
                    .to_string(),
            });
        }

        info!("Supabase client connected");
        Ok(store)
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        self.client
            .request(method, &self.table_url)
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
    }

    async fn query(&self, language: Option<&str>, limit: u64) -> Vec<SummaryRecord> {
        let timer = StoreTimer::start(BACKEND, "list");

        if limit == 0 {
            timer.finish(Outcome::Success);
            return Vec::new();
        }

        if !self.verify_connection().await {
            warn!(backend = BACKEND, "Database connection is not active, returning no summaries");
            timer.finish(Outcome::Unavailable);
            return Vec::new();
        }

        let mut params: Vec<(&str, String)> = vec![
            ("select", "*".to_string()),
            ("order", "timestamp.desc,id.desc".to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(language) = language {
            params.push(("language", format!("eq.{}", language)));
        }

        let rows = match self.fetch_rows(&params).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(backend = BACKEND, error = %e, language = ?language, "Failed to load summaries");
                timer.finish(Outcome::Error);
                return Vec::new();
            }
        };

        let total = rows.len();
        let mut records: Vec<SummaryRecord> = rows.iter().filter_map(parse_row).collect();

        let skipped = total - records.len();
        if skipped > 0 {
            warn!(backend = BACKEND, skipped, total, "Skipped malformed summary rows");
            record_skipped_rows(BACKEND, skipped);
        }

        // The server already orders; keep the contract even if it did not
        sort_newest_first(&mut records);

        timer.finish(Outcome::Success);
        records
    }

    async fn fetch_rows(&self, params: &[(&str, String)]) -> Result<Vec<Value>, reqwest::Error> {
        self.request(reqwest::Method::GET)
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Value>>()
            .await
    }
}

#[async_trait]
impl SummaryStore for SupabaseStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn verify_connection(&self) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }

        let result = self
            .request(reqwest::Method::GET)
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await
            .and_then(|response| response.error_for_status());

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(backend = BACKEND, error = %e, "Connection verification failed");
                return false;
            }
        };

        match response.json::<Vec<Value>>().await {
            Ok(_) => true,
            Err(e) => {
                warn!(backend = BACKEND, error = %e, "Unexpected probe response");
                false
            }
        }
    }

    async fn save_summary(&self, summary: NewSummary) -> Result<SummaryRecord, StoreError> {
        summary.validate()?;
        let timer = StoreTimer::start(BACKEND, "save_summary");

        if !self.verify_connection().await {
            timer.finish(Outcome::Unavailable);
            return Err(StoreError::Connection {
                message: "Database connection is not active".to_string(),
            });
        }

        let row = InsertRow {
            video_id: &summary.video_id,
            title: &summary.title,
            summary: &summary.summary,
            language: &summary.language,
            source_urls: &summary.source_urls,
            timestamp: insertion_timestamp().to_rfc3339_opts(SecondsFormat::Micros, true),
        };

        let result = async {
            let rows = self
                .request(reqwest::Method::POST)
                .header("Prefer", "return=representation")
                .json(&row)
                .send()
                .await?
                .error_for_status()?
                .json::<Vec<Value>>()
                .await?;
            Ok::<_, reqwest::Error>(rows)
        }
        .await;

        let rows = match result {
            Ok(rows) => rows,
            Err(e) => {
                error!(backend = BACKEND, error = %e, "Failed to save summary");
                timer.finish(Outcome::Error);
                return Err(StoreError::Persistence {
                    message: e.to_string(),
                });
            }
        };

        match rows.first().and_then(parse_row) {
            Some(record) => {
                debug!(id = record.id, video_id = %record.video_id, "Summary saved");
                timer.finish(Outcome::Success);
                Ok(record)
            }
            None => {
                error!(backend = BACKEND, "Insert returned no usable row");
                timer.finish(Outcome::Error);
                Err(StoreError::Persistence {
                    message: "No data returned from Supabase".to_string(),
                })
            }
        }
    }

    async fn get_recent_summaries(&self, limit: u64) -> Vec<SummaryRecord> {
        self.query(None, limit).await
    }

    async fn get_summaries_by_language(&self, language: &str, limit: u64) -> Vec<SummaryRecord> {
        self.query(Some(language), limit).await
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!(backend = BACKEND, "Supabase client released");
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Convert one JSON row; `None` when a required field is missing or invalid
fn parse_row(row: &Value) -> Option<SummaryRecord> {
    if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| row.get(**f).map_or(true, Value::is_null)) {
        debug!(field = *missing, "Row is missing a required field");
        return None;
    }

    let text = |field: &str| row.get(field)?.as_str().map(str::to_string);

    Some(SummaryRecord {
        id: row.get("id")?.as_i64()?,
        video_id: text("video_id")?,
        title: text("title")?,
        summary: text("summary")?,
        language: text("language")?,
        timestamp: parse_timestamp(row.get("timestamp")?.as_str()?)?,
        source_urls: text("source_urls")?,
    })
}

/// Accept RFC 3339 (timestamptz columns) or a naive ISO-8601 value,
/// which is taken to be UTC
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}
