//! Summary storage
//!
//! A single `SummaryStore` contract with interchangeable backends:
//! - `SqlStore`: relational database through SeaORM
//! - `SupabaseStore`: Supabase PostgREST over HTTP
//! - `MemoryStore`: process-local, for development and tests
//!
//! Writes fail loudly. Reads degrade to an empty result when the backend
//! is unreachable, so a caller cannot tell "nothing stored" from "read
//! failed"; the failure is logged and counted instead.

mod memory;
mod sql;
mod supabase;

pub use memory::MemoryStore;
pub use sql::SqlStore;
pub use supabase::SupabaseStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::db::models::VideoSummary;
use crate::errors::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Number of records returned when the caller does not specify a limit
pub const DEFAULT_LIMIT: u64 = 5;

/// One persisted summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub id: i64,
    pub video_id: String,
    pub title: String,
    pub summary: String,
    pub language: String,
    pub timestamp: DateTime<Utc>,
    pub source_urls: String,
}

impl SummaryRecord {
    /// Split `source_urls` back into individual URLs
    pub fn source_url_list(&self) -> Vec<&str> {
        self.source_urls
            .split(',')
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .collect()
    }
}

impl From<VideoSummary> for SummaryRecord {
    fn from(model: VideoSummary) -> Self {
        Self {
            id: model.id.into(),
            video_id: model.video_id,
            title: model.title,
            summary: model.summary,
            language: model.language,
            timestamp: model.timestamp,
            source_urls: model.source_urls,
        }
    }
}

/// Caller-supplied fields of a summary about to be saved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSummary {
    pub video_id: String,
    pub title: String,
    pub summary: String,
    pub language: String,
    pub source_urls: String,
}

impl NewSummary {
    /// Build from a list of source URLs, joining them with commas
    pub fn from_sources<S: AsRef<str>>(
        video_id: impl Into<String>,
        title: impl Into<String>,
        summary: impl Into<String>,
        language: impl Into<String>,
        sources: &[S],
    ) -> Self {
        Self {
            video_id: video_id.into(),
            title: title.into(),
            summary: summary.into(),
            language: language.into(),
            source_urls: sources
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Reject the first required field that is empty or whitespace
    pub fn validate(&self) -> Result<(), StoreError> {
        let fields = [
            ("video_id", &self.video_id),
            ("title", &self.title),
            ("summary", &self.summary),
            ("language", &self.language),
            ("source_urls", &self.source_urls),
        ];

        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(StoreError::InvalidInput { field: *field }),
            None => Ok(()),
        }
    }
}

/// Storage contract shared by every backend
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Backend name used in logs and metrics
    fn backend(&self) -> &'static str;

    /// Cheap round-trip against the live connection. Never fails:
    /// any error is logged and reported as `false`.
    async fn verify_connection(&self) -> bool;

    /// Persist a new summary; the store assigns `id` and `timestamp`.
    ///
    /// Probes the connection first and fails with `Connection` if the
    /// probe does not succeed. No retry is attempted.
    async fn save_summary(&self, summary: NewSummary) -> Result<SummaryRecord, StoreError>;

    /// Most recent summaries first (ties broken by id, newest first).
    /// Returns an empty list when the backend is unreachable.
    async fn get_recent_summaries(&self, limit: u64) -> Vec<SummaryRecord>;

    /// Like `get_recent_summaries`, restricted to an exact language match
    async fn get_summaries_by_language(&self, language: &str, limit: u64) -> Vec<SummaryRecord>;

    /// Release the connection. Safe to call more than once.
    async fn close(&self);
}

/// Construct the configured backend and prove it is reachable
pub async fn connect_store(config: &StoreConfig) -> Result<Arc<dyn SummaryStore>, StoreError> {
    info!(backend = config.backend.as_str(), "Initializing summary store");

    let store: Arc<dyn SummaryStore> = match config.backend {
        StoreBackend::Sql => Arc::new(SqlStore::connect(&config.database).await?),
        StoreBackend::Supabase => Arc::new(SupabaseStore::connect(&config.supabase).await?),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };

    info!(backend = store.backend(), "Summary store ready");
    Ok(store)
}

/// Insertion timestamp, truncated to what every backend can represent
pub(crate) fn insertion_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Newest first; equal timestamps fall back to the higher id
pub(crate) fn sort_newest_first(records: &mut [SummaryRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;

    pub(crate) fn sample(language: &str) -> NewSummary {
        NewSummary {
            video_id: "abc123".to_string(),
            title: "Test Video".to_string(),
            summary: "A short summary.".to_string(),
            language: language.to_string(),
            source_urls: "https://youtu.be/abc123".to_string(),
        }
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        assert!(sample("en").validate().is_ok());

        let mut summary = sample("en");
        summary.title = "   ".to_string();
        assert_eq!(
            summary.validate(),
            Err(StoreError::InvalidInput { field: "title" })
        );

        let mut summary = sample("en");
        summary.source_urls.clear();
        assert_eq!(
            summary.validate(),
            Err(StoreError::InvalidInput { field: "source_urls" })
        );
    }

    #[test]
    fn test_from_sources_joins_with_commas() {
        let summary = NewSummary::from_sources(
            "abc123",
            "Test Video",
            "body",
            "ja",
            &["https://youtu.be/abc123", "https://youtu.be/def456"],
        );
        assert_eq!(
            summary.source_urls,
            "https://youtu.be/abc123,https://youtu.be/def456"
        );
    }

    #[test]
    fn test_source_url_list() {
        let record = SummaryRecord {
            id: 1,
            video_id: "abc123".into(),
            title: "t".into(),
            summary: "s".into(),
            language: "en".into(),
            timestamp: Utc::now(),
            source_urls: "https://a, https://b,".into(),
        };
        assert_eq!(record.source_url_list(), vec!["https://a", "https://b"]);
    }

    #[test]
    fn test_sort_breaks_ties_by_id() {
        let ts = insertion_timestamp();
        let make = |id| SummaryRecord {
            id,
            video_id: "v".into(),
            title: "t".into(),
            summary: "s".into(),
            language: "en".into(),
            timestamp: ts,
            source_urls: "u".into(),
        };
        let mut records = vec![make(1), make(3), make(2)];
        sort_newest_first(&mut records);
        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_missing_sql_url_is_configuration_error() {
        let config = StoreConfig {
            backend: StoreBackend::Sql,
            database: DatabaseConfig::default(),
            ..Default::default()
        };
        let err = connect_store(&config).await.err().unwrap();
        assert!(matches!(err, StoreError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_missing_supabase_key_is_configuration_error() {
        let mut config = StoreConfig {
            backend: StoreBackend::Supabase,
            ..Default::default()
        };
        config.supabase.url = Some("http://127.0.0.1:9".to_string());
        let err = connect_store(&config).await.err().unwrap();
        assert!(matches!(err, StoreError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_factory_builds_memory_backend() {
        let config = StoreConfig {
            backend: StoreBackend::Memory,
            ..Default::default()
        };
        let store = connect_store(&config).await.unwrap();
        assert_eq!(store.backend(), "memory");
        assert!(store.verify_connection().await);
    }
}
