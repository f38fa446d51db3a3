//! Process-local summary store

use super::{insertion_timestamp, sort_newest_first, NewSummary, SummaryRecord, SummaryStore};
use crate::errors::StoreError;
use crate::metrics::{Outcome, StoreTimer};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, warn};

const BACKEND: &str = "memory";

/// Keeps records in a vector guarded by an async lock.
///
/// `set_available(false)` makes the probe fail, which lets callers
/// exercise the degraded read path and the failing write path.
pub struct MemoryStore {
    records: RwLock<Vec<SummaryRecord>>,
    next_id: AtomicI64,
    available: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the backend going away (or coming back)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of stored records, regardless of availability
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn query(&self, language: Option<&str>, limit: u64) -> Vec<SummaryRecord> {
        let timer = StoreTimer::start(BACKEND, "list");

        if limit == 0 {
            timer.finish(Outcome::Success);
            return Vec::new();
        }

        if !self.verify_connection().await {
            warn!(backend = BACKEND, "Store unavailable, returning no summaries");
            timer.finish(Outcome::Unavailable);
            return Vec::new();
        }

        let mut records: Vec<SummaryRecord> = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| language.map_or(true, |lang| r.language == lang))
            .cloned()
            .collect();

        sort_newest_first(&mut records);
        records.truncate(usize::try_from(limit).unwrap_or(usize::MAX));

        timer.finish(Outcome::Success);
        records
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SummaryStore for MemoryStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn verify_connection(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn save_summary(&self, summary: NewSummary) -> Result<SummaryRecord, StoreError> {
        summary.validate()?;
        let timer = StoreTimer::start(BACKEND, "save_summary");

        if !self.verify_connection().await {
            timer.finish(Outcome::Unavailable);
            return Err(StoreError::Connection {
                message: "memory store is unavailable".to_string(),
            });
        }

        let record = SummaryRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            video_id: summary.video_id,
            title: summary.title,
            summary: summary.summary,
            language: summary.language,
            timestamp: insertion_timestamp(),
            source_urls: summary.source_urls,
        };

        self.records.write().await.push(record.clone());
        debug!(id = record.id, video_id = %record.video_id, "Summary saved");

        timer.finish(Outcome::Success);
        Ok(record)
    }

    async fn get_recent_summaries(&self, limit: u64) -> Vec<SummaryRecord> {
        self.query(None, limit).await
    }

    async fn get_summaries_by_language(&self, language: &str, limit: u64) -> Vec<SummaryRecord> {
        self.query(Some(language), limit).await
    }

    async fn close(&self) {
        self.set_available(false);
    }
}
