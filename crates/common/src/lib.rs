//! TubeScribe Common Library
//!
//! Shared code for the TubeScribe services:
//! - Summary storage behind the `SummaryStore` contract
//! - Database entity and connection management
//! - YouTube metadata and Gemini article clients
//! - Error types and handling
//! - Configuration management
//! - Metrics

pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod store;
pub mod summarizer;
pub mod youtube;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result, StoreError};
pub use store::{connect_store, NewSummary, SummaryRecord, SummaryStore, DEFAULT_LIMIT};
pub use summarizer::Summarizer;
pub use youtube::{VideoMetadata, VideoSource};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Language used when a request does not name one
pub const DEFAULT_LANGUAGE: &str = "ja";
