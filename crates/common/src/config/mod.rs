//! Configuration management for TubeScribe services
//!
//! Supports loading configuration from (lowest precedence first):
//! - Default values
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Environment variables (prefixed with APP__)
//! - Well-known variables such as DATABASE_URL or SUPABASE_KEY

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Well-known environment variables and the config keys they override.
const EXPLICIT_ENV_OVERRIDES: &[(&str, &str)] = &[
    ("DATABASE_URL", "store.database.url"),
    ("SUPABASE_URL", "store.supabase.url"),
    ("SUPABASE_KEY", "store.supabase.key"),
    ("YOUTUBE_API_KEY", "youtube.api_key"),
    ("GEMINI_API_KEY", "gemini.api_key"),
];

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Summary store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// YouTube Data API configuration
    #[serde(default)]
    pub youtube: YouTubeConfig,

    /// Gemini configuration
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

/// Which summary store backend to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Relational database through SeaORM (Postgres in production)
    #[default]
    #[serde(alias = "postgres", alias = "postgresql")]
    Sql,
    /// Supabase PostgREST endpoint
    Supabase,
    /// Process-local store, nothing survives a restart
    Memory,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Sql => "sql",
            StoreBackend::Supabase => "supabase",
            StoreBackend::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub supabase: SupabaseConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Connection string; `postgres://` is normalized to `postgresql://`
    pub url: Option<String>,

    /// Maximum number of connections (baseline + overflow)
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections kept open
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Pool checkout timeout in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Log every SQL statement through tracing
    #[serde(default)]
    pub sqlx_logging: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SupabaseConfig {
    /// Project URL, e.g. https://xyz.supabase.co
    pub url: Option<String>,

    /// Service or anon key
    pub key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct YouTubeConfig {
    pub api_key: Option<String>,

    #[serde(default = "default_youtube_api_base")]
    pub api_base: String,

    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,

    /// Total time budget for retrying transient failures, in seconds
    #[serde(default = "default_retry_budget")]
    pub retry_budget_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeminiConfig {
    pub api_key: Option<String>,

    #[serde(default = "default_gemini_api_base")]
    pub api_base: String,

    #[serde(default = "default_gemini_model")]
    pub model: String,

    #[serde(default = "default_gemini_timeout")]
    pub timeout_secs: u64,

    /// Total time budget for retrying transient failures, in seconds
    #[serde(default = "default_retry_budget")]
    pub retry_budget_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level or EnvFilter directive (debug, info, tubescribe=debug, ...)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Prometheus exporter port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 120 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_connections() -> u32 { 15 }
fn default_min_connections() -> u32 { 5 }
fn default_connect_timeout() -> u64 { 10 }
fn default_acquire_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 300 }
fn default_http_timeout() -> u64 { 30 }
fn default_youtube_api_base() -> String { "https://www.googleapis.com/youtube/v3".to_string() }
fn default_gemini_api_base() -> String { "https://generativelanguage.googleapis.com/v1beta".to_string() }
fn default_gemini_model() -> String { "gemini-1.5-flash".to_string() }
fn default_gemini_timeout() -> u64 { 90 }
fn default_retry_budget() -> u64 { 20 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { false }
fn default_metrics_port() -> u16 { 0 }
fn default_service_name() -> String { "tubescribe".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            acquire_timeout_secs: default_acquire_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            sqlx_logging: false,
        }
    }
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            key: None,
            timeout_secs: default_http_timeout(),
        }
    }
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_youtube_api_base(),
            timeout_secs: default_http_timeout(),
            retry_budget_secs: default_retry_budget(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_gemini_api_base(),
            model: default_gemini_model(),
            timeout_secs: default_gemini_timeout(),
            retry_budget_secs: default_retry_budget(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let explicit: Vec<(&str, Option<String>)> = EXPLICIT_ENV_OVERRIDES
            .iter()
            .map(|(var, key)| (*key, std::env::var(var).ok()))
            .collect();

        Self::from_sources(&env, &explicit)
    }

    /// Build from config files, APP__ variables and explicit overrides.
    ///
    /// Explicit overrides win over every other source; `None` and empty
    /// values leave the underlying setting untouched.
    pub fn from_sources(
        env: &str,
        explicit: &[(&str, Option<String>)],
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., APP__STORE__BACKEND=supabase
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        for (key, value) in explicit {
            let value = value.as_deref().filter(|v| !v.trim().is_empty());
            builder = builder.set_override_option(*key, value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }
}

/// Normalize a connection string to the scheme the SQL driver expects.
pub fn normalize_database_url(url: &str) -> String {
    match url.strip_prefix("postgres://") {
        Some(rest) => format!("postgresql://{}", rest),
        None => url.to_string(),
    }
}

/// Strip credentials from a URL so it can be logged.
pub fn redact_url(url: &str) -> String {
    let (scheme, rest) = match url.split_once("://") {
        Some((scheme, rest)) => (Some(scheme), rest),
        None => (None, url),
    };
    // Credentials can only live in the authority, never in path or query
    let (authority, tail) = match rest.find(['/', '?', '#']) {
        Some(end) => rest.split_at(end),
        None => (rest, ""),
    };
    let host = authority
        .rsplit_once('@')
        .map(|(_, host)| host)
        .unwrap_or(authority);

    match scheme {
        Some(scheme) => format!("{}://{}{}", scheme, host, tail),
        None => format!("{}{}", host, tail),
    }
}
