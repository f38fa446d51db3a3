//! YouTube video metadata
//!
//! - URL screening and video id extraction
//! - `VideoSource` trait with a YouTube Data API v3 client
//! - Concurrent fetching with per-URL failures

use crate::config::YouTubeConfig;
use crate::errors::{AppError, FetchFailure, Result};
use crate::metrics::record_upstream;
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use futures::future::join_all;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

const SERVICE: &str = "youtube";

/// Metadata for one video, as handed to the summarizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub video_id: String,
    pub url: String,
    pub title: String,
    pub description: String,
    pub channel_title: String,
    pub published_at: Option<String>,
    /// ISO-8601 duration, e.g. PT12M3S
    pub duration: Option<String>,
    pub view_count: Option<u64>,
}

/// Trait for looking up video metadata by URL
#[async_trait]
pub trait VideoSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<VideoMetadata>;
}

/// Keep lines that look like YouTube links, trimmed, in input order
pub fn filter_youtube_urls<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    lines
        .iter()
        .map(|line| line.as_ref().trim())
        .filter(|line| !line.is_empty() && (line.contains("youtube.com") || line.contains("youtu.be")))
        .map(str::to_string)
        .collect()
}

fn video_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?:youtu\.be/|[?&]v=|/embed/|/shorts/|/live/|/v/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
        )
        .expect("video id pattern is valid")
    })
}

/// Extract the 11-character video id from a YouTube URL
pub fn extract_video_id(url: &str) -> Option<String> {
    video_id_pattern()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Fetch every URL concurrently. Successes keep input order; failures
/// are reported per URL instead of aborting the batch.
pub async fn fetch_videos(
    source: &dyn VideoSource,
    urls: &[String],
) -> (Vec<VideoMetadata>, Vec<FetchFailure>) {
    let results = join_all(urls.iter().map(|url| source.fetch(url))).await;

    let mut videos = Vec::with_capacity(urls.len());
    let mut failures = Vec::new();

    for (url, result) in urls.iter().zip(results) {
        match result {
            Ok(video) => videos.push(video),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to fetch video metadata");
                failures.push(FetchFailure {
                    url: url.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    (videos, failures)
}

/// YouTube Data API v3 client
pub struct YouTubeClient {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    retry_budget: Duration,
}

#[derive(Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    snippet: Snippet,
    content_details: Option<ContentDetails>,
    statistics: Option<Statistics>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    channel_title: String,
    published_at: Option<String>,
}

#[derive(Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    // The API encodes counts as strings
    view_count: Option<String>,
}

impl YouTubeClient {
    pub fn new(config: &YouTubeConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: "YOUTUBE_API_KEY is not set".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            retry_budget: Duration::from_secs(config.retry_budget_secs),
        })
    }

    async fn make_request(&self, video_id: &str) -> Result<VideoListResponse> {
        let url = format!("{}/videos", self.api_base);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("part", "snippet,contentDetails,statistics"),
                ("id", video_id),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream {
                service: SERVICE.to_string(),
                message: format!("Request failed: {}", e.without_url()),
                retryable: true,
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                service: SERVICE.to_string(),
                message: format!("API error {}: {}", status, body),
                retryable: is_retryable_status(status),
            });
        }

        response.json().await.map_err(|e| AppError::Upstream {
            service: SERVICE.to_string(),
            message: format!("Failed to parse response: {}", e),
            retryable: false,
        })
    }
}

#[async_trait]
impl VideoSource for YouTubeClient {
    async fn fetch(&self, url: &str) -> Result<VideoMetadata> {
        let video_id = extract_video_id(url).ok_or_else(|| AppError::InvalidUrl {
            url: url.to_string(),
        })?;

        let policy = ExponentialBackoff {
            max_elapsed_time: Some(self.retry_budget),
            ..Default::default()
        };

        let start = Instant::now();
        let result = retry(policy, || async {
            self.make_request(&video_id).await.map_err(|e| {
                if is_transient(&e) {
                    tracing::warn!(video_id = %video_id, error = %e, "YouTube request failed, retrying");
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .await;
        record_upstream(SERVICE, start.elapsed().as_secs_f64(), result.is_ok());

        let item = result?
            .items
            .into_iter()
            .next()
            .ok_or_else(|| AppError::VideoNotFound {
                video_id: video_id.clone(),
            })?;

        Ok(VideoMetadata {
            video_id,
            url: url.to_string(),
            title: item.snippet.title,
            description: item.snippet.description,
            channel_title: item.snippet.channel_title,
            published_at: item.snippet.published_at,
            duration: item.content_details.and_then(|d| d.duration),
            view_count: item
                .statistics
                .and_then(|s| s.view_count)
                .and_then(|v| v.parse().ok()),
        })
    }
}

/// Rate limiting and 5xx answers may succeed on a later attempt
pub(crate) fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Whether a failed upstream call is worth another attempt
pub(crate) fn is_transient(err: &AppError) -> bool {
    match err {
        AppError::Upstream { retryable, .. } => *retryable,
        AppError::HttpClient(_) => true,
        _ => false,
    }
}

/// Serves metadata from a fixed table; unknown URLs are not found
#[derive(Default)]
pub struct StaticVideoSource {
    videos: HashMap<String, VideoMetadata>,
}

impl StaticVideoSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a video under its URL
    pub fn with_video(mut self, url: &str, title: &str) -> Self {
        let video_id = extract_video_id(url).unwrap_or_else(|| url.to_string());
        self.videos.insert(
            url.to_string(),
            VideoMetadata {
                video_id,
                url: url.to_string(),
                title: title.to_string(),
                description: format!("Description of {}", title),
                channel_title: "Test Channel".to_string(),
                published_at: None,
                duration: None,
                view_count: None,
            },
        );
        self
    }

    pub fn into_shared(self) -> Arc<dyn VideoSource> {
        Arc::new(self)
    }
}

#[async_trait]
impl VideoSource for StaticVideoSource {
    async fn fetch(&self, url: &str) -> Result<VideoMetadata> {
        self.videos
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::VideoNotFound {
                video_id: extract_video_id(url).unwrap_or_else(|| url.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_id() {
        let cases = [
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42", "dQw4w9WgXcQ"),
            ("https://youtu.be/dQw4w9WgXcQ?si=abc", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/embed/dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/shorts/dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/live/dQw4w9WgXcQ", "dQw4w9WgXcQ"),
        ];
        for (url, id) in cases {
            assert_eq!(extract_video_id(url).as_deref(), Some(id), "{}", url);
        }

        assert!(extract_video_id("https://www.youtube.com/channel/UC123").is_none());
        assert!(extract_video_id("https://youtu.be/short").is_none());
    }

    #[test]
    fn test_filter_youtube_urls() {
        let lines = [
            "  https://youtu.be/dQw4w9WgXcQ  ",
            "",
            "https://vimeo.com/123",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "   ",
        ];
        assert_eq!(
            filter_youtube_urls(&lines),
            vec![
                "https://youtu.be/dQw4w9WgXcQ".to_string(),
                "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
            ]
        );
    }

    #[test]
    fn test_transient_classification() {
        let upstream = |message: &str, retryable| AppError::Upstream {
            service: SERVICE.to_string(),
            message: message.to_string(),
            retryable,
        };
        assert!(is_transient(&upstream("Request failed: connection reset", true)));
        assert!(!is_transient(&upstream("API error 403 Forbidden: quota", false)));
        // The wording of a message has no say in the decision
        assert!(!is_transient(&upstream("Request failed: bad key", false)));
        assert!(is_transient(&upstream("quota exceeded", true)));
        assert!(!is_transient(&AppError::VideoNotFound { video_id: "x".into() }));
    }

    #[test]
    fn test_retryable_status() {
        use reqwest::StatusCode;
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable_status(StatusCode::FORBIDDEN));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_client_requires_api_key() {
        let err = YouTubeClient::new(&YouTubeConfig::default()).err().unwrap();
        assert!(matches!(err, AppError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_fetch_videos_keys_failures_by_url() {
        let source = StaticVideoSource::new()
            .with_video("https://youtu.be/aaaaaaaaaaa", "First")
            .with_video("https://youtu.be/ccccccccccc", "Third");
        let urls = vec![
            "https://youtu.be/aaaaaaaaaaa".to_string(),
            "https://youtu.be/bbbbbbbbbbb".to_string(),
            "https://youtu.be/ccccccccccc".to_string(),
        ];

        let (videos, failures) = fetch_videos(&source, &urls).await;
        let titles: Vec<&str> = videos.iter().map(|v| v.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Third"]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].url, "https://youtu.be/bbbbbbbbbbb");
        assert!(failures[0].error.contains("bbbbbbbbbbb"));
    }
}
