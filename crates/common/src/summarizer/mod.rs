//! Article generation from video metadata
//!
//! `Summarizer` is the seam; `GeminiSummarizer` talks to the Gemini
//! `generateContent` endpoint and `MockSummarizer` is used in tests.

use crate::config::GeminiConfig;
use crate::errors::{AppError, Result};
use crate::metrics::record_upstream;
use crate::youtube::{is_retryable_status, is_transient, VideoMetadata};
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::{Duration, Instant};

const SERVICE: &str = "gemini";

/// Longest description excerpt included per video
const MAX_DESCRIPTION_CHARS: usize = 2000;

/// Trait for turning a set of videos into one article
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn generate_article(&self, videos: &[VideoMetadata], language: &str) -> Result<String>;

    /// Model identifier, for logs
    fn model_name(&self) -> &str;
}

/// Human-readable language name used in the prompt
pub fn language_name(tag: &str) -> &str {
    match tag {
        "ja" => "Japanese",
        "en" => "English",
        "zh" => "Chinese",
        "ko" => "Korean",
        "fr" => "French",
        "de" => "German",
        "es" => "Spanish",
        other => other,
    }
}

/// Build the article prompt for a set of videos
pub fn build_prompt(videos: &[VideoMetadata], language: &str) -> String {
    let mut prompt = format!(
        "You are writing for a blog. Combine the information from the following {} YouTube \
         video(s) into one coherent, well-structured article written in {}.\n\
         Use Markdown headings, start with a short introduction, and end with a conclusion. \
         Do not invent facts that are not supported by the material below.\n",
        videos.len(),
        language_name(language)
    );

    for (i, video) in videos.iter().enumerate() {
        let description: String = video.description.chars().take(MAX_DESCRIPTION_CHARS).collect();

        let _ = write!(
            prompt,
            "\n## Video {}\nTitle: {}\nChannel: {}\nURL: {}\n",
            i + 1,
            video.title,
            video.channel_title,
            video.url
        );
        if let Some(published_at) = &video.published_at {
            let _ = writeln!(prompt, "Published: {}", published_at);
        }
        let _ = writeln!(prompt, "Description:\n{}", description);
    }

    prompt
}

/// Gemini API client
pub struct GeminiSummarizer {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    retry_budget: Duration,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GeminiSummarizer {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: "GEMINI_API_KEY is not set".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            retry_budget: Duration::from_secs(config.retry_budget_secs),
        })
    }

    async fn make_request(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Upstream {
                service: SERVICE.to_string(),
                message: format!("Request failed: {}", e),
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

        let result: GenerateResponse = response.json().await.map_err(|e| AppError::Upstream {
            service: SERVICE.to_string(),
            message: format!("Failed to parse response: {}", e),
            retryable: false,
        })?;

        extract_text(result)
    }
}

/// Concatenate the text parts of the first candidate
fn extract_text(response: GenerateResponse) -> Result<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AppError::Upstream {
            service: SERVICE.to_string(),
            message: "Empty response".to_string(),
            retryable: false,
        });
    }

    Ok(text)
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn generate_article(&self, videos: &[VideoMetadata], language: &str) -> Result<String> {
        if videos.is_empty() {
            return Err(AppError::Validation {
                message: "at least one video is required".to_string(),
                field: Some("videos".to_string()),
            });
        }

        let prompt = build_prompt(videos, language);
        let policy = ExponentialBackoff {
            max_elapsed_time: Some(self.retry_budget),
            ..Default::default()
        };

        let start = Instant::now();
        let result = retry(policy, || async {
            self.make_request(&prompt).await.map_err(|e| {
                if is_transient(&e) {
                    tracing::warn!(model = %self.model, error = %e, "Gemini request failed, retrying");
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .await;
        record_upstream(SERVICE, start.elapsed().as_secs_f64(), result.is_ok());

        tracing::info!(
            model = %self.model,
            videos = videos.len(),
            language = %language,
            success = result.is_ok(),
            "Article generation finished"
        );

        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Deterministic summarizer for testing
#[derive(Default)]
pub struct MockSummarizer {
    fail: bool,
}

impl MockSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A summarizer whose every call fails as an upstream error
    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn generate_article(&self, videos: &[VideoMetadata], language: &str) -> Result<String> {
        if self.fail {
            return Err(AppError::Upstream {
                service: SERVICE.to_string(),
                message: "mock failure".to_string(),
                retryable: false,
            });
        }

        let titles: Vec<&str> = videos.iter().map(|v| v.title.as_str()).collect();
        Ok(format!("[{}] Article about: {}", language, titles.join(", ")))
    }

    fn model_name(&self) -> &str {
        "mock-summarizer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(title: &str, description: &str) -> VideoMetadata {
        VideoMetadata {
            video_id: "dQw4w9WgXcQ".into(),
            url: "https://youtu.be/dQw4w9WgXcQ".into(),
            title: title.into(),
            description: description.into(),
            channel_title: "Channel".into(),
            published_at: Some("2024-01-01T00:00:00Z".into()),
            duration: None,
            view_count: None,
        }
    }

    #[test]
    fn test_prompt_mentions_language_and_videos() {
        let prompt = build_prompt(&[video("Rust", "ownership"), video("Tokio", "async")], "ja");
        assert!(prompt.contains("written in Japanese"));
        assert!(prompt.contains("## Video 1\nTitle: Rust"));
        assert!(prompt.contains("## Video 2\nTitle: Tokio"));
        assert!(prompt.contains("Published: 2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_prompt_truncates_descriptions() {
        let long = "あ".repeat(MAX_DESCRIPTION_CHARS + 100);
        let prompt = build_prompt(&[video("Long", &long)], "en");
        assert!(prompt.contains(&"あ".repeat(MAX_DESCRIPTION_CHARS)));
        assert!(!prompt.contains(&"あ".repeat(MAX_DESCRIPTION_CHARS + 1)));
    }

    #[test]
    fn test_unknown_language_falls_back_to_tag() {
        assert_eq!(language_name("pt-BR"), "pt-BR");
        assert_eq!(language_name("zh"), "Chinese");
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "# Title\n" }, { "text": "Body" }] }
            }]
        }))
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "# Title\nBody");
    }

    #[test]
    fn test_extract_text_rejects_empty() {
        let response: GenerateResponse =
            serde_json::from_value(serde_json::json!({ "candidates": [] })).unwrap();
        assert!(matches!(
            extract_text(response),
            Err(AppError::Upstream { retryable: false, .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_summarizer() {
        let article = MockSummarizer::new()
            .generate_article(&[video("Rust", "")], "en")
            .await
            .unwrap();
        assert_eq!(article, "[en] Article about: Rust");
        assert!(MockSummarizer::failing()
            .generate_article(&[], "en")
            .await
            .is_err());
    }

    #[test]
    fn test_summarizer_requires_api_key() {
        let err = GeminiSummarizer::new(&GeminiConfig::default()).err().unwrap();
        assert!(matches!(err, AppError::Configuration { .. }));
    }
}
