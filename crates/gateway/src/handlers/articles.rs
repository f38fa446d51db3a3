//! Article generation handler
//!
//! Screens the submitted URLs, fetches video metadata, asks the
//! summarizer for one combined article and optionally records it.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validate_request;
use crate::AppState;
use tubescribe_common::{
    errors::{AppError, FetchFailure, Result},
    youtube::{fetch_videos, filter_youtube_urls},
    NewSummary, SummaryRecord, DEFAULT_LANGUAGE,
};

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_persist() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct ArticleRequest {
    /// Candidate links; anything that is not a YouTube URL is dropped
    #[validate(length(min = 1, max = 20))]
    pub urls: Vec<String>,

    #[serde(default = "default_language")]
    #[validate(length(min = 1, max = 32))]
    pub language: String,

    /// Record the article in the summary store
    #[serde(default = "default_persist")]
    pub persist: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArticleResponse {
    pub article: String,
    pub language: String,
    /// URLs whose metadata made it into the article
    pub sources: Vec<String>,
    pub failures: Vec<FetchFailure>,
    /// Stored record, when persistence was requested
    pub record: Option<SummaryRecord>,
}

fn not_configured(name: &str) -> AppError {
    AppError::Configuration {
        message: format!("{} is not configured", name),
    }
}

/// Generate one article from a batch of YouTube URLs
pub async fn generate_article(
    State(state): State<AppState>,
    Json(request): Json<ArticleRequest>,
) -> Result<Json<ArticleResponse>> {
    validate_request(&request)?;

    // Checked before any upstream call so a generated article is never
    // thrown away by the store rejecting it
    if request.language.trim().is_empty() {
        return Err(AppError::Validation {
            message: "language must not be blank".to_string(),
            field: Some("language".to_string()),
        });
    }

    let videos_source = state
        .videos
        .as_ref()
        .ok_or_else(|| not_configured("YouTube API"))?;
    let summarizer = state
        .summarizer
        .as_ref()
        .ok_or_else(|| not_configured("Gemini API"))?;

    let urls = filter_youtube_urls(&request.urls);
    if urls.is_empty() {
        return Err(AppError::InvalidUrls);
    }

    let (videos, failures) = fetch_videos(videos_source.as_ref(), &urls).await;
    let Some(lead) = videos.first() else {
        return Err(AppError::AllVideosFailed { failures });
    };

    let article = summarizer
        .generate_article(&videos, &request.language)
        .await?;

    let sources: Vec<String> = videos.iter().map(|v| v.url.clone()).collect();

    let record = if request.persist {
        let summary = NewSummary::from_sources(
            lead.video_id.clone(),
            lead.title.clone(),
            article.clone(),
            request.language.clone(),
            &sources,
        );
        Some(state.store.save_summary(summary).await?)
    } else {
        None
    };

    tracing::info!(
        videos = videos.len(),
        failed = failures.len(),
        language = %request.language,
        model = summarizer.model_name(),
        persisted = record.is_some(),
        "Article generated"
    );

    Ok(Json(ArticleResponse {
        article,
        language: request.language,
        sources,
        failures,
        record,
    }))
}
