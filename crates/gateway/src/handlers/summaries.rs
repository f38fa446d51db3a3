//! Summary history handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validate_request;
use crate::AppState;
use tubescribe_common::{errors::Result, NewSummary, SummaryRecord, DEFAULT_LIMIT};

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

/// Query parameters for listing summaries
#[derive(Debug, Deserialize, Validate)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u64,

    /// Exact language tag to filter on
    pub language: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummariesResponse {
    pub summaries: Vec<SummaryRecord>,
}

/// Request to store a summary produced elsewhere
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSummaryRequest {
    #[validate(length(min = 1, max = 32))]
    pub video_id: String,

    #[validate(length(min = 1))]
    pub title: String,

    #[validate(length(min = 1))]
    pub summary: String,

    #[validate(length(min = 1, max = 32))]
    pub language: String,

    /// Comma-joined source URLs
    #[validate(length(min = 1))]
    pub source_urls: String,
}

/// List recent summaries, newest first.
///
/// An unreachable store yields an empty list rather than an error.
pub async fn list_summaries(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<SummariesResponse>> {
    validate_request(&query)?;

    // Language matching is exact; `?language=` asks for the empty tag
    let summaries = match query.language.as_deref() {
        Some(language) => {
            state
                .store
                .get_summaries_by_language(language, query.limit)
                .await
        }
        None => state.store.get_recent_summaries(query.limit).await,
    };

    Ok(Json(SummariesResponse { summaries }))
}

/// Persist a summary and return the stored record
pub async fn create_summary(
    State(state): State<AppState>,
    Json(request): Json<CreateSummaryRequest>,
) -> Result<(StatusCode, Json<SummaryRecord>)> {
    validate_request(&request)?;

    let summary = NewSummary {
        video_id: request.video_id,
        title: request.title,
        summary: request.summary,
        language: request.language,
        source_urls: request.source_urls,
    };

    let record = state.store.save_summary(summary).await?;

    tracing::info!(
        id = record.id,
        video_id = %record.video_id,
        language = %record.language,
        "Summary saved"
    );

    Ok((StatusCode::CREATED, Json(record)))
}
