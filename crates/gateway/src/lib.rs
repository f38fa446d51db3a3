//! TubeScribe HTTP gateway
//!
//! Exposes the summary store and the article pipeline over HTTP:
//! - Health and readiness probes
//! - Summary history (list / save)
//! - Article generation from YouTube URLs

pub mod handlers;
pub mod middleware;

use axum::{
    http::StatusCode,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tubescribe_common::{AppConfig, Summarizer, SummaryStore, VideoSource};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn SummaryStore>,
    /// Absent when no YouTube API key is configured
    pub videos: Option<Arc<dyn VideoSource>>,
    /// Absent when no Gemini API key is configured
    pub summarizer: Option<Arc<dyn Summarizer>>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn SummaryStore>) -> Self {
        Self {
            config,
            store,
            videos: None,
            summarizer: None,
        }
    }

    pub fn with_video_source(mut self, videos: Arc<dyn VideoSource>) -> Self {
        self.videos = Some(videos);
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let api_routes = Router::new()
        .route(
            "/summaries",
            get(handlers::summaries::list_summaries).post(handlers::summaries::create_summary),
        )
        .route("/articles", post(handlers::articles::generate_article));

    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/v1", api_routes)
        .layer(from_fn(middleware::track_metrics))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.request_timeout(),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}
