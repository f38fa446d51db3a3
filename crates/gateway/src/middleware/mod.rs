//! Request middleware

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use tubescribe_common::metrics::RequestMetrics;

/// Record request count and latency per matched route
pub async fn track_metrics(request: Request, next: Next) -> Response {
    // Label by route template so unmatched paths don't explode cardinality
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let metrics = RequestMetrics::start(request.method().as_str(), &endpoint);
    let response = next.run(request).await;
    metrics.finish(response.status().as_u16());

    response
}
