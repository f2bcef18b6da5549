//! API Middleware
//!
//! Authentication and per-tenant rate limiting are explicit non-goals: this
//! service trusts its caller and relies on
//! `tower::limit::ConcurrencyLimitLayer` at the router level for backpressure
//! instead of a bespoke rate limiter. What's left here is request logging,
//! kept because ambient observability is not out of scope.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Logs method, path and status for every request, at debug level so it
/// doesn't compete with `tower_http::trace::TraceLayer`'s span-level tracing
/// for attention in production log volume.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    tracing::debug!(
        method = %method,
        path = %uri.path(),
        status = response.status().as_u16(),
        "request handled"
    );

    response
}
