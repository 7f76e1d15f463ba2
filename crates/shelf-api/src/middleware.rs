//! Middleware applied to every response.

use axum::{
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};

// ── Security headers ──────────────────────────────────────────────────────────

/// Add `X-Content-Type-Options: nosniff` to every HTTP response, including
/// error responses that never reach the file handler.
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}
