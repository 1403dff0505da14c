//! Middleware for logging requests and responses.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

/// Log the method, URI, response status and latency of each request.
///
/// Requests are logged at the `info` level when they succeed and at the
/// `warn` level when the response is an error.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    tracing::debug!("Received request: {method} {uri}");

    let start = Instant::now();
    let response = next.run(request).await;
    let latency = start.elapsed();
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        tracing::warn!(
            "{method} {uri} -> {status} in {:.1}ms",
            latency.as_secs_f64() * 1000.0
        );
    } else {
        tracing::info!(
            "{method} {uri} -> {status} in {:.1}ms",
            latency.as_secs_f64() * 1000.0
        );
    }

    response
}
