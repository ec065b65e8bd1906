//! Request logging middleware.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use log::{info, warn};

/// Logs one `event=http_request` line per request with status and latency.
///
/// Only method and path are logged; query strings and bodies may carry
/// credentials.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started_at = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let duration_ms = started_at.elapsed().as_millis();
    if status.is_server_error() {
        warn!(
            "event=http_request module=http status=error method={method} path={path} http_status={} duration_ms={duration_ms}",
            status.as_u16()
        );
    } else {
        info!(
            "event=http_request module=http status=ok method={method} path={path} http_status={} duration_ms={duration_ms}",
            status.as_u16()
        );
    }

    response
}
