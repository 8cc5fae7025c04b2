use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Logs the start and end of every request.
///
/// Emits `Request start: METHOD PATH` before the request is dispatched and
/// `Request end: METHOD PATH STATUS D.DDms` once the response is built,
/// including responses produced from faults.
///
/// # Arguments
/// - `request` - Incoming request
/// - `next` - Rest of the middleware stack and the handler
///
/// # Returns
/// - The response produced by `next`, unchanged
pub async fn request_log(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    tracing::info!("Request start: {} {}", method, path);

    let response = next.run(request).await;

    let duration = started.elapsed().as_secs_f64() * 1000.0;
    tracing::info!(
        "Request end: {} {} {} {:.2}ms",
        method,
        path,
        response.status(),
        duration
    );
    response
}
