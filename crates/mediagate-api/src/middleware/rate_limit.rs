use crate::constants::{RATE_LIMIT_LIMIT_HEADER, RATE_LIMIT_REMAINING_HEADER};
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use mediagate_infra::{get_request_id, RateLimiter};
use std::sync::Arc;

/// Rate limiting middleware
///
/// The window key is the raw request path, so the limit is a property of the
/// route's global traffic rather than of any one client.
///
/// Adds the following headers to responses:
/// - `X-RateLimit-Limit`: ceiling of the route's window
/// - `X-RateLimit-Remaining`: admissions left in the current window
/// - `Retry-After`: seconds until the window resets (only on 429 responses)
pub async fn rate_limit_middleware(
    State(rate_limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let route_key = request.uri().path().to_string();

    match rate_limiter.check(&route_key) {
        Ok(decision) => {
            let mut response = next.run(request).await;
            insert_limit_headers(response.headers_mut(), decision.limit, decision.remaining);
            response
        }
        Err(err) => {
            tracing::warn!(
                route_key = %route_key,
                method = %request.method(),
                request_id = ?get_request_id(&request),
                "Request rejected by rate limiter"
            );
            let limit = rate_limiter.limit_for(&route_key);
            let mut response = HttpAppError(err).into_response();
            insert_limit_headers(response.headers_mut(), limit, 0);
            response
        }
    }
}

fn insert_limit_headers(headers: &mut HeaderMap, limit: u32, remaining: u32) {
    if let Ok(header_value) = HeaderValue::from_str(&limit.to_string()) {
        headers.insert(RATE_LIMIT_LIMIT_HEADER, header_value);
    }
    if let Ok(header_value) = HeaderValue::from_str(&remaining.to_string()) {
        headers.insert(RATE_LIMIT_REMAINING_HEADER, header_value);
    }
}
