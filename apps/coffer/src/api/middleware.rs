//! # Middleware Module
//!
//! Global rate limiting for the endpoint server.
//!
//! The limit comes from `server.rate_limit` (or `COFFER_RATE_LIMIT`);
//! 0 disables the layer entirely.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::sync::Arc;

// =============================================================================
// RATE LIMITER
// =============================================================================

/// Global rate limiter type alias.
pub type GlobalRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Create a global rate limiter, or `None` when `requests_per_second` is 0.
pub fn create_rate_limiter(requests_per_second: u32) -> Option<GlobalRateLimiter> {
    let rps = NonZeroU32::new(requests_per_second)?;
    Some(Arc::new(RateLimiter::direct(Quota::per_second(rps))))
}

/// Rate limiting middleware.
///
/// Returns 429 Too Many Requests once the global budget is spent.
pub async fn rate_limit_middleware(
    State(limiter): State<GlobalRateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    match limiter.check() {
        Ok(()) => Ok(next.run(request).await),
        Err(_) => {
            tracing::warn!("Rate limit exceeded");
            Err((StatusCode::TOO_MANY_REQUESTS, "Too Many Requests"))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_allows_first_request() {
        let limiter = create_rate_limiter(50).expect("enabled");
        assert!(limiter.check().is_ok());
    }

    #[test]
    fn zero_disables_limiting() {
        assert!(create_rate_limiter(0).is_none());
    }

    #[test]
    fn budget_of_one_rejects_burst() {
        let limiter = create_rate_limiter(1).expect("enabled");
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }
}
