/// Rate limiting
use crate::{
    config::RateLimitSettings,
    error::{CmsError, CmsResult},
};
use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc};

/// Rate limiter manager
///
/// Two buckets: general API traffic, and a stricter one for mutating
/// requests since those carry uploads.
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    api: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    uploads: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimiter {
    pub fn new(settings: &RateLimitSettings) -> Self {
        let api_quota = Quota::per_second(
            NonZeroU32::new(settings.requests_per_second).unwrap_or(NonZeroU32::new(50).unwrap()),
        )
        .allow_burst(NonZeroU32::new(settings.burst_size).unwrap_or(NonZeroU32::new(25).unwrap()));

        let upload_quota = Quota::per_second(
            NonZeroU32::new(settings.upload_requests_per_second)
                .unwrap_or(NonZeroU32::new(5).unwrap()),
        )
        .allow_burst(
            NonZeroU32::new(settings.burst_size / 5).unwrap_or(NonZeroU32::new(5).unwrap()),
        );

        Self {
            enabled: settings.enabled,
            api: Arc::new(GovernorLimiter::direct(api_quota)),
            uploads: Arc::new(GovernorLimiter::direct(upload_quota)),
        }
    }

    /// Check rate limit for general API requests
    pub fn check_api(&self) -> CmsResult<()> {
        if !self.enabled {
            return Ok(());
        }
        self.api.check().map_err(|_| CmsError::RateLimitExceeded)
    }

    /// Check rate limit for mutating (upload-bearing) requests
    pub fn check_upload(&self) -> CmsResult<()> {
        if !self.enabled {
            return Ok(());
        }
        self.uploads
            .check()
            .map_err(|_| CmsError::RateLimitExceeded)
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<crate::context::AppContext>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method();
    let mutating = method == Method::POST || method == Method::PUT || method == Method::DELETE;

    let check = if mutating {
        ctx.rate_limiter.check_upload()
    } else {
        ctx.rate_limiter.check_api()
    };

    match check {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(enabled: bool) -> RateLimitSettings {
        RateLimitSettings {
            enabled,
            requests_per_second: 10,
            upload_requests_per_second: 2,
            burst_size: 5,
        }
    }

    #[test]
    fn test_burst_limit_on_uploads() {
        let limiter = RateLimiter::new(&settings(true));

        // burst_size / 5 = 1 upload before the quota bites
        assert!(limiter.check_upload().is_ok());
        assert!(limiter.check_upload().is_err());
    }

    #[test]
    fn test_disabled_limiter_always_passes() {
        let limiter = RateLimiter::new(&settings(false));

        for _ in 0..100 {
            assert!(limiter.check_api().is_ok());
            assert!(limiter.check_upload().is_ok());
        }
    }
}
