//! Rate Limiting Middleware using GCRA Algorithm
//!
//! Limits wish submissions per peer IP with tower_governor. Requires the
//! service to run with `into_make_service_with_connect_info::<SocketAddr>()`.

use axum::{
    body::Body,
    http::{Response, StatusCode},
    response::IntoResponse,
    Json,
};
use governor::middleware::StateInformationMiddleware;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::GovernorError;
use tracing::{error, warn};

use crate::error::{ErrorBody, INTERNAL_ERROR_MESSAGE};

/// Governor config that also emits X-RateLimit-* headers
pub type WishGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Apply the limiter at all
    pub enabled: bool,
    /// Seconds between replenishing one request slot
    pub per_second: u64,
    /// Burst size (max requests that can be made immediately)
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_second: 2,
            burst_size: 5,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("rate limit needs non-zero per_second and burst_size (got {per_second}, {burst_size})")]
    InvalidConfig { per_second: u64, burst_size: u32 },
}

/// Build the governor config for [`tower_governor::GovernorLayer`]
pub fn create_governor_config(
    config: &RateLimitConfig,
) -> Result<Arc<WishGovernorConfig>, RateLimitError> {
    let mut builder = GovernorConfigBuilder::default()
        .per_second(config.per_second)
        .burst_size(config.burst_size)
        .use_headers();

    builder
        .error_handler(governor_error_response)
        .finish()
        .map(Arc::new)
        .ok_or(RateLimitError::InvalidConfig {
            per_second: config.per_second,
            burst_size: config.burst_size,
        })
}

/// Render limiter rejections in the same `{success, error}` envelope as handlers
fn governor_error_response(err: GovernorError) -> Response<Body> {
    let (status, message, headers) = match err {
        GovernorError::TooManyRequests { wait_time, headers } => {
            warn!("Wish rate limit hit, retry in {}s", wait_time);
            (
                StatusCode::TOO_MANY_REQUESTS,
                format!("Too many requests, retry in {wait_time}s"),
                headers,
            )
        }
        GovernorError::Other { code, msg, headers } => {
            error!("Rate limiter failed: {:?}", msg);
            (code, INTERNAL_ERROR_MESSAGE.to_string(), headers)
        }
        other => {
            error!("Rate limiter failed: {:?}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR_MESSAGE.to_string(),
                None,
            )
        }
    };

    let body = ErrorBody {
        success: false,
        error: message,
    };
    let mut response = (status, Json(body)).into_response();
    if let Some(headers) = headers {
        response.headers_mut().extend(headers);
    }
    response
}
