//! Client for the regional advertising API.
//!
//! Every outbound call goes through [`RetryingHttpClient`], which owns the
//! process-local [`RateLimiter`] and applies [`RetryPolicy`].

pub mod ads_client;
pub mod auth;
pub mod client;
pub mod error;
pub mod rate_limit;
pub mod retry;

#[cfg(test)]
mod test_support;

pub use ads_client::{AdsApiClient, RegionEndpoints};
pub use auth::{TokenManager, TokenManagerConfig};
pub use client::{ApiRequest, ApiResponse, ClientConfig, RequestBody, RetryingHttpClient};
pub use error::{AdsApiError, Result};
pub use rate_limit::{AdvertisedLimits, RateLimitConfig, RateLimiter};
pub use retry::{AttemptOutcome, RetryPolicy};
