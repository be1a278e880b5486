//! Process-local throttle for outbound API calls.
//!
//! Counters are not shared between processes; two processes driving the same
//! account each get the full ceiling.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use log::{debug, info};
use reqwest::header::HeaderMap;
use tokio::time::{sleep, Instant};

use crate::error::{AdsApiError, Result};

const WINDOW: Duration = Duration::from_secs(1);
const QUOTA_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

pub const RATE_LIMIT_HEADER: &str = "x-amzn-ratelimit-limit";
pub const DAILY_QUOTA_HEADER: &str = "x-amzn-ratelimit-daily-quota";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub daily_quota: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 5,
            daily_quota: 50_000,
        }
    }
}

/// Limits the remote API advertised on a response.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AdvertisedLimits {
    pub requests_per_second: Option<f64>,
    pub daily_quota: Option<u32>,
}

impl AdvertisedLimits {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .map(str::to_string)
        };
        Self {
            requests_per_second: read(RATE_LIMIT_HEADER)
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v > 0.0),
            daily_quota: read(DAILY_QUOTA_HEADER).and_then(|v| v.parse::<u32>().ok()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.requests_per_second.is_none() && self.daily_quota.is_none()
    }
}

#[derive(Debug)]
struct LimiterState {
    requests_per_second: u32,
    daily_quota: u32,
    recent: VecDeque<Instant>,
    period_start: Instant,
    used_in_period: u32,
}

impl LimiterState {
    fn prune(&mut self, now: Instant) {
        while let Some(oldest) = self.recent.front() {
            if now.duration_since(*oldest) >= WINDOW {
                self.recent.pop_front();
            } else {
                break;
            }
        }
        if now.duration_since(self.period_start) >= QUOTA_PERIOD {
            self.period_start = now;
            self.used_in_period = 0;
        }
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    configured: RateLimitConfig,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            configured: config,
            state: Mutex::new(LimiterState {
                requests_per_second: config.requests_per_second.max(1),
                daily_quota: config.daily_quota,
                recent: VecDeque::new(),
                period_start: Instant::now(),
                used_in_period: 0,
            }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LimiterState>> {
        self.state
            .lock()
            .map_err(|_| AdsApiError::invalid_request("Rate limiter state is poisoned"))
    }

    /// Waits until one more request fits under the per-second ceiling, then
    /// reserves it. Fails once the daily quota is spent.
    pub async fn acquire(&self) -> Result<()> {
        loop {
            let wait = {
                let mut state = self.lock()?;
                let now = Instant::now();
                state.prune(now);

                if state.used_in_period >= state.daily_quota {
                    return Err(AdsApiError::QuotaExhausted(format!(
                        "{} requests used in the current period",
                        state.used_in_period
                    )));
                }

                if (state.recent.len() as u32) < state.requests_per_second {
                    state.recent.push_back(now);
                    state.used_in_period += 1;
                    return Ok(());
                }

                match state.recent.front() {
                    Some(oldest) => (*oldest + WINDOW).saturating_duration_since(now),
                    None => Duration::ZERO,
                }
            };
            debug!("Rate limit reached, waiting {:?}", wait);
            sleep(wait).await;
        }
    }

    /// Applies limits advertised by the remote API. Advertised values only
    /// ever narrow the configured ones.
    pub fn update_from_response(&self, limits: &AdvertisedLimits) -> Result<()> {
        if limits.is_empty() {
            return Ok(());
        }
        let mut state = self.lock()?;
        if let Some(rps) = limits.requests_per_second {
            let ceiling = (rps.floor() as u32)
                .max(1)
                .min(self.configured.requests_per_second.max(1));
            if ceiling != state.requests_per_second {
                info!(
                    "Adjusting request ceiling from {} to {} per second",
                    state.requests_per_second, ceiling
                );
                state.requests_per_second = ceiling;
            }
        }
        if let Some(quota) = limits.daily_quota {
            state.daily_quota = quota.min(self.configured.daily_quota);
        }
        Ok(())
    }

    pub fn requests_per_second(&self) -> Result<u32> {
        Ok(self.lock()?.requests_per_second)
    }

    /// Requests still available in the current quota period.
    pub fn remaining_quota(&self) -> Result<u32> {
        let state = self.lock()?;
        Ok(state.daily_quota.saturating_sub(state.used_in_period))
    }
}
