//! Retry decisions, kept free of I/O.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;

use adpulse_core::sync::{classify_http_status, RetryClass};

/// What happened on one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// A non-success HTTP response.
    Status {
        status: u16,
        retry_after: Option<Duration>,
    },
    /// The request never produced a response (timeout, connect failure).
    Transport,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Fraction of the backoff added or removed at random.
    pub jitter_ratio: f64,
    /// Upper bound on a server-requested `Retry-After` wait.
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            jitter_ratio: 0.25,
            max_retry_after: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// `base * 2^attempt`, before jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1_u32 << attempt.min(16))
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter_ratio <= 0.0 {
            return delay;
        }
        let spread = self.jitter_ratio.min(1.0);
        let factor = rand::thread_rng().gen_range((1.0 - spread)..=(1.0 + spread));
        delay.mul_f64(factor)
    }

    /// How long to wait before retrying after `attempt` (zero based) ended
    /// with `outcome`, or `None` when the failure is terminal.
    pub fn delay_for(&self, attempt: u32, outcome: &AttemptOutcome) -> Option<Duration> {
        if attempt >= self.max_retries {
            return None;
        }
        match outcome {
            AttemptOutcome::Transport => Some(self.jittered(self.backoff(attempt))),
            AttemptOutcome::Status {
                status,
                retry_after,
            } => match classify_http_status(*status) {
                RetryClass::Retryable if *status == 429 => {
                    Some(match retry_after {
                        Some(wait) => (*wait).min(self.max_retry_after),
                        None => self.jittered(self.backoff(attempt)),
                    })
                }
                RetryClass::Retryable => Some(self.jittered(self.backoff(attempt))),
                RetryClass::Permanent | RetryClass::ReauthRequired => None,
            },
        }
    }
}

/// Parses a `Retry-After` value given as delta-seconds or an HTTP date.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed() -> RetryPolicy {
        RetryPolicy {
            jitter_ratio: 0.0,
            ..RetryPolicy::default()
        }
    }

    fn status(status: u16) -> AttemptOutcome {
        AttemptOutcome::Status {
            status,
            retry_after: None,
        }
    }

    #[test]
    fn server_errors_back_off_exponentially_until_ceiling() {
        let policy = fixed();
        assert_eq!(policy.delay_for(0, &status(500)), Some(Duration::from_millis(500)));
        assert_eq!(policy.delay_for(1, &status(503)), Some(Duration::from_millis(1000)));
        assert_eq!(policy.delay_for(2, &status(502)), Some(Duration::from_millis(2000)));
        assert_eq!(policy.delay_for(3, &status(500)), None);
    }

    #[test]
    fn client_errors_are_terminal() {
        let policy = fixed();
        for code in [400, 401, 403, 404, 422] {
            assert_eq!(policy.delay_for(0, &status(code)), None, "status {}", code);
        }
    }

    #[test]
    fn too_many_requests_prefers_retry_after() {
        let policy = fixed();
        let outcome = AttemptOutcome::Status {
            status: 429,
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(policy.delay_for(1, &outcome), Some(Duration::from_secs(7)));
        assert_eq!(policy.delay_for(1, &status(429)), Some(Duration::from_millis(1000)));
        assert_eq!(policy.delay_for(0, &AttemptOutcome::Transport), Some(Duration::from_millis(500)));
    }

    #[test]
    fn retry_after_is_capped() {
        let policy = fixed();
        let outcome = AttemptOutcome::Status {
            status: 429,
            retry_after: Some(Duration::from_secs(86_400)),
        };
        assert_eq!(policy.delay_for(0, &outcome), Some(policy.max_retry_after));
        assert_eq!(policy.max_retry_after, Duration::from_secs(60));
    }

    #[test]
    fn jitter_stays_within_a_quarter() {
        let policy = RetryPolicy::default();
        for _ in 0..200 {
            let delay = policy.delay_for(1, &status(500)).unwrap();
            assert!(delay >= Duration::from_millis(750), "{:?}", delay);
            assert!(delay <= Duration::from_millis(1250), "{:?}", delay);
        }
    }

    #[test]
    fn retry_after_accepts_seconds_and_dates() {
        let now = Utc.with_ymd_and_hms(2026, 2, 3, 10, 0, 0).unwrap();
        assert_eq!(parse_retry_after(" 12 ", now), Some(Duration::from_secs(12)));
        assert_eq!(
            parse_retry_after("Tue, 03 Feb 2026 10:00:30 GMT", now),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            parse_retry_after("Tue, 03 Feb 2026 09:00:00 GMT", now),
            Some(Duration::ZERO)
        );
        assert_eq!(parse_retry_after("soon", now), None);
    }
}
