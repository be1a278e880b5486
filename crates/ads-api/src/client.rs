//! HTTP transport with rate limiting, retries and request-id logging.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, warn};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Method;
use serde_json::Value;
use tokio::time::sleep;

use crate::error::{AdsApiError, Result};
use crate::rate_limit::{AdvertisedLimits, RateLimiter};
use crate::retry::{parse_retry_after, AttemptOutcome, RetryPolicy};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_INTER_REQUEST_DELAY_MS: u64 = 200;
const MAX_LOG_BODY_CHARS: usize = 512;
const REQUEST_ID_HEADERS: [&str; 2] = ["x-amz-request-id", "x-request-id"];

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub timeout: Duration,
    /// Pause after every successful call.
    pub inter_request_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            inter_request_delay: Duration::from_millis(DEFAULT_INTER_REQUEST_DELAY_MS),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Form(Vec<(String, String)>),
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_query(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    fn path(&self) -> &str {
        self.url
            .split_once("://")
            .and_then(|(_, rest)| rest.find('/').map(|idx| &rest[idx..]))
            .unwrap_or("/")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub request_id: Option<String>,
    /// `Value::Null` for an empty body.
    pub body: Value,
    /// Attempts made, including the successful one.
    pub attempts: u32,
}

fn request_id(headers: &HeaderMap) -> Option<String> {
    REQUEST_ID_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    })
}

fn preview(body: &str) -> String {
    let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
    if body.chars().count() > MAX_LOG_BODY_CHARS {
        preview.push_str("...");
    }
    preview
}

fn is_retryable_transport_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() || err.is_decode()
}

/// Single entry point for outbound calls. Shares one [`RateLimiter`] across
/// every request it sends.
#[derive(Debug, Clone)]
pub struct RetryingHttpClient {
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
    config: ClientConfig,
}

impl RetryingHttpClient {
    pub fn new(config: ClientConfig, limiter: Arc<RateLimiter>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            limiter,
            config,
        })
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Backoff before retrying a failed send or body read, if the error is
    /// transient and attempts remain.
    fn transport_delay(&self, attempt: u32, err: &reqwest::Error) -> Option<Duration> {
        if !is_retryable_transport_error(err) {
            return None;
        }
        self.config.retry.delay_for(attempt, &AttemptOutcome::Transport)
    }

    fn build(&self, request: &ApiRequest) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        match &request.body {
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::Form(fields)) => builder.form(fields),
            None => builder,
        }
    }

    /// Sends `request`, retrying transient failures per the configured
    /// [`RetryPolicy`]. Non-success responses that are not retried come back
    /// as [`AdsApiError::Api`].
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let max_attempts = self.config.retry.max_retries + 1;
        let path = request.path().to_string();
        let mut attempt: u32 = 0;

        loop {
            self.limiter.acquire().await?;
            debug!(
                "{} {} (attempt {}/{})",
                request.method,
                path,
                attempt + 1,
                max_attempts
            );

            let response = match self.build(request).send().await {
                Ok(response) => response,
                Err(err) => match self.transport_delay(attempt, &err) {
                    Some(delay) => {
                        warn!(
                            "{} {} failed (attempt {}/{}): {}; retrying in {:?}",
                            request.method,
                            path,
                            attempt + 1,
                            max_attempts,
                            err,
                            delay
                        );
                        sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    None => return Err(AdsApiError::Http(err)),
                },
            };

            let status = response.status();
            let headers = response.headers().clone();
            let request_id = request_id(&headers);
            self.limiter
                .update_from_response(&AdvertisedLimits::from_headers(&headers))?;
            let body = match response.text().await {
                Ok(body) => body,
                Err(err) => match self.transport_delay(attempt, &err) {
                    Some(delay) => {
                        warn!(
                            "{} {} body read failed (attempt {}/{}, request-id {}): {}; retrying in {:?}",
                            request.method,
                            path,
                            attempt + 1,
                            max_attempts,
                            request_id.as_deref().unwrap_or("-"),
                            err,
                            delay
                        );
                        sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    None => return Err(AdsApiError::Http(err)),
                },
            };

            debug!(
                "{} {} -> {} (attempt {}/{}, request-id {})",
                request.method,
                path,
                status.as_u16(),
                attempt + 1,
                max_attempts,
                request_id.as_deref().unwrap_or("-")
            );

            if status.is_success() {
                let parsed = if body.trim().is_empty() {
                    Value::Null
                } else {
                    serde_json::from_str(&body)?
                };
                if !self.config.inter_request_delay.is_zero() {
                    sleep(self.config.inter_request_delay).await;
                }
                return Ok(ApiResponse {
                    status: status.as_u16(),
                    request_id,
                    body: parsed,
                    attempts: attempt + 1,
                });
            }

            let retry_after = headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| parse_retry_after(v, Utc::now()));
            let outcome = AttemptOutcome::Status {
                status: status.as_u16(),
                retry_after,
            };
            match self.config.retry.delay_for(attempt, &outcome) {
                Some(delay) => {
                    warn!(
                        "{} {} returned {} (attempt {}/{}, request-id {}); retrying in {:?}",
                        request.method,
                        path,
                        status.as_u16(),
                        attempt + 1,
                        max_attempts,
                        request_id.as_deref().unwrap_or("-"),
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    debug!("Error body: {}", preview(&body));
                    return Err(AdsApiError::api(
                        status.as_u16(),
                        format!("{} {} failed: {}", request.method, path, preview(&body)),
                        request_id,
                    ));
                }
            }
        }
    }
}
