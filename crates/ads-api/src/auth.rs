//! Access-token refresh ahead of upstream calls.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use reqwest::Method;
use serde::Deserialize;
use tokio::sync::Mutex;

use adpulse_core::errors::Error;
use adpulse_core::profiles::{AccessTokenProvider, CredentialRepositoryTrait, Profile, StoredToken};

use crate::client::{ApiRequest, RequestBody, RetryingHttpClient};
use crate::error::AdsApiError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenManagerConfig {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Refresh when the stored token expires within this margin.
    pub refresh_margin: Duration,
}

impl TokenManagerConfig {
    pub fn new(token_url: &str, client_id: &str, client_secret: &str) -> Self {
        Self {
            token_url: token_url.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            refresh_margin: Duration::minutes(5),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
}

pub struct TokenManager {
    http: RetryingHttpClient,
    credentials: Arc<dyn CredentialRepositoryTrait>,
    config: TokenManagerConfig,
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    pub fn new(
        http: RetryingHttpClient,
        credentials: Arc<dyn CredentialRepositoryTrait>,
        config: TokenManagerConfig,
    ) -> Self {
        Self {
            http,
            credentials,
            config,
            refresh_lock: Mutex::new(()),
        }
    }

    fn stored_token(&self, profile_id: &str) -> adpulse_core::Result<StoredToken> {
        self.credentials.get_token(profile_id)?.ok_or_else(|| {
            Error::config(format!("No stored credentials for profile {}", profile_id))
        })
    }

    async fn refresh(&self, token: StoredToken, now: DateTime<Utc>) -> adpulse_core::Result<StoredToken> {
        let request = ApiRequest::new(Method::POST, self.config.token_url.clone()).with_body(
            RequestBody::Form(vec![
                ("grant_type".to_string(), "refresh_token".to_string()),
                ("refresh_token".to_string(), token.refresh_token.clone()),
                ("client_id".to_string(), self.config.client_id.clone()),
                ("client_secret".to_string(), self.config.client_secret.clone()),
            ]),
        );
        let response = self.http.send(&request).await?;
        let parsed: TokenResponse =
            serde_json::from_value(response.body).map_err(AdsApiError::from)?;
        if parsed.access_token.trim().is_empty() {
            return Err(AdsApiError::auth("Token endpoint returned an empty access token").into());
        }

        let refreshed = StoredToken {
            profile_id: token.profile_id,
            access_token: parsed.access_token,
            refresh_token: parsed.refresh_token.unwrap_or(token.refresh_token),
            expires_at: now + Duration::seconds(parsed.expires_in.max(0)),
        };
        self.credentials.save_token(refreshed.clone()).await?;
        info!(
            "Refreshed access token for profile {} (expires {})",
            refreshed.profile_id, refreshed.expires_at
        );
        Ok(refreshed)
    }
}

#[async_trait]
impl AccessTokenProvider for TokenManager {
    async fn ensure_access_token(&self, profile: &Profile) -> adpulse_core::Result<String> {
        let token = self.stored_token(&profile.profile_id)?;
        if !token.expires_within(Utc::now(), self.config.refresh_margin) {
            return Ok(token.access_token);
        }

        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited.
        let token = self.stored_token(&profile.profile_id)?;
        let now = Utc::now();
        if !token.expires_within(now, self.config.refresh_margin) {
            debug!("Token for profile {} already refreshed", profile.profile_id);
            return Ok(token.access_token);
        }
        Ok(self.refresh(token, now).await?.access_token)
    }
}
