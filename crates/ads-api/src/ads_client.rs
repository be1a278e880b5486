//! Campaign-hierarchy endpoints of the regional advertising API.

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;

use adpulse_core::catalog::EntityType;
use adpulse_core::profiles::Region;
use adpulse_core::sync::{EntityPageSource, PageRequest, RequestContext};

use crate::client::{ApiRequest, RetryingHttpClient};
use crate::error::{AdsApiError, Result};

const CLIENT_ID_HEADER: &str = "amazon-advertising-api-clientid";
const SCOPE_HEADER: &str = "amazon-advertising-api-scope";

/// Base URL per region shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionEndpoints {
    pub na: String,
    pub eu: String,
    pub fe: String,
}

impl Default for RegionEndpoints {
    fn default() -> Self {
        Self {
            na: "https://advertising-api.amazon.com".to_string(),
            eu: "https://advertising-api-eu.amazon.com".to_string(),
            fe: "https://advertising-api-fe.amazon.com".to_string(),
        }
    }
}

impl RegionEndpoints {
    pub fn base_url(&self, region: Region) -> &str {
        let url = match region {
            Region::Na => &self.na,
            Region::Eu => &self.eu,
            Region::Fe => &self.fe,
        };
        url.trim_end_matches('/')
    }
}

fn collection_path(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Campaigns => "/v2/sp/campaigns/extended",
        EntityType::AdGroups => "/v2/sp/adGroups/extended",
        EntityType::Ads => "/v2/sp/productAds/extended",
        EntityType::Targets => "/v2/sp/targets/extended",
    }
}

/// Accepts a bare array or an object wrapping the items.
fn extract_items(body: Value) -> Result<Vec<Value>> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        Value::Object(mut map) => {
            for key in ["items", "results", "data"] {
                if let Some(Value::Array(items)) = map.remove(key) {
                    return Ok(items);
                }
            }
            Err(AdsApiError::invalid_request(
                "Page response has no item array",
            ))
        }
        other => Err(AdsApiError::invalid_request(format!(
            "Unexpected page response: {}",
            other
        ))),
    }
}

#[derive(Debug, Clone)]
pub struct AdsApiClient {
    http: RetryingHttpClient,
    client_id: String,
    endpoints: RegionEndpoints,
}

impl AdsApiClient {
    pub fn new(http: RetryingHttpClient, client_id: &str, endpoints: RegionEndpoints) -> Self {
        Self {
            http,
            client_id: client_id.to_string(),
            endpoints,
        }
    }

    fn headers(&self, ctx: &RequestContext) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let auth_value = HeaderValue::from_str(&format!("Bearer {}", ctx.access_token))
            .map_err(|_| AdsApiError::auth("Invalid access token format"))?;
        headers.insert(AUTHORIZATION, auth_value);
        headers.insert(
            HeaderName::from_static(CLIENT_ID_HEADER),
            HeaderValue::from_str(&self.client_id)
                .map_err(|_| AdsApiError::auth("Invalid client id format"))?,
        );
        headers.insert(
            HeaderName::from_static(SCOPE_HEADER),
            HeaderValue::from_str(&ctx.profile_id)
                .map_err(|_| AdsApiError::invalid_request("Invalid profile id"))?,
        );
        Ok(headers)
    }

    /// GET one page of `request.entity_type`.
    pub async fn list_page(&self, ctx: &RequestContext, request: &PageRequest) -> Result<Vec<Value>> {
        let url = format!(
            "{}{}",
            self.endpoints.base_url(ctx.region),
            collection_path(request.entity_type)
        );
        let mut api_request = ApiRequest::new(Method::GET, url)
            .with_headers(self.headers(ctx)?)
            .with_query("startIndex", request.offset)
            .with_query("count", request.count);
        if let Some(since) = request.since {
            api_request = api_request.with_query("lastUpdatedAfter", since.timestamp_millis());
        }

        let response = self.http.send(&api_request).await?;
        let items = extract_items(response.body)?;
        debug!(
            "Fetched {} {} for profile {} at offset {}",
            items.len(),
            request.entity_type,
            ctx.profile_id,
            request.offset
        );
        Ok(items)
    }
}

#[async_trait]
impl EntityPageSource for AdsApiClient {
    async fn fetch_page(
        &self,
        ctx: &RequestContext,
        request: &PageRequest,
    ) -> adpulse_core::Result<Vec<Value>> {
        Ok(self.list_page(ctx, request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;
    use crate::rate_limit::{RateLimitConfig, RateLimiter};
    use crate::retry::RetryPolicy;
    use crate::test_support::{start_mock_server, MockResponse};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use std::time::Duration;

    fn client_for(base_url: &str) -> AdsApiClient {
        let http = RetryingHttpClient::new(
            ClientConfig {
                timeout: Duration::from_secs(5),
                inter_request_delay: Duration::ZERO,
                retry: RetryPolicy {
                    base_delay: Duration::from_millis(1),
                    jitter_ratio: 0.0,
                    ..RetryPolicy::default()
                },
            },
            Arc::new(RateLimiter::new(RateLimitConfig::default())),
        )
        .unwrap();
        let endpoints = RegionEndpoints {
            na: "http://na.invalid".to_string(),
            eu: format!("{}/", base_url),
            fe: "http://fe.invalid".to_string(),
        };
        AdsApiClient::new(http, "client-abc", endpoints)
    }

    fn ctx() -> RequestContext {
        RequestContext {
            profile_id: "3001".to_string(),
            region: Region::Eu,
            access_token: "tok-1".to_string(),
        }
    }

    #[tokio::test]
    async fn page_request_carries_scope_and_paging() {
        let server = start_mock_server(vec![MockResponse::json(
            200,
            r#"[{"adGroupId":"AG1"},{"adGroupId":"AG2"}]"#,
        )])
        .await;
        let client = client_for(&server.base_url);
        let since = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        let items = client
            .fetch_page(
                &ctx(),
                &PageRequest {
                    entity_type: EntityType::AdGroups,
                    offset: 200,
                    count: 100,
                    since: Some(since),
                },
            )
            .await
            .unwrap();
        assert_eq!(items.len(), 2);

        let requests = server.requests().await;
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(
            request.target,
            format!(
                "/v2/sp/adGroups/extended?startIndex=200&count=100&lastUpdatedAfter={}",
                since.timestamp_millis()
            )
        );
        assert_eq!(request.headers["authorization"], "Bearer tok-1");
        assert_eq!(request.headers[CLIENT_ID_HEADER], "client-abc");
        assert_eq!(request.headers[SCOPE_HEADER], "3001");
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_failure() {
        let server = start_mock_server(vec![MockResponse::json(401, r#"{"code":"UNAUTHORIZED"}"#)]).await;
        let client = client_for(&server.base_url);
        let err = client
            .fetch_page(
                &ctx(),
                &PageRequest {
                    entity_type: EntityType::Campaigns,
                    offset: 0,
                    count: 100,
                    since: None,
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_auth_failure());
    }

    #[test]
    fn wrapped_pages_are_unwrapped() {
        let items = extract_items(serde_json::json!({ "items": [1, 2] })).unwrap();
        assert_eq!(items.len(), 2);
        assert!(extract_items(Value::Null).unwrap().is_empty());
        assert!(extract_items(serde_json::json!({ "total": 3 })).is_err());
        assert!(extract_items(serde_json::json!("oops")).is_err());
    }

    #[test]
    fn region_urls_are_normalized() {
        let endpoints = RegionEndpoints {
            na: "https://na.example.com/".to_string(),
            ..RegionEndpoints::default()
        };
        assert_eq!(endpoints.base_url(Region::Na), "https://na.example.com");
        assert_eq!(
            endpoints.base_url(Region::Fe),
            "https://advertising-api-fe.amazon.com"
        );
    }
}
