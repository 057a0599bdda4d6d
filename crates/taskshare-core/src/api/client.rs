//! API client for the hosted taskshare backend.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests to fetch and mutate groups and their members.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::{ApiError, GroupAndMembers, GroupSource};
use crate::models::{Group, GroupPatch, GroupRecord, NewGroup};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Header carrying the project's public API key.
const API_KEY_HEADER: &str = "apikey";

/// API client for the taskshare backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client for the given base URL
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            token: None,
        })
    }

    /// Set the public API key sent with every request
    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(ref key) = self.api_key {
            headers.insert(API_KEY_HEADER, header::HeaderValue::from_str(key)?);
        }
        if let Some(ref token) = self.token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        Ok(headers)
    }

    /// Check if response is successful.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Send a request, retrying with exponential backoff while rate limited.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response> {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut request = self
                .client
                .request(method.clone(), url.as_str())
                .headers(self.auth_headers()?);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request
                .send()
                .await
                .map_err(ApiError::NetworkError)
                .with_context(|| format!("Failed to send {} request to {}", method, url))?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    debug!(method = %method, url = %url, "Request succeeded");
                    return Ok(response);
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(url = %url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }

    /// Decode a JSON body, reporting malformed payloads as `InvalidResponse`.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response, path: &str) -> Result<T> {
        let text = response.text().await.map_err(ApiError::NetworkError)?;
        Self::parse_body(&text, path)
    }

    fn parse_body<T: DeserializeOwned>(text: &str, path: &str) -> Result<T> {
        serde_json::from_str(text).map_err(|e| {
            ApiError::InvalidResponse(format!("Unexpected body from {}: {}", path, e)).into()
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send::<()>(Method::GET, path, None).await?;
        Self::decode(response, path).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        let response = self.send(Method::POST, path, Some(body)).await?;
        Self::decode(response, path).await
    }

    /// Send a request whose response body is ignored.
    async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<()> {
        self.send(method, path, body).await?;
        Ok(())
    }
}

#[async_trait]
impl GroupSource for ApiClient {
    async fn fetch_group_and_members(&self, group_id: &str) -> Result<GroupAndMembers> {
        self.get(&format!("groups/{}", group_id)).await
    }

    async fn fetch_my_groups(&self) -> Result<Vec<GroupRecord>> {
        self.get("groups/mine").await
    }

    async fn create_group(&self, group: &NewGroup) -> Result<Group> {
        let record: GroupRecord = self.post("groups", group).await?;
        Ok(record.to_group())
    }

    async fn join_group_by_code(&self, code: &str) -> Result<()> {
        let body = serde_json::json!({ "code": code });
        self.execute(Method::POST, "groups/join", Some(&body)).await
    }

    async fn update_group(&self, group_id: &str, patch: &GroupPatch) -> Result<()> {
        self.execute(Method::PATCH, &format!("groups/{}", group_id), Some(patch))
            .await
    }

    async fn leave_group(&self, group_id: &str) -> Result<()> {
        self.execute::<()>(Method::POST, &format!("groups/{}/leave", group_id), None)
            .await
    }

    async fn delete_group(&self, group_id: &str) -> Result<()> {
        self.execute::<()>(Method::DELETE, &format!("groups/{}", group_id), None)
            .await
    }
}
