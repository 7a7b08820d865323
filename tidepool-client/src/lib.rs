//! Tidepool API client
//!
//! An authenticated HTTP client for the job-dispatch API. It owns the
//! bearer token for `(username, password, api_endpoint)`: the token is
//! acquired on first use, re-acquired when it expires, and refreshed once
//! on a `401` before the request is retried. A second `401` after refresh
//! is a credential rejection.
//!
//! The worker runtime drives this client from a single task; the token
//! slot is a mutex only so refresh stays non-reentrant.

pub mod error;
mod admin;
mod jobs;

pub use error::{ClientError, Result};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use tidepool_core::dto::auth::{LoginRequest, LoginResponse};

/// Default timeout for poll requests.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(30);
/// Default timeout for result and admin POSTs.
pub const DEFAULT_POST_TIMEOUT: Duration = Duration::from_secs(60);

/// Tokens this close to expiry are refreshed proactively.
const TOKEN_EXPIRY_LEEWAY_SECS: i64 = 30;

#[derive(Debug, Clone)]
struct BearerToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl BearerToken {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + ChronoDuration::seconds(TOKEN_EXPIRY_LEEWAY_SECS) >= self.expires_at
    }
}

/// HTTP client for the job-dispatch API
#[derive(Debug)]
pub struct ApiClient {
    /// Base URL of the API (e.g., "https://jobs.example.com/api")
    base_url: String,
    http: Client,
    username: String,
    password: String,
    token: Mutex<Option<BearerToken>>,
    poll_timeout: Duration,
    post_timeout: Duration,
}

impl ApiClient {
    /// Create a new client for the given endpoint and worker credentials
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
            username: username.into(),
            password: password.into(),
            token: Mutex::new(None),
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            post_timeout: DEFAULT_POST_TIMEOUT,
        }
    }

    /// Override the per-request timeouts
    pub fn with_timeouts(mut self, poll_timeout: Duration, post_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self.post_timeout = post_timeout;
        self
    }

    /// Get the base URL of the API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    pub(crate) fn post_timeout(&self) -> Duration {
        self.post_timeout
    }

    // =============================================================================
    // Authentication
    // =============================================================================

    /// Authenticates with the API and returns a fresh bearer token.
    async fn login(&self) -> Result<BearerToken> {
        debug!("logging in to {}", self.base_url);

        let url = format!("{}/auth/login", self.base_url);
        let body = LoginRequest {
            username: self.username.clone(),
            password: self.password.clone(),
        };

        let response = self
            .http
            .post(&url)
            .timeout(self.post_timeout)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ClientError::AuthFailure);
        }
        let response = check_status(response).await?;

        let login: LoginResponse = decode(response).await?;
        Ok(BearerToken {
            value: login.token,
            expires_at: login.expires_at,
        })
    }

    /// Returns a usable token, logging in when the slot is empty or stale.
    async fn ensure_token(&self) -> Result<String> {
        let mut slot = self.token.lock().await;
        if let Some(token) = slot.as_ref() {
            if !token.is_expired(Utc::now()) {
                return Ok(token.value.clone());
            }
            debug!("bearer token expired; re-authenticating");
        }

        let token = self.login().await?;
        let value = token.value.clone();
        *slot = Some(token);
        Ok(value)
    }

    /// Discards the current token and logs in again.
    async fn refresh_token(&self) -> Result<String> {
        let mut slot = self.token.lock().await;
        let token = self.login().await?;
        let value = token.value.clone();
        *slot = Some(token);
        Ok(value)
    }

    // =============================================================================
    // Authenticated requests
    // =============================================================================

    /// Sends a bearer-authenticated request, refreshing the token and
    /// retrying exactly once on `401`.
    pub(crate) async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        timeout: Duration,
    ) -> Result<Response> {
        let token = self.ensure_token().await?;
        let response = self
            .dispatch(method.clone(), path, body, timeout, &token)
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!("request to {path} returned 401; refreshing token and retrying once");
        let token = self.refresh_token().await?;
        let response = self.dispatch(method, path, body, timeout, &token).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ClientError::AuthFailure);
        }
        Ok(response)
    }

    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        timeout: Duration,
        token: &str,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .http
            .request(method, &url)
            .timeout(timeout)
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        request.send().await.map_err(transport_error)
    }

    pub(crate) fn encode<B: Serialize>(body: &B) -> Result<serde_json::Value> {
        serde_json::to_value(body)
            .map_err(|e| ClientError::Protocol(format!("failed to encode request body: {e}")))
    }
}

/// Maps transport-level failures (DNS, connect, timeout) to `Transient`.
fn transport_error(err: reqwest::Error) -> ClientError {
    ClientError::Transient(format!("transport error: {err}"))
}

/// Checks the status code, classifying failures per the §4.B contract.
pub(crate) async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());

    if status == StatusCode::UNAUTHORIZED {
        Err(ClientError::AuthFailure)
    } else if status.is_server_error() {
        Err(ClientError::Transient(format!(
            "API returned {status}: {message}"
        )))
    } else if status.is_client_error() {
        Err(ClientError::BadRequest {
            status: status.as_u16(),
            message,
        })
    } else {
        Err(ClientError::Protocol(format!(
            "unexpected status {status}: {message}"
        )))
    }
}

/// Deserializes a JSON response body.
pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| ClientError::Protocol(format!("failed to parse JSON response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = ApiClient::new("https://jobs.example.com/api/", "worker", "secret");
        assert_eq!(client.base_url(), "https://jobs.example.com/api");
    }

    #[test]
    fn test_default_timeouts() {
        let client = ApiClient::new("https://jobs.example.com", "worker", "secret");
        assert_eq!(client.poll_timeout(), DEFAULT_POLL_TIMEOUT);
        assert_eq!(client.post_timeout(), DEFAULT_POST_TIMEOUT);

        let client = client.with_timeouts(Duration::from_millis(100), Duration::from_millis(200));
        assert_eq!(client.poll_timeout(), Duration::from_millis(100));
    }

    #[test]
    fn test_token_expiry_includes_leeway() {
        let now = Utc::now();
        let fresh = BearerToken {
            value: "t".into(),
            expires_at: now + ChronoDuration::hours(1),
        };
        assert!(!fresh.is_expired(now));

        let nearly = BearerToken {
            value: "t".into(),
            expires_at: now + ChronoDuration::seconds(TOKEN_EXPIRY_LEEWAY_SECS - 5),
        };
        assert!(nearly.is_expired(now));
    }
}
