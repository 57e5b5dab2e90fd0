//! Core HTTP operations with client-side rate limiting
//!
//! Every request waits on a `governor` quota before it is sent. Failures are
//! returned to the caller unchanged: a failed call is never retried here.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use url::Url;

use crate::errors::{ApiError, ApiResult};

/// Raw response of a form POST
#[derive(Debug)]
pub struct FormResponse {
    pub status: StatusCode,
    pub body: String,
}

/// HTTP operations handler
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    request_timeout: Duration,
}

impl HttpHandler {
    /// Creates a new HttpHandler with the given client and rate limiting
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidRateLimit` if `rate_limit_rps` is zero
    pub fn new(client: Client, rate_limit_rps: u32, request_timeout: Duration) -> ApiResult<Self> {
        let rate_limiter = Self::build_rate_limiter(rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
            request_timeout,
        })
    }

    fn build_rate_limiter(
        rate_limit_rps: u32,
    ) -> ApiResult<RateLimiter<NotKeyed, InMemoryState, DefaultClock>> {
        let rps = NonZeroU32::new(rate_limit_rps).ok_or_else(|| ApiError::InvalidRateLimit {
            reason: "Rate limit must be non-zero".to_string(),
        })?;
        Ok(RateLimiter::direct(Quota::per_second(rps)))
    }

    /// POSTs a form, optionally with a bearer token, and returns the status
    /// and body text whatever the status is
    ///
    /// # Arguments
    ///
    /// * `operation` - Name used in errors and logs
    /// * `url` - Endpoint
    /// * `bearer` - Access token for the `Authorization` header
    /// * `params` - Form fields
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Timeout` when the request exceeds the configured
    /// timeout and `ApiError::Http` for other transport failures
    pub async fn post_form(
        &self,
        operation: &str,
        url: &Url,
        bearer: Option<&str>,
        params: &[(&str, String)],
    ) -> ApiResult<FormResponse> {
        self.rate_limiter.until_ready().await;

        let mut request = self.client.post(url.clone()).form(params);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        tracing::debug!("POST {} ({})", url, operation);
        let response = request.send().await.map_err(|e| self.map_error(operation, e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_error(operation, e))?;

        tracing::debug!("{} answered HTTP {} ({} bytes)", operation, status, body.len());
        Ok(FormResponse { status, body })
    }

    fn map_error(&self, operation: &str, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            tracing::warn!("{} timed out after {:?}", operation, self.request_timeout);
            ApiError::Timeout {
                method: operation.to_string(),
                seconds: self.request_timeout.as_secs(),
            }
        } else {
            tracing::error!("{} failed: {}", operation, error);
            ApiError::Http(error)
        }
    }

    /// Get a reference to the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }
}
