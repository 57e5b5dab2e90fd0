//! HTTP client configuration and building logic
//!
//! This module handles the configuration and construction of HTTP clients
//! for the Netatmo API. Every request carries an explicit timeout so a
//! stalled call cannot hang a long bulk run.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{api, http, limits};
use crate::errors::{ApiError, ApiResult};

/// Configuration for the Netatmo HTTP client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API root; token and data endpoints are resolved against it
    pub base_url: String,
    /// Request timeout
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Client-side request ceiling (requests per second)
    pub rate_limit_rps: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: api::BASE_URL.to_string(),
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
        }
    }
}

impl ClientConfig {
    /// Configuration pointing at a different API root (mock servers, proxies)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Builds the HTTP client with the specified configuration
    pub fn build_http_client(&self) -> ApiResult<Client> {
        Client::builder()
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(http::USER_AGENT)
            .build()
            .map_err(ApiError::Http)
    }

    /// Parses the base URL, making sure relative endpoints join below it
    pub fn parse_base_url(&self) -> ApiResult<Url> {
        let mut base = self.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        Url::parse(&base).map_err(|e| ApiError::InvalidUrl {
            url: self.base_url.clone(),
            error: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, api::BASE_URL);
        assert_eq!(config.rate_limit_rps, limits::DEFAULT_RATE_LIMIT_RPS);
        assert_eq!(config.request_timeout, http::DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = ClientConfig::with_base_url("http://127.0.0.1:8080");
        let url = config.parse_base_url().unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/");
        assert_eq!(
            url.join("oauth2/token").unwrap().as_str(),
            "http://127.0.0.1:8080/oauth2/token"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = ClientConfig::with_base_url("not a url");
        assert!(matches!(
            config.parse_base_url(),
            Err(ApiError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_http_client_with_custom_config() {
        let config = ClientConfig {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            ..Default::default()
        };

        assert!(config.build_http_client().is_ok());
    }
}
