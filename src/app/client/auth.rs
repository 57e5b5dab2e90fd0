//! Netatmo OAuth2 token handling
//!
//! Access tokens are obtained with the refresh-token grant. The token
//! endpoint may rotate the refresh token; the newest one is always kept in
//! the returned [`Authorization`].

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::auth::Credentials;
use crate::constants::auth;
use crate::errors::{AuthError, AuthResult};

/// Bearer credential for API calls
#[derive(Clone)]
pub struct Authorization {
    access_token: String,
    refresh_token: String,
    expires_at: Instant,
}

impl Authorization {
    /// # Errors
    ///
    /// Returns `AuthError::MalformedToken` if the lifetime does not fit in an `Instant`
    pub fn new(
        access_token: String,
        refresh_token: String,
        expires_in: Duration,
    ) -> AuthResult<Self> {
        let expires_at =
            Instant::now()
                .checked_add(expires_in)
                .ok_or_else(|| AuthError::MalformedToken {
                    reason: format!("expires_in of {}s is out of range", expires_in.as_secs()),
                })?;
        Ok(Self {
            access_token,
            refresh_token,
            expires_at,
        })
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// True once the token is within the renewal margin of its expiry
    pub fn is_expired(&self) -> bool {
        Instant::now() + auth::EXPIRY_MARGIN >= self.expires_at
    }
}

impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorization")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct TokenError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Handles token endpoint requests
pub struct AuthHandler;

impl AuthHandler {
    /// Exchanges a refresh token for a fresh access token
    ///
    /// # Arguments
    ///
    /// * `client` - The HTTP client to use
    /// * `base_url` - API root the token path is resolved against
    /// * `credentials` - Application id and secret
    /// * `refresh_token` - Refresh token to spend
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if:
    /// - The request cannot be sent
    /// - The token endpoint rejects the grant
    /// - The response is not a token
    pub async fn request_token(
        client: &Client,
        base_url: &Url,
        credentials: &Credentials,
        refresh_token: &str,
    ) -> AuthResult<Authorization> {
        let token_url = base_url
            .join(auth::TOKEN_PATH)
            .map_err(|_| AuthError::InvalidUrl {
                url: base_url.to_string(),
            })?;

        tracing::info!("Requesting Netatmo access token");
        let response = client
            .post(token_url)
            .form(&[
                ("grant_type", auth::GRANT_TYPE_REFRESH),
                ("refresh_token", refresh_token),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(AuthError::Http)?;

        let status = response.status();
        let body = response.text().await.map_err(AuthError::Http)?;

        if !status.is_success() {
            let reason = serde_json::from_str::<TokenError>(&body)
                .map(|e| match e.error_description {
                    Some(description) => format!("{} ({})", e.error, description),
                    None => e.error,
                })
                .unwrap_or_else(|_| body.chars().take(200).collect());
            tracing::warn!("Token request rejected: HTTP {} {}", status, reason);
            return Err(AuthError::TokenRejected {
                status: status.as_u16(),
                reason,
            });
        }

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::MalformedToken {
                reason: e.to_string(),
            })?;

        if token.refresh_token != refresh_token {
            tracing::info!("Token endpoint rotated the refresh token");
        }
        tracing::info!("Obtained access token valid for {}s", token.expires_in);

        Authorization::new(
            token.access_token,
            token.refresh_token,
            Duration::from_secs(token.expires_in),
        )
    }
}
