//! HTTP client for the Netatmo weather API
//!
//! This module provides the client used for every remote call: token
//! requests and the two data operations (`getpublicdata`, `getmeasure`).
//! Calls are single request/response exchanges with a timeout and a
//! client-side rate ceiling; nothing is retried.
//!
//! When the token endpoint rotates the refresh token, the new one is written
//! back to the env file the credentials are kept in, so the next run can
//! still authorize.
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `auth`: OAuth2 refresh-token grant and the `Authorization` handle
//! - `http`: Core HTTP operations with rate limiting
//! - `api`: Request parameters and response envelopes

use std::env;
use std::path::{Path, PathBuf};

use serde_json::value::RawValue;
use tracing::{info, warn};
use url::Url;

use crate::auth::{save_credentials_to, Credentials};
use crate::constants::{api as api_constants, env as env_constants, files};
use crate::errors::{ApiError, ApiResult, AuthError, AuthResult};

// Module declarations
pub mod api;
pub mod auth;
pub mod config;
pub mod http;

pub use api::{MeasureQuery, PublicDataQuery};
pub use auth::Authorization;
pub use config::ClientConfig;

use auth::AuthHandler;
use http::HttpHandler;

/// Where the client takes its application credentials from
#[derive(Debug, Clone)]
enum CredentialSource {
    /// Read from the environment at authorization time
    Environment,
    Explicit(Credentials),
}

/// HTTP client for the Netatmo API
///
/// Creating a client performs no network traffic and needs no credentials;
/// they are resolved only when [`NetatmoClient::authorize`] is called.
#[derive(Debug)]
pub struct NetatmoClient {
    http_handler: HttpHandler,
    base_url: Url,
    credentials: CredentialSource,
    /// Env file that receives rotated refresh tokens
    token_file: Option<PathBuf>,
}

impl NetatmoClient {
    /// Creates a client with default configuration and environment credentials
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the HTTP client cannot be built
    pub fn new() -> ApiResult<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a client with custom configuration and environment credentials
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the base URL is invalid, the rate limit is zero
    /// or the HTTP client cannot be built
    pub fn with_config(config: ClientConfig) -> ApiResult<Self> {
        let client = config.build_http_client()?;
        let http_handler =
            HttpHandler::new(client, config.rate_limit_rps, config.request_timeout)?;
        let base_url = config.parse_base_url()?;

        tracing::debug!("Created Netatmo client for {}", base_url);

        Ok(Self {
            http_handler,
            base_url,
            credentials: CredentialSource::Environment,
            token_file: Some(PathBuf::from(files::DOTENV_FILE)),
        })
    }

    /// Use fixed credentials instead of reading the environment
    ///
    /// Rotated refresh tokens are then kept in memory only, unless a token
    /// file is set with [`NetatmoClient::with_token_file`].
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = CredentialSource::Explicit(credentials);
        self.token_file = None;
        self
    }

    /// Write rotated refresh tokens to this env file
    pub fn with_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_file = Some(path.into());
        self
    }

    /// Env file rotated refresh tokens are written to, if any
    pub fn token_file(&self) -> Option<&Path> {
        self.token_file.as_deref()
    }

    fn credentials(&self) -> AuthResult<Credentials> {
        match &self.credentials {
            CredentialSource::Environment => Credentials::from_env(),
            CredentialSource::Explicit(credentials) if credentials.is_complete() => {
                Ok(credentials.clone())
            }
            CredentialSource::Explicit(_) => Err(AuthError::MissingCredentials),
        }
    }

    /// Obtains an access token from the configured refresh token
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingCredentials` if credentials are not set,
    /// or any token endpoint failure
    pub async fn authorize(&self) -> AuthResult<Authorization> {
        let credentials = self.credentials()?;
        self.grant(&credentials, &credentials.refresh_token).await
    }

    /// Renews an authorization using its (possibly rotated) refresh token
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if credentials are missing or the grant fails
    pub async fn refresh(&self, current: &Authorization) -> AuthResult<Authorization> {
        let credentials = self.credentials()?;
        self.grant(&credentials, current.refresh_token()).await
    }

    async fn grant(
        &self,
        credentials: &Credentials,
        refresh_token: &str,
    ) -> AuthResult<Authorization> {
        let authorization = AuthHandler::request_token(
            self.http_handler.client(),
            &self.base_url,
            credentials,
            refresh_token,
        )
        .await?;

        if authorization.refresh_token() != refresh_token {
            self.store_rotated_token(credentials, authorization.refresh_token());
        }
        Ok(authorization)
    }

    /// Keeps a rotated refresh token for later authorizations; a failed
    /// write is logged, the in-memory token stays usable
    fn store_rotated_token(&self, credentials: &Credentials, refresh_token: &str) {
        if matches!(self.credentials, CredentialSource::Environment) {
            env::set_var(env_constants::REFRESH_TOKEN, refresh_token);
        }

        let Some(path) = &self.token_file else {
            return;
        };
        let updated = Credentials {
            refresh_token: refresh_token.to_string(),
            ..credentials.clone()
        };
        match save_credentials_to(path, &updated) {
            Ok(()) => info!("Saved rotated refresh token to {}", path.display()),
            Err(e) => warn!(
                "Could not save rotated refresh token to {}: {}",
                path.display(),
                e
            ),
        }
    }

    /// Lists public stations inside an area; returns the raw `body` payload
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure or an error response
    pub async fn get_public_data(
        &self,
        authorization: &Authorization,
        query: &PublicDataQuery,
    ) -> ApiResult<Box<RawValue>> {
        self.raw_api(authorization, api_constants::GET_PUBLIC_DATA, &query.params())
            .await
    }

    /// Fetches measurement history of one module; returns the raw `body`
    /// payload
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure or an error response
    pub async fn get_measure(
        &self,
        authorization: &Authorization,
        query: &MeasureQuery,
    ) -> ApiResult<Box<RawValue>> {
        self.raw_api(authorization, api_constants::GET_MEASURE, &query.params())
            .await
    }

    async fn raw_api(
        &self,
        authorization: &Authorization,
        method: &str,
        params: &[(&str, String)],
    ) -> ApiResult<Box<RawValue>> {
        let url = self.endpoint(method)?;
        let response = self
            .http_handler
            .post_form(method, &url, Some(authorization.access_token()), params)
            .await?;
        api::parse_envelope(method, response.status, &response.body)
    }

    fn endpoint(&self, method: &str) -> ApiResult<Url> {
        self.base_url
            .join(api_constants::API_PATH)
            .and_then(|api| api.join(method))
            .map_err(|e| ApiError::InvalidUrl {
                url: format!("{}{}{}", self.base_url, api_constants::API_PATH, method),
                error: e.to_string(),
            })
    }

    /// Get the base URL of the API
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}
