//! Error types for Netatmo Fetcher
//!
//! This module defines the error types for all components of the application.
//! A missing cache file is not an error anywhere in this taxonomy; it is the
//! cache-miss signal returned as `None` by the cache store.

use std::path::PathBuf;
use thiserror::Error;

/// Authentication-related errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Missing environment variables for credentials
    #[error(
        "Missing Netatmo credentials. Set NETATMO_CLIENT_ID, NETATMO_CLIENT_SECRET and NETATMO_REFRESH_TOKEN or run 'auth setup'"
    )]
    MissingCredentials,

    /// HTTP request failed during authentication
    #[error("HTTP request failed during authentication")]
    Http(#[from] reqwest::Error),

    /// Token endpoint refused the grant
    #[error("Netatmo token request rejected (HTTP {status}): {reason}")]
    TokenRejected { status: u16, reason: String },

    /// Token endpoint answered with something that is not a token
    #[error("Malformed token response: {reason}")]
    MalformedToken { reason: String },

    /// Credential value failed basic validation
    #[error("Invalid credential: {reason}")]
    InvalidCredential { reason: String },

    /// Invalid token endpoint URL
    #[error("Invalid authentication URL: {url}")]
    InvalidUrl { url: String },

    /// File I/O error during credential storage
    #[error("Failed to access credential file")]
    CredentialStorage(#[from] std::io::Error),
}

/// Remote API call errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP request error
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// Request exceeded the configured timeout
    #[error("Request to {method} timed out after {seconds} seconds")]
    Timeout { method: String, seconds: u64 },

    /// Remote quota or HTTP 429
    #[error("Rate limit exceeded for {method}: {message}")]
    RateLimitExceeded { method: String, message: String },

    /// Error envelope returned by the API
    #[error("API error {code} from {method}: {message}")]
    Remote {
        method: String,
        code: i64,
        message: String,
    },

    /// Non-success HTTP status without a parseable error envelope
    #[error("Server error from {method}: HTTP {status}")]
    ServerError { method: String, status: u16 },

    /// Response body did not match the documented envelope
    #[error("Malformed response from {method}: {reason}")]
    MalformedResponse { method: String, reason: String },

    /// Invalid URL built from configuration
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Rate limiter could not be built
    #[error("Invalid rate limit: {reason}")]
    InvalidRateLimit { reason: String },
}

/// Cache management errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Cache directory could not be created or is not a directory
    #[error("Cache directory not accessible: {path}")]
    DirectoryNotAccessible { path: PathBuf },

    /// I/O failure other than a missing file
    #[error("Cache I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cached file exists but does not hold valid JSON
    #[error("Corrupt cache file {path}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Station and measurement data errors
#[derive(Error, Debug)]
pub enum DataError {
    /// Requested station id is not part of the loaded catalog
    #[error("Station {station_id} not found")]
    StationNotFound { station_id: String },

    /// Sample block with a step interval that cannot be expanded
    #[error("Invalid step_time {step} in sample block starting at {beg_time}")]
    InvalidStep { beg_time: i64, step: i64 },

    /// Payload does not match the documented shape
    #[error("Malformed {what} payload: {source}")]
    MalformedPayload {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Configuration could not be rendered
    #[error("Failed to serialize configuration")]
    Serialize(#[from] toml::ser::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Configuration validation failed
    #[error("Configuration validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<String> },

    /// Config file could not be read or written
    #[error("Configuration file I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// CSV export errors
#[derive(Error, Debug)]
pub enum ExportError {
    /// CSV writer failure
    #[error("CSV write failed for {path}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Output directory could not be created
    #[error("Failed to create export directory {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Authentication error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Remote API error
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Cache error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Station or payload error
    #[error(transparent)]
    Data(#[from] DataError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Export error
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is transient; nothing retries automatically, but
    /// the CLI tells the user whether running again may help
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Api(ApiError::Timeout { .. })
                | AppError::Api(ApiError::RateLimitExceeded { .. })
                | AppError::Api(ApiError::Http(_))
                | AppError::Auth(AuthError::Http(_))
        )
    }

    /// Whether the error must abort a bulk run instead of being recorded
    /// against a single station
    pub fn is_fatal_for_bulk(&self) -> bool {
        matches!(
            self,
            AppError::Auth(_)
                | AppError::Cache(_)
                | AppError::Api(ApiError::RateLimitExceeded { .. })
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "authentication",
            AppError::Api(_) => "api",
            AppError::Cache(_) => "cache",
            AppError::Data(_) => "data",
            AppError::Config(_) => "config",
            AppError::Export(_) => "export",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Authentication result type alias
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// API result type alias
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Cache result type alias
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Data result type alias
pub type DataResult<T> = std::result::Result<T, DataError>;

/// Config result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
