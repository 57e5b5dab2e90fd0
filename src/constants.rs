//! Application constants for Netatmo Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names for authentication
pub mod env {
    /// OAuth2 client id of the registered Netatmo application
    pub const CLIENT_ID: &str = "NETATMO_CLIENT_ID";

    /// OAuth2 client secret of the registered Netatmo application
    pub const CLIENT_SECRET: &str = "NETATMO_CLIENT_SECRET";

    /// Long-lived refresh token used to obtain access tokens
    pub const REFRESH_TOKEN: &str = "NETATMO_REFRESH_TOKEN";

    /// All credential variables, in the order they are written to `.env`
    pub const ALL: [&str; 3] = [CLIENT_ID, CLIENT_SECRET, REFRESH_TOKEN];
}

/// Authentication and credential-related constants
pub mod auth {
    use super::Duration;

    /// Minimum plausible length of a Netatmo client id
    pub const MIN_CLIENT_ID_LENGTH: usize = 8;

    /// File permissions for .env file (Unix only) - owner read/write only
    #[cfg(unix)]
    pub const ENV_FILE_PERMISSIONS: u32 = 0o600;

    /// Relative path of the OAuth2 token endpoint
    pub const TOKEN_PATH: &str = "oauth2/token";

    /// Grant type used for every token request
    pub const GRANT_TYPE_REFRESH: &str = "refresh_token";

    /// Tokens this close to expiry are renewed before use
    pub const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
}

/// Remote API endpoints and parameters
pub mod api {
    /// Netatmo API base URL
    pub const BASE_URL: &str = "https://api.netatmo.com/";

    /// Path prefix for data operations
    pub const API_PATH: &str = "api/";

    /// Station listing operation
    pub const GET_PUBLIC_DATA: &str = "getpublicdata";

    /// Measurement history operation
    pub const GET_MEASURE: &str = "getmeasure";

    /// Coarsest scale that still returns raw points
    pub const SCALE_MAX: &str = "max";

    /// API error code reported when the application quota is exhausted
    pub const ERROR_USAGE_REACHED: i64 = 26;

    /// Measurement types reported by public stations
    pub const MEASUREMENT_TYPES: [&str; 11] = [
        "temperature",
        "humidity",
        "pressure",
        "co2",
        "no2",
        "o3",
        "voc",
        "pm10",
        "pm25",
        "rain",
        "wind",
    ];
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "Netatmo-Fetcher/0.1.0 (Climate Research Tool)";

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
}

/// Rate limiting configuration
pub mod limits {
    use super::Duration;

    /// Client-side request ceiling (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 2;

    /// Pause after every live fetch during bulk retrieval
    pub const BULK_RATELIMIT: Duration = Duration::from_secs(8);
}

/// File naming constants
pub mod files {
    /// Suffix for partially written cache files
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Extension of cached payloads
    pub const CACHE_EXTENSION: &str = "json";

    /// Project-local configuration file name
    pub const LOCAL_CONFIG_FILE: &str = "netatmo-fetcher.toml";

    /// Directory name under the user config directory
    pub const CONFIG_DIR_NAME: &str = "netatmo-fetcher";

    /// Configuration file name inside the config directory
    pub const CONFIG_FILE_NAME: &str = "config.toml";

    /// Credential file in the working directory
    pub const DOTENV_FILE: &str = ".env";
}

/// Dataset defaults
pub mod dataset {
    /// Dataset name (and cache directory) used when none is configured
    pub const DEFAULT_NAME: &str = "data";

    /// Default CSV output directory
    pub const DEFAULT_EXPORT_DIR: &str = "csv";

    /// Default range start, 2022-01-15T00:00:00Z
    pub const DEFAULT_START_EPOCH: i64 = 1_642_204_800;

    /// Default range end, 2022-01-17T00:00:00Z
    pub const DEFAULT_END_EPOCH: i64 = 1_642_377_600;

    /// Default bounds (north, south, east, west): the continental United States
    pub const DEFAULT_AREA: (i32, i32, i32, i32) = (55, 15, -60, -130);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_types_include_pressure() {
        assert!(api::MEASUREMENT_TYPES.contains(&"pressure"));
        assert!(api::MEASUREMENT_TYPES.contains(&"pm25"));
    }

    #[test]
    fn test_base_url_joins_api_path() {
        let base = url::Url::parse(api::BASE_URL).unwrap();
        let joined = base
            .join(api::API_PATH)
            .unwrap()
            .join(api::GET_PUBLIC_DATA)
            .unwrap();
        assert_eq!(joined.as_str(), "https://api.netatmo.com/api/getpublicdata");
    }

    #[test]
    fn test_bulk_ratelimit_is_eight_seconds() {
        assert_eq!(limits::BULK_RATELIMIT, Duration::from_secs(8));
    }
}
