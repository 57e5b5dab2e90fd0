//! Configuration management for Netatmo Fetcher
//!
//! This module provides TOML configuration with multi-source loading and
//! zero-config defaults. Credentials never live here; they come from the
//! environment (see [`crate::auth`]).

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{Area, CacheConfig, ClientConfig, DatasetConfig, Degrees};
use crate::constants::{api, dataset, files, http, limits};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Area, date range and cache name of the dataset
    pub dataset: DatasetSection,
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Cache location
    pub cache: CacheConfigToml,
    /// Bulk retrieval settings
    pub fetch: FetchConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Dataset definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSection {
    /// Dataset name; also the name of its cache directory
    pub name: String,
    pub north: Degrees,
    pub south: Degrees,
    pub east: Degrees,
    pub west: Degrees,
    /// Range start (RFC 3339, UTC)
    pub start: DateTime<Utc>,
    /// Range end (RFC 3339, UTC)
    pub end: DateTime<Utc>,
}

impl Default for DatasetSection {
    fn default() -> Self {
        let (north, south, east, west) = dataset::DEFAULT_AREA;
        Self {
            name: dataset::DEFAULT_NAME.to_string(),
            north: north.into(),
            south: south.into(),
            east: east.into(),
            west: west.into(),
            start: DateTime::from_timestamp(dataset::DEFAULT_START_EPOCH, 0).unwrap_or_default(),
            end: DateTime::from_timestamp(dataset::DEFAULT_END_EPOCH, 0).unwrap_or_default(),
        }
    }
}

impl DatasetSection {
    pub fn area(&self) -> Area {
        Area {
            north: self.north.clone(),
            south: self.south.clone(),
            east: self.east.clone(),
            west: self.west.clone(),
        }
    }
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// API root
    pub base_url: String,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            base_url: api::BASE_URL.to_string(),
            request_timeout_secs: http::DEFAULT_TIMEOUT.as_secs(),
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
        }
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            rate_limit_rps: self.rate_limit_rps,
        }
    }
}

/// TOML-friendly cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CacheConfigToml {
    /// Directory holding the dataset directories (None = working directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

impl CacheConfigToml {
    /// Convert to runtime CacheConfig
    pub fn to_runtime_config(&self) -> CacheConfig {
        match &self.root {
            Some(root) => CacheConfig::with_cache_root(root),
            None => CacheConfig::default(),
        }
    }
}

/// Bulk retrieval settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Pause after every live download, e.g. "8s" or "1m"
    #[serde(with = "humantime_serde")]
    pub ratelimit: Duration,
    /// Ask the API to drop stations with implausible readings
    pub filter_stations: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            ratelimit: limits::BULK_RATELIMIT,
            filter_stations: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration with multi-source precedence:
    /// 1. Explicit config file (must exist)
    /// 2. `./netatmo-fetcher.toml`
    /// 3. The user config directory
    /// 4. Default values
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) if path.exists() => Some(path),
            Some(path) => return Err(ConfigError::NotFound { path }),
            None => Self::find_config_file(),
        };

        match config_path {
            Some(path) => Self::load_from_file(&path).await,
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(files::LOCAL_CONFIG_FILE)];
        if let Some(path) = Self::default_config_path() {
            search_paths.push(path);
        }

        let found = search_paths.into_iter().find(|path| path.exists());
        if let Some(path) = &found {
            debug!("Found config file: {}", path.display());
        }
        found
    }

    /// Get the default config file path for the current user
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(files::CONFIG_DIR_NAME).join(files::CONFIG_FILE_NAME))
    }

    /// Load configuration from a TOML file
    pub async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig = toml::from_str(&content)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Write the commented default configuration
    ///
    /// Writes to `path`, or to the user config directory when `None`.
    /// An existing file is only replaced with `force`.
    pub async fn init(path: Option<PathBuf>, force: bool) -> ConfigResult<PathBuf> {
        let config_path = match path.or_else(Self::default_config_path) {
            Some(path) => path,
            None => {
                return Err(ConfigError::InvalidValue {
                    field: "config path".to_string(),
                    value: String::new(),
                    reason: "Could not determine user config directory".to_string(),
                })
            }
        };

        if config_path.exists() && !force {
            return Err(ConfigError::InvalidValue {
                field: "config path".to_string(),
                value: config_path.display().to_string(),
                reason: "File already exists; use --force to overwrite".to_string(),
            });
        }

        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ConfigError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        tokio::fs::write(&config_path, Self::generate_default_config_content())
            .await
            .map_err(|source| ConfigError::Io {
                path: config_path.clone(),
                source,
            })?;

        info!("Wrote default configuration to {}", config_path.display());
        Ok(config_path)
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check the values a run depends on
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` listing every problem found
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = self.dataset.area().validate();

        if self.dataset.name.trim().is_empty() {
            errors.push("dataset name cannot be empty".to_string());
        }
        if self.dataset.start >= self.dataset.end {
            errors.push(format!(
                "start ({}) must be before end ({})",
                self.dataset.start, self.dataset.end
            ));
        }
        if self.client.rate_limit_rps == 0 {
            errors.push("rate_limit_rps must be greater than zero".to_string());
        }
        if self.client.request_timeout_secs == 0 {
            errors.push("request_timeout_secs must be greater than zero".to_string());
        }
        if url::Url::parse(&self.client.base_url).is_err() {
            errors.push(format!("base_url '{}' is not a valid URL", self.client.base_url));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationFailed { errors })
        }
    }

    /// Session parameters for [`crate::app::Dataset`]
    pub fn to_dataset_config(&self) -> DatasetConfig {
        DatasetConfig::new(
            self.dataset.name.clone(),
            self.dataset.area(),
            self.dataset.start,
            self.dataset.end,
        )
        .with_cache(self.cache.to_runtime_config())
        .with_filter_stations(self.fetch.filter_stations)
    }

    /// Generate default configuration content with helpful comments
    pub fn generate_default_config_content() -> String {
        let defaults = DatasetSection::default();
        format!(
            r#"# Netatmo Fetcher Configuration
# Credentials are read from NETATMO_CLIENT_ID, NETATMO_CLIENT_SECRET and
# NETATMO_REFRESH_TOKEN (or a .env file); run 'auth setup' to create one.

[dataset]
# Name of the dataset; cached responses go to a directory of this name
name = "{name}"

# Bounding box in decimal degrees
north = {north}
south = {south}
east = {east}
west = {west}

# Date range (UTC, RFC 3339)
start = "{start}"
end = "{end}"

[client]
base_url = "{base_url}"
request_timeout_secs = {request_timeout}
connect_timeout_secs = {connect_timeout}
# Client-side ceiling on requests per second
rate_limit_rps = {rps}

[cache]
# Directory holding the dataset directories (default: working directory)
# root = "/path/to/cache"

[fetch]
# Pause after every downloaded station during bulk fetches
ratelimit = "{ratelimit}"
# Let the API drop stations with implausible readings
filter_stations = true

[logging]
level = "info"  # error, warn, info, debug, trace
"#,
            name = defaults.name,
            north = defaults.north,
            south = defaults.south,
            east = defaults.east,
            west = defaults.west,
            start = defaults.start.to_rfc3339(),
            end = defaults.end.to_rfc3339(),
            base_url = api::BASE_URL,
            request_timeout = http::DEFAULT_TIMEOUT.as_secs(),
            connect_timeout = http::CONNECT_TIMEOUT.as_secs(),
            rps = limits::DEFAULT_RATE_LIMIT_RPS,
            ratelimit = format!("{}s", limits::BULK_RATELIMIT.as_secs()),
        )
    }
}
