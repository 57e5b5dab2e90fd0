//! Cache configuration types and defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration for the response cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding one sub-directory per dataset name
    pub root: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        // Dataset directories live in the working directory unless configured
        Self {
            root: PathBuf::from("."),
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with custom cache root
    pub fn with_cache_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory that holds the cached payloads of one dataset
    pub fn dataset_dir(&self, name: &str) -> PathBuf {
        if self.root == Path::new(".") {
            PathBuf::from(name)
        } else {
            self.root.join(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_uses_working_directory() {
        let config = CacheConfig::default();
        assert_eq!(
            config.dataset_dir("netatmo-2022-01-15-17"),
            PathBuf::from("netatmo-2022-01-15-17")
        );
    }

    #[test]
    fn test_custom_root() {
        let config = CacheConfig::with_cache_root("/var/cache/netatmo");
        assert_eq!(
            config.dataset_dir("data"),
            PathBuf::from("/var/cache/netatmo/data")
        );
    }
}
