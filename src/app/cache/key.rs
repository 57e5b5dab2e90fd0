//! Cache key derivation
//!
//! File names are part of the on-disk format shared with earlier runs and
//! must be reproduced exactly:
//! - station lists: `stations-N{north}W{west}S{south}E{east}.json`
//! - series data: `{station_id}-{module_id}-{measurement_type}.json`

use std::fmt;

use crate::app::models::Area;
use crate::constants::files;

/// Deterministic identifier of one cached response
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key of the station list for an area; bound order is north, west,
    /// south, east
    pub fn stations(area: &Area) -> Self {
        Self(format!(
            "stations-N{}W{}S{}E{}",
            area.north, area.west, area.south, area.east
        ))
    }

    /// Key of one station/module/type measurement payload
    pub fn series(station_id: &str, module_id: &str, measurement_type: &str) -> Self {
        Self(format!("{}-{}-{}", station_id, module_id, measurement_type))
    }

    /// File name of the cached payload
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.0, files::CACHE_EXTENSION)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
