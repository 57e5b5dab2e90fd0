//! Data models for stations, areas and measurement series
//!
//! Stations and sample blocks mirror the JSON returned by the public weather
//! API. Everything here is deserialized from payloads that are cached
//! verbatim, so field names follow the wire format.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Number;

/// A coordinate bound in decimal degrees
///
/// Keeps the number exactly as written (`55` and `55.0` are different
/// values here) because the bound is rendered into cache filenames, and
/// those must match files written by earlier runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Degrees(Number);

impl Degrees {
    /// Numeric value of the bound
    pub fn as_f64(&self) -> f64 {
        self.0.as_f64().unwrap_or(f64::NAN)
    }
}

impl From<i32> for Degrees {
    fn from(value: i32) -> Self {
        Self(Number::from(value))
    }
}

impl TryFrom<f64> for Degrees {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Number::from_f64(value)
            .map(Self)
            .ok_or_else(|| format!("{} is not a finite coordinate", value))
    }
}

impl FromStr for Degrees {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str::<Number>(s.trim())
            .map(Self)
            .map_err(|_| format!("'{}' is not a number", s))
    }
}

impl fmt::Display for Degrees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Geographic bounding box
///
/// The system does not require `north > south` or `east > west`;
/// [`Area::validate`] is offered to callers that want the check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub north: Degrees,
    pub south: Degrees,
    pub east: Degrees,
    pub west: Degrees,
}

impl Area {
    pub fn new(
        north: impl Into<Degrees>,
        south: impl Into<Degrees>,
        east: impl Into<Degrees>,
        west: impl Into<Degrees>,
    ) -> Self {
        Self {
            north: north.into(),
            south: south.into(),
            east: east.into(),
            west: west.into(),
        }
    }

    /// Collect every problem with the bounds
    pub fn validate(&self) -> Vec<String> {
        let (n, s, e, w) = (
            self.north.as_f64(),
            self.south.as_f64(),
            self.east.as_f64(),
            self.west.as_f64(),
        );
        let mut errors = Vec::new();
        if n <= s {
            errors.push(format!("north ({}) must be greater than south ({})", n, s));
        }
        if e <= w {
            errors.push(format!("east ({}) must be greater than west ({})", e, w));
        }
        for (name, lat) in [("north", n), ("south", s)] {
            if !(-90.0..=90.0).contains(&lat) {
                errors.push(format!("{} latitude {} outside [-90, 90]", name, lat));
            }
        }
        for (name, lon) in [("east", e), ("west", w)] {
            if !(-180.0..=180.0).contains(&lon) {
                errors.push(format!("{} longitude {} outside [-180, 180]", name, lon));
            }
        }
        errors
    }
}

/// A public weather station as listed by `getpublicdata`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Device id (MAC address form)
    #[serde(rename = "_id")]
    pub id: String,
    pub place: Place,
    /// Sensor modules keyed by module id, in API order
    #[serde(default)]
    pub measures: Measures,
}

impl Station {
    pub fn longitude(&self) -> f64 {
        self.place.location[0].as_f64()
    }

    pub fn latitude(&self) -> f64 {
        self.place.location[1].as_f64()
    }
}

/// Station placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// `[longitude, latitude]` as written in the payload
    pub location: [Degrees; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// Measurement types reported by one module
///
/// Rain and wind gauges publish their readings without a `type` list; they
/// are treated as reporting nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    #[serde(rename = "type", default)]
    pub types: Vec<String>,
}

impl ModuleDescriptor {
    pub fn reports(&self, measurement_type: &str) -> bool {
        self.types.iter().any(|t| t == measurement_type)
    }
}

/// Module id to descriptor mapping that preserves the order of the JSON
/// object it was read from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measures(Vec<(String, ModuleDescriptor)>);

impl Measures {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModuleDescriptor)> {
        self.0.iter().map(|(id, descriptor)| (id.as_str(), descriptor))
    }

    pub fn get(&self, module_id: &str) -> Option<&ModuleDescriptor> {
        self.0
            .iter()
            .find(|(id, _)| id == module_id)
            .map(|(_, descriptor)| descriptor)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, ModuleDescriptor)> for Measures {
    fn from_iter<I: IntoIterator<Item = (String, ModuleDescriptor)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for Measures {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, descriptor) in &self.0 {
            map.serialize_entry(id, descriptor)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Measures {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MeasuresVisitor;

        impl<'de> Visitor<'de> for MeasuresVisitor {
            type Value = Measures;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of module ids to module descriptors")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Measures, A::Error> {
                let mut modules = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((id, descriptor)) = access.next_entry()? {
                    modules.push((id, descriptor));
                }
                Ok(Measures(modules))
            }
        }

        deserializer.deserialize_map(MeasuresVisitor)
    }
}

/// One block of `getmeasure` output
///
/// Without `step_time` the block is a single sample at `beg_time`; with it,
/// the values are successive samples `step_time` seconds apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleBlock {
    pub beg_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_time: Option<i64>,
    /// One tuple of fields per sample; only the first field is used
    #[serde(default)]
    pub value: Vec<Vec<Option<f64>>>,
}

/// Where a decoded series came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesSource {
    /// Decoded from a previously cached payload
    Cache,
    /// Downloaded during this call
    Network,
    /// The station has no module reporting the requested type
    NoModule,
}

/// A decoded time series: equal-length timestamps (epoch seconds) and values
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub times: Vec<i64>,
    pub values: Vec<f64>,
    pub source: SeriesSource,
}

impl Series {
    /// Empty result for a station without a matching module
    pub fn no_module() -> Self {
        Self {
            times: Vec::new(),
            values: Vec::new(),
            source: SeriesSource::NoModule,
        }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// `(timestamp, value)` pairs in series order
    pub fn points(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.times.iter().copied().zip(self.values.iter().copied())
    }

    /// Timestamps as UTC datetimes; out-of-range values are skipped
    pub fn datetimes(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + '_ {
        self.points()
            .filter_map(|(t, v)| DateTime::from_timestamp(t, 0).map(|dt| (dt, v)))
    }
}
