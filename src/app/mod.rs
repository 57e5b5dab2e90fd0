//! Core application logic for Netatmo Fetcher
//!
//! This module contains the main application components: the HTTP client,
//! data models, the response cache, the download session with its station
//! catalog and series decoding, and CSV export.
//!
//! # Examples
//!
//! ```rust,no_run
//! use chrono::{TimeZone, Utc};
//! use netatmo_fetcher::app::{Area, Dataset, DatasetConfig, NetatmoClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DatasetConfig::new(
//!     "netatmo-2022-01-15-17",
//!     Area::new(55, 15, -60, -130),
//!     Utc.with_ymd_and_hms(2022, 1, 15, 0, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2022, 1, 17, 0, 0, 0).unwrap(),
//! );
//! let mut dataset = Dataset::new(NetatmoClient::new()?, config);
//!
//! for station in dataset.get_stations(true).await? {
//!     println!("{} at {:?}", station.id, station.place.location);
//! }
//!
//! let station_id = "70:ee:50:3f:13:4c";
//! let series = dataset.get_data(station_id, "pressure", None).await?;
//! println!("{} samples", series.len());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod dataset;
pub mod export;
pub mod models;

// Re-export main public API
pub use cache::{CacheConfig, CacheKey, CacheStore};
pub use client::{Authorization, ClientConfig, NetatmoClient};
pub use dataset::{
    decode_series, resolve_module, BulkReport, Dataset, DatasetConfig, FetchOutcome, StationFetch,
};
pub use export::{csv_file_name, export_report};
pub use models::{Area, Degrees, SampleBlock, Series, SeriesSource, Station};
