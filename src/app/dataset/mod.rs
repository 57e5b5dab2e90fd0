//! Station catalog, series retrieval and bulk orchestration
//!
//! A [`Dataset`] is one logical download session: an area, a UTC date range
//! and a name that namespaces its cache directory. It loads the station
//! catalog at most once, authorizes lazily on the first live request, and
//! answers every request from the cache when it can.
//!
//! Execution is strictly sequential. The only deliberate suspension is the
//! rate-limit pause after a live `getmeasure` call; cache hits never pause.
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
//! let report = dataset.get_all_data("pressure").await?;
//! println!("{} of {} stations have data", report.data_count(), report.len());
//! # Ok(())
//! # }
//! ```

pub mod bulk;
pub mod decode;
pub mod resolver;

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::app::cache::{CacheConfig, CacheKey, CacheStore};
use crate::app::client::{Authorization, MeasureQuery, NetatmoClient, PublicDataQuery};
use crate::app::models::{Area, Degrees, SampleBlock, Series, SeriesSource, Station};
use crate::constants::{dataset, limits};
use crate::errors::{AuthResult, DataError, Result};

pub use bulk::{BulkReport, FetchOutcome, StationFetch};
pub use decode::decode_series;
pub use resolver::resolve_module;

/// Parameters of a download session
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetConfig {
    /// Names the cache directory
    pub name: String,
    /// Bounds are not checked here; see [`Area::validate`]
    pub area: Area,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub cache: CacheConfig,
    /// Filter flag used when the catalog is loaded implicitly
    pub filter_stations: bool,
}

impl DatasetConfig {
    pub fn new(
        name: impl Into<String>,
        area: Area,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            area,
            start,
            end,
            cache: CacheConfig::default(),
            filter_stations: true,
        }
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_filter_stations(mut self, filter_stations: bool) -> Self {
        self.filter_stations = filter_stations;
        self
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        let (north, south, east, west) = dataset::DEFAULT_AREA;
        Self::new(
            dataset::DEFAULT_NAME,
            Area::new(north, south, east, west),
            DateTime::from_timestamp(dataset::DEFAULT_START_EPOCH, 0).unwrap_or_default(),
            DateTime::from_timestamp(dataset::DEFAULT_END_EPOCH, 0).unwrap_or_default(),
        )
    }
}

/// Download session over one area and date range
#[derive(Debug)]
pub struct Dataset {
    client: NetatmoClient,
    config: DatasetConfig,
    store: CacheStore,
    authorization: Option<Authorization>,
    stations: Option<Vec<Station>>,
    /// Filter flag the memoized catalog was loaded with
    stations_filter: bool,
}

impl Dataset {
    /// Creates a session; nothing is read, fetched or authorized yet
    pub fn new(client: NetatmoClient, config: DatasetConfig) -> Self {
        let store = CacheStore::new(config.cache.dataset_dir(&config.name));
        let stations_filter = config.filter_stations;
        Self {
            client,
            config,
            store,
            authorization: None,
            stations: None,
            stations_filter,
        }
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// The memoized catalog, if it has been loaded
    pub fn stations(&self) -> Option<&[Station]> {
        self.stations.as_deref()
    }

    /// Whether a usable access token is held
    pub fn is_authorized(&self) -> bool {
        self.authorization
            .as_ref()
            .is_some_and(|authorization| !authorization.is_expired())
    }

    /// Returns the session's access token, authorizing on first use and
    /// renewing it once it has expired
    async fn authorization(&mut self) -> AuthResult<Authorization> {
        let renewed = match &self.authorization {
            Some(current) if !current.is_expired() => None,
            Some(current) => {
                info!("Access token expired, renewing");
                Some(self.client.refresh(current).await?)
            }
            None => {
                info!("Authorizing with Netatmo");
                Some(self.client.authorize().await?)
            }
        };

        if let Some(authorization) = renewed {
            self.authorization = Some(authorization);
        }

        self.authorization
            .clone()
            .ok_or(crate::errors::AuthError::MissingCredentials)
    }

    /// Lists the stations inside the session's area
    ///
    /// The first call loads the catalog from the cache or, on a miss, from
    /// `getpublicdata` (persisting the raw payload). Every later call returns
    /// that same list: `filter` only applies to the call that loads it.
    ///
    /// # Errors
    ///
    /// Returns an error if authorization fails (nothing is cached then), the
    /// API call fails, the cache cannot be read or written, or the payload is
    /// not a station list
    pub async fn get_stations(&mut self, filter: bool) -> Result<&[Station]> {
        if self.stations.is_some() {
            info!("Stations already loaded");
            if filter != self.stations_filter {
                warn!(
                    "Station catalog was loaded with filter={}; ignoring filter={}",
                    self.stations_filter, filter
                );
            }
        } else {
            self.load_stations(filter).await?;
        }

        Ok(self.stations.as_deref().unwrap_or_default())
    }

    async fn ensure_stations(&mut self) -> Result<()> {
        if self.stations.is_none() {
            self.load_stations(self.config.filter_stations).await?;
        }
        Ok(())
    }

    async fn load_stations(&mut self, filter: bool) -> Result<()> {
        let key = CacheKey::stations(&self.config.area);

        let payload = match self.store.load(&key).await? {
            Some(payload) => payload,
            None => {
                let area = &self.config.area;
                info!(
                    "Downloading stations for N{} W{} S{} E{}",
                    area.north, area.west, area.south, area.east
                );
                let authorization = self.authorization().await?;
                let query = PublicDataQuery::new(self.config.area.clone(), filter);
                let payload = self.client.get_public_data(&authorization, &query).await?;
                self.store.save(&key, &payload).await?;
                payload
            }
        };

        let stations: Vec<Station> =
            serde_json::from_str(payload.get()).map_err(|source| DataError::MalformedPayload {
                what: "station list",
                source,
            })?;

        info!(
            "Loaded {} stations from {}",
            stations.len(),
            self.store.path_for(&key).display()
        );
        self.stations = Some(stations);
        self.stations_filter = filter;
        Ok(())
    }

    /// Retrieves and decodes one station's series for `measurement_type`
    ///
    /// Loads the catalog first if needed. A station without a module for the
    /// type yields an empty series tagged [`SeriesSource::NoModule`] without
    /// touching the cache or the network. When `ratelimit` is set, every
    /// `getmeasure` call is followed by a pause of that length, whether it
    /// succeeded or not; a cache hit never pauses.
    ///
    /// # Errors
    ///
    /// Returns `DataError::StationNotFound` for an id outside the catalog,
    /// and authorization, API, cache or payload errors otherwise
    pub async fn get_data(
        &mut self,
        station_id: &str,
        measurement_type: &str,
        ratelimit: Option<Duration>,
    ) -> Result<Series> {
        self.ensure_stations().await?;

        let station = self
            .stations
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|station| station.id == station_id)
            .ok_or_else(|| DataError::StationNotFound {
                station_id: station_id.to_string(),
            })?;

        let Some(module_id) = resolve_module(station, measurement_type).map(str::to_string) else {
            debug!("Station {} has no {} module", station_id, measurement_type);
            return Ok(Series::no_module());
        };

        let key = CacheKey::series(station_id, &module_id, measurement_type);

        let (payload, source) = match self.store.load(&key).await? {
            Some(payload) => {
                info!(
                    "Loaded data for {} {} {}",
                    station_id, module_id, measurement_type
                );
                (payload, SeriesSource::Cache)
            }
            None => {
                info!(
                    "Downloading data for {} {} {}",
                    station_id, module_id, measurement_type
                );
                let authorization = self.authorization().await?;
                let query = MeasureQuery::new(
                    station_id,
                    module_id.as_str(),
                    measurement_type,
                    self.config.start.timestamp(),
                    self.config.end.timestamp(),
                );
                let fetched = self.client.get_measure(&authorization, &query).await;

                // Rejected calls count against the quota too
                if let Some(delay) = ratelimit {
                    debug!("Rate limit: sleeping {:?}", delay);
                    tokio::time::sleep(delay).await;
                }

                let payload = fetched?;
                self.store.save(&key, &payload).await?;
                (payload, SeriesSource::Network)
            }
        };

        let blocks: Vec<SampleBlock> =
            serde_json::from_str(payload.get()).map_err(|source| DataError::MalformedPayload {
                what: "measurement",
                source,
            })?;
        let (times, values) = decode_series(&blocks)?;

        Ok(Series {
            times,
            values,
            source,
        })
    }

    /// Fetches `measurement_type` from every station with the standard
    /// pause after each live download
    ///
    /// # Errors
    ///
    /// See [`Dataset::get_all_data_with`]
    pub async fn get_all_data(&mut self, measurement_type: &str) -> Result<BulkReport> {
        self.get_all_data_with(measurement_type, limits::BULK_RATELIMIT, |_, _, _| {})
            .await
    }

    /// Fetches `measurement_type` from every station in catalog order
    ///
    /// Each station's result is recorded in the report; a failing station
    /// does not stop the run. `on_station` is called after every station
    /// with the entry, its 1-based position and the station count.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded, and aborts on
    /// authorization failures, cache failures or an exhausted API quota
    pub async fn get_all_data_with<F>(
        &mut self,
        measurement_type: &str,
        ratelimit: Duration,
        mut on_station: F,
    ) -> Result<BulkReport>
    where
        F: FnMut(&StationFetch, usize, usize),
    {
        self.ensure_stations().await?;

        let targets: Vec<(String, Degrees, Degrees)> = self
            .stations
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|station| {
                let [longitude, latitude] = station.place.location.clone();
                (station.id.clone(), longitude, latitude)
            })
            .collect();
        let total = targets.len();

        info!(
            "Fetching {} for {} stations (rate limit {:?})",
            measurement_type, total, ratelimit
        );

        let mut report = BulkReport::new(measurement_type);
        for (index, (station_id, longitude, latitude)) in targets.into_iter().enumerate() {
            let outcome = match self
                .get_data(&station_id, measurement_type, Some(ratelimit))
                .await
            {
                Ok(series) => FetchOutcome::from(series),
                Err(e) if e.is_fatal_for_bulk() => {
                    warn!(
                        "Aborting bulk fetch at station {} ({}/{}): {}",
                        station_id,
                        index + 1,
                        total,
                        e
                    );
                    return Err(e);
                }
                Err(e) => {
                    warn!("Fetching {} failed: {}", station_id, e);
                    FetchOutcome::Failed(e.to_string())
                }
            };

            let fetch = StationFetch {
                station_id,
                longitude,
                latitude,
                outcome,
            };
            on_station(&fetch, index + 1, total);
            report.push(fetch);
        }

        info!(
            "Fetched {}: {} with data, {} without, {} failed",
            measurement_type,
            report.data_count(),
            report.no_data_count(),
            report.failed_count()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::ClientConfig;
    use crate::auth::Credentials;
    use crate::errors::AppError;
    use chrono::TimeZone;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const STATIONS: &str = r#"[
        {"_id": "70:ee:50:00:00:01", "place": {"location": [-73.98, 40.75]},
         "measures": {"70:ee:50:00:00:01": {"type": ["pressure"]},
                      "02:00:00:00:00:01": {"type": ["temperature", "humidity"]}}},
        {"_id": "70:ee:50:00:00:02", "place": {"location": [-87.62, 41.88]},
         "measures": {"02:00:00:00:00:02": {"type": ["temperature", "humidity"]}}}
    ]"#;

    fn dataset(server: &MockServer, cache_root: &TempDir) -> Dataset {
        let client = NetatmoClient::with_config(ClientConfig::with_base_url(server.uri()))
            .unwrap()
            .with_credentials(Credentials {
                client_id: "client-id-1234".to_string(),
                client_secret: "secret".to_string(),
                refresh_token: "refresh".to_string(),
            });
        let config = DatasetConfig::new(
            "test-set",
            Area::new(55, 15, -60, -130),
            Utc.with_ymd_and_hms(2022, 1, 15, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2022, 1, 17, 0, 0, 0).unwrap(),
        )
        .with_cache(CacheConfig::with_cache_root(cache_root.path()));
        Dataset::new(client, config)
    }

    fn seed(cache_root: &TempDir, file: &str, contents: &str) {
        let dir = cache_root.path().join("test-set");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(file), contents).unwrap();
    }

    async fn no_network(server: &MockServer) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_memoized_catalog_ignores_filter_flag() {
        let server = MockServer::start().await;
        no_network(&server).await;
        let cache = TempDir::new().unwrap();
        seed(&cache, "stations-N55W-130S15E-60.json", STATIONS);

        let mut dataset = dataset(&server, &cache);
        assert!(dataset.stations().is_none());

        let first = dataset.get_stations(true).await.unwrap().to_vec();
        let second = dataset.get_stations(false).await.unwrap().to_vec();

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert!(!dataset.is_authorized());
    }

    #[tokio::test]
    async fn test_station_lookup_loads_catalog_implicitly() {
        let server = MockServer::start().await;
        no_network(&server).await;
        let cache = TempDir::new().unwrap();
        seed(&cache, "stations-N55W-130S15E-60.json", STATIONS);
        seed(
            &cache,
            "70:ee:50:00:00:01-70:ee:50:00:00:01-pressure.json",
            r#"[{"beg_time": 1642204800, "step_time": 600, "value": [[1013.2], [1013.5]]}]"#,
        );

        let mut dataset = dataset(&server, &cache);
        let series = dataset
            .get_data("70:ee:50:00:00:01", "pressure", None)
            .await
            .unwrap();

        assert!(dataset.stations().is_some());
        assert_eq!(series.times, vec![1642204800, 1642205400]);
        assert_eq!(series.values, vec![1013.2, 1013.5]);
        assert_eq!(series.source, SeriesSource::Cache);
    }

    #[tokio::test]
    async fn test_missing_module_is_empty_series() {
        let server = MockServer::start().await;
        no_network(&server).await;
        let cache = TempDir::new().unwrap();
        seed(&cache, "stations-N55W-130S15E-60.json", STATIONS);

        let mut dataset = dataset(&server, &cache);
        let series = dataset
            .get_data("70:ee:50:00:00:02", "pressure", Some(Duration::from_secs(30)))
            .await
            .unwrap();

        assert!(series.is_empty());
        assert_eq!(series.source, SeriesSource::NoModule);
    }

    #[tokio::test]
    async fn test_failed_authorization_caches_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(serde_json::json!({"error": "invalid_grant"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/getpublicdata"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let cache = TempDir::new().unwrap();

        let mut dataset = dataset(&server, &cache);
        let result = dataset.get_stations(true).await;

        assert!(matches!(result, Err(AppError::Auth(_))));
        assert!(dataset.stations().is_none());
        assert!(!cache.path().join("test-set").exists());
    }

    #[tokio::test]
    async fn test_corrupt_station_payload() {
        let server = MockServer::start().await;
        no_network(&server).await;
        let cache = TempDir::new().unwrap();
        seed(&cache, "stations-N55W-130S15E-60.json", r#"{"unexpected": true}"#);

        let mut dataset = dataset(&server, &cache);
        let result = dataset.get_stations(true).await;
        assert!(matches!(
            result,
            Err(AppError::Data(DataError::MalformedPayload { .. }))
        ));
    }
}
