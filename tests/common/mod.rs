//! Shared fixtures for the integration tests
//!
//! Every test runs against a wiremock server standing in for the Netatmo
//! API and a temporary cache root, so nothing touches the network or the
//! user's real cache.

#![allow(dead_code)]

use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use netatmo_fetcher::app::{Area, CacheConfig, ClientConfig, Dataset, DatasetConfig, NetatmoClient};
use netatmo_fetcher::auth::Credentials;

pub const DATASET_NAME: &str = "netatmo-2022-01-15-17";
pub const STATIONS_FILE: &str = "stations-N55W-130S15E-60.json";

pub const NEW_YORK: &str = "70:ee:50:00:00:01";
pub const CHICAGO: &str = "70:ee:50:00:00:02";
pub const DENVER: &str = "70:ee:50:00:00:03";

/// Three stations: two with a pressure module, one temperature-only
pub fn stations_body() -> serde_json::Value {
    json!([
        {"_id": NEW_YORK, "place": {"location": [-74, 40], "city": "New York"},
         "measures": {NEW_YORK: {"type": ["pressure"]},
                      "02:00:00:00:00:01": {"type": ["temperature", "humidity"]}}},
        {"_id": CHICAGO, "place": {"location": [-87.62, 41.88]},
         "measures": {"02:00:00:00:00:02": {"type": ["temperature", "humidity"]}}},
        {"_id": DENVER, "place": {"location": [-104.99, 39.74]},
         "measures": {DENVER: {"type": ["pressure"]}}}
    ])
}

/// Two samples ten minutes apart starting at the range start
pub fn pressure_body() -> serde_json::Value {
    json!([{"beg_time": 1642204800, "step_time": 600, "value": [[1013.2], [1013.5]]}])
}

pub fn ok(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"status": "ok", "body": body}))
}

pub struct Fixture {
    pub server: MockServer,
    pub cache: TempDir,
}

impl Fixture {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            cache: TempDir::new().unwrap(),
        }
    }

    pub fn dataset_dir(&self) -> PathBuf {
        self.cache.path().join(DATASET_NAME)
    }

    pub fn client(&self) -> NetatmoClient {
        NetatmoClient::with_config(ClientConfig::with_base_url(self.server.uri()))
            .unwrap()
            .with_credentials(Credentials {
                client_id: "5f1e2d3c4b5a69788796".to_string(),
                client_secret: "test-secret".to_string(),
                refresh_token: "test-refresh".to_string(),
            })
    }

    pub fn dataset(&self) -> Dataset {
        self.dataset_with(self.client())
    }

    pub fn dataset_with(&self, client: NetatmoClient) -> Dataset {
        let config = DatasetConfig::new(
            DATASET_NAME,
            Area::new(55, 15, -60, -130),
            Utc.with_ymd_and_hms(2022, 1, 15, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2022, 1, 17, 0, 0, 0).unwrap(),
        )
        .with_cache(CacheConfig::with_cache_root(self.cache.path()));
        Dataset::new(client, config)
    }

    /// Token endpoint accepting the refresh grant, expected `times` times
    pub async fn mount_token(&self, times: u64) {
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "access-1",
                "refresh_token": "test-refresh",
                "expires_in": 10800
            })))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    pub async fn mount_stations(&self, times: u64) {
        Mock::given(method("POST"))
            .and(path("/api/getpublicdata"))
            .respond_with(ok(stations_body()))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    pub async fn mount_measure(&self, device_id: &str, response: ResponseTemplate, times: u64) {
        Mock::given(method("POST"))
            .and(path("/api/getmeasure"))
            .and(body_string_contains(format!(
                "device_id={}",
                device_id.replace(':', "%3A")
            )))
            .respond_with(response)
            .expect(times)
            .mount(&self.server)
            .await;
    }

    pub fn seed(&self, file: &str, contents: &str) {
        std::fs::create_dir_all(self.dataset_dir()).unwrap();
        std::fs::write(self.dataset_dir().join(file), contents).unwrap();
    }
}

pub fn series_file(station_id: &str, module_id: &str, measurement_type: &str) -> String {
    format!("{}-{}-{}.json", station_id, module_id, measurement_type)
}
