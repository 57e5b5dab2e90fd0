//! Integration tests for bulk retrieval across all stations

mod common;

use std::time::{Duration, Instant};

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use common::*;
use netatmo_fetcher::app::{export_report, FetchOutcome, SeriesSource};
use netatmo_fetcher::errors::{ApiError, AppError};

const FAST: Duration = Duration::from_millis(20);

#[tokio::test]
async fn test_bulk_run_records_each_station_in_catalog_order() {
    let fixture = Fixture::start().await;
    fixture.mount_token(1).await;
    fixture.mount_stations(1).await;
    fixture.mount_measure(NEW_YORK, ok(pressure_body()), 1).await;
    fixture
        .mount_measure(DENVER, ResponseTemplate::new(502), 1)
        .await;

    let mut dataset = fixture.dataset();
    let mut positions = Vec::new();
    let report = dataset
        .get_all_data_with("pressure", FAST, |fetch, position, total| {
            positions.push((fetch.station_id.clone(), position, total))
        })
        .await
        .unwrap();

    assert_eq!(
        positions,
        vec![
            (NEW_YORK.to_string(), 1, 3),
            (CHICAGO.to_string(), 2, 3),
            (DENVER.to_string(), 3, 3),
        ]
    );
    assert_eq!(report.len(), 3);
    assert_eq!(report.data_count(), 1);
    assert_eq!(report.no_data_count(), 1);
    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.downloaded_count(), 1);

    let failed: Vec<_> = report.failures().map(|f| f.station_id.as_str()).collect();
    assert_eq!(failed, vec![DENVER]);
}

fn usage_reached() -> ResponseTemplate {
    ResponseTemplate::new(403).set_body_json(json!({
        "error": {"code": 26, "message": "User usage reached"}
    }))
}

#[tokio::test]
async fn test_failed_calls_are_paced_and_exhausted_quota_aborts() {
    let fixture = Fixture::start().await;
    fixture.seed(STATIONS_FILE, &stations_body().to_string());
    fixture.mount_token(1).await;
    fixture
        .mount_measure(NEW_YORK, ResponseTemplate::new(502), 1)
        .await;
    fixture.mount_measure(DENVER, usage_reached(), 1).await;

    let ratelimit = Duration::from_millis(300);
    let mut seen = Vec::new();
    let started = Instant::now();
    let result = fixture
        .dataset()
        .get_all_data_with("pressure", ratelimit, |fetch, _, _| {
            seen.push((fetch.station_id.clone(), fetch.is_failed()))
        })
        .await;

    assert!(matches!(
        result,
        Err(AppError::Api(ApiError::RateLimitExceeded { .. }))
    ));
    assert!(started.elapsed() >= ratelimit * 2);
    assert_eq!(
        seen,
        vec![(NEW_YORK.to_string(), true), (CHICAGO.to_string(), false)]
    );
}

#[tokio::test]
async fn test_single_failed_fetch_still_pauses() {
    let fixture = Fixture::start().await;
    fixture.seed(STATIONS_FILE, &stations_body().to_string());
    fixture.mount_token(1).await;
    fixture.mount_measure(DENVER, usage_reached(), 1).await;

    let ratelimit = Duration::from_millis(300);
    let started = Instant::now();
    let result = fixture
        .dataset()
        .get_data(DENVER, "pressure", Some(ratelimit))
        .await;

    assert!(result.is_err());
    assert!(started.elapsed() >= ratelimit);
}

#[tokio::test]
async fn test_rerun_downloads_only_missing_series() {
    let fixture = Fixture::start().await;
    fixture.mount_token(2).await;
    fixture.mount_stations(1).await;
    fixture.mount_measure(NEW_YORK, ok(pressure_body()), 1).await;
    Mock::given(method("POST"))
        .and(path("/api/getmeasure"))
        .and(wiremock::matchers::body_string_contains("device_id=70%3Aee%3A50%3A00%3A00%3A03"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&fixture.server)
        .await;
    fixture.mount_measure(DENVER, ok(pressure_body()), 1).await;

    let first = fixture
        .dataset()
        .get_all_data_with("pressure", FAST, |_, _, _| {})
        .await
        .unwrap();
    assert_eq!(first.failed_count(), 1);

    let second = fixture
        .dataset()
        .get_all_data_with("pressure", FAST, |_, _, _| {})
        .await
        .unwrap();

    assert_eq!(second.failed_count(), 0);
    assert_eq!(second.data_count(), 2);
    let sources: Vec<_> = second
        .with_data()
        .filter_map(|fetch| fetch.series().map(|series| series.source))
        .collect();
    assert_eq!(sources, vec![SeriesSource::Cache, SeriesSource::Network]);
}

#[tokio::test]
async fn test_bulk_run_aborts_when_authorization_fails() {
    let fixture = Fixture::start().await;
    fixture.seed(STATIONS_FILE, &stations_body().to_string());
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "refresh token revoked"
        })))
        .expect(1)
        .mount(&fixture.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/getmeasure"))
        .respond_with(ok(pressure_body()))
        .expect(0)
        .mount(&fixture.server)
        .await;

    let mut calls = 0;
    let result = fixture
        .dataset()
        .get_all_data_with("pressure", FAST, |_, _, _| calls += 1)
        .await;

    assert!(matches!(result, Err(AppError::Auth(_))));
    assert_eq!(calls, 0);
    assert_eq!(std::fs::read_dir(fixture.dataset_dir()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_fully_cached_bulk_run_never_authorizes() {
    let fixture = Fixture::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&fixture.server)
        .await;
    fixture.seed(STATIONS_FILE, &stations_body().to_string());
    for station in [NEW_YORK, DENVER] {
        fixture.seed(
            &series_file(station, station, "pressure"),
            &pressure_body().to_string(),
        );
    }

    let mut dataset = fixture.dataset();
    let report = dataset
        .get_all_data_with("pressure", Duration::from_secs(8), |_, _, _| {})
        .await
        .unwrap();

    assert_eq!(report.data_count(), 2);
    assert_eq!(report.downloaded_count(), 0);
    assert!(!dataset.is_authorized());
    assert!(report
        .iter()
        .all(|fetch| !matches!(fetch.outcome, FetchOutcome::Failed(_))));
}

#[tokio::test]
async fn test_bulk_report_exports_one_csv_per_station_with_data() {
    let fixture = Fixture::start().await;
    fixture.seed(STATIONS_FILE, &stations_body().to_string());
    fixture.seed(
        &series_file(NEW_YORK, NEW_YORK, "pressure"),
        &pressure_body().to_string(),
    );
    fixture.seed(&series_file(DENVER, DENVER, "pressure"), "[]");

    let report = fixture
        .dataset()
        .get_all_data_with("pressure", FAST, |_, _, _| {})
        .await
        .unwrap();

    let out = fixture.cache.path().join("csv");
    let written = export_report(&report, &out).unwrap();

    assert_eq!(written, vec![out.join("Lon-74Lat40.csv")]);
    let contents = std::fs::read_to_string(&written[0]).unwrap();
    let lines: Vec<_> = contents.lines().collect();
    assert_eq!(lines[0], "time,pressure");
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("2022-01-15 00:00:00"));
    assert!(lines[1].ends_with(",1013.2"));
}
