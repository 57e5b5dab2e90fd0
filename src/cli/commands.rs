//! Command handlers for Netatmo Fetcher CLI
//!
//! This module implements the command handlers that connect CLI arguments
//! to the download session, export and credential management.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::app::{
    export_report, BulkReport, Dataset, FetchOutcome, NetatmoClient, Series, SeriesSource,
    Station, StationFetch,
};
use crate::auth::{clear_credentials, setup_credentials, show_auth_status, verify_credentials};
use crate::cli::args::{
    is_known_measurement_type, AuthAction, AuthArgs, ConfigAction, ConfigArgs, ExportArgs,
    FetchArgs, GlobalArgs, StationsArgs,
};
use crate::cli::progress::ProgressDisplay;
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Apply command-line overrides to the loaded configuration
pub fn apply_overrides(config: &mut AppConfig, global: &GlobalArgs) {
    if let Some(name) = &global.name {
        config.dataset.name = name.clone();
    }
    if let Some(cache_dir) = &global.cache_dir {
        config.cache.root = Some(cache_dir.clone());
    }
}

fn build_client(config: &AppConfig) -> Result<NetatmoClient> {
    Ok(NetatmoClient::with_config(config.client.to_runtime_config())?)
}

fn build_dataset(config: &AppConfig) -> Result<Dataset> {
    config.validate()?;
    let client = build_client(config)?;
    let dataset = Dataset::new(client, config.to_dataset_config());
    info!(
        "Dataset '{}' caching to {}",
        dataset.name(),
        dataset.store().dir().display()
    );
    Ok(dataset)
}

fn check_measurement_type(measurement_type: &str) {
    if !is_known_measurement_type(measurement_type) {
        warn!(
            "'{}' is not a measurement type public stations usually report",
            measurement_type
        );
    }
}

/// Handle the stations command
pub async fn handle_stations(args: StationsArgs, config: &AppConfig) -> Result<()> {
    let mut dataset = build_dataset(config)?;
    let stations = dataset.get_stations(!args.no_filter).await?;

    println!("Stations in dataset '{}'", config.dataset.name);
    println!("========================");
    println!();
    println!("{:<20} {:>10} {:>10}  {:<20} {}", "ID", "Lon", "Lat", "City", "Measures");

    let shown = args.limit.unwrap_or(stations.len()).min(stations.len());
    for station in &stations[..shown] {
        println!(
            "{:<20} {:>10.4} {:>10.4}  {:<20} {}",
            station.id,
            station.longitude(),
            station.latitude(),
            station.place.city.as_deref().unwrap_or("-"),
            measure_summary(station)
        );
    }

    if shown < stations.len() {
        println!("... and {} more", stations.len() - shown);
    }
    println!();
    println!("Total: {} stations", stations.len());
    Ok(())
}

fn measure_summary(station: &Station) -> String {
    let mut types: Vec<&str> = station
        .measures
        .iter()
        .flat_map(|(_, descriptor)| descriptor.types.iter().map(String::as_str))
        .collect();
    types.sort_unstable();
    types.dedup();
    if types.is_empty() {
        "-".to_string()
    } else {
        types.join(",")
    }
}

/// Handle the fetch command
pub async fn handle_fetch(args: FetchArgs, config: &AppConfig, quiet: bool) -> Result<()> {
    check_measurement_type(&args.measurement_type);
    let mut dataset = build_dataset(config)?;

    match &args.station {
        Some(station_id) => {
            let series = dataset
                .get_data(station_id, &args.measurement_type, args.ratelimit)
                .await?;
            print_series(station_id, &args.measurement_type, &series);
        }
        None => {
            let ratelimit = args.ratelimit.unwrap_or(config.fetch.ratelimit);
            let report = run_bulk(&mut dataset, config, &args.measurement_type, ratelimit, quiet).await?;
            print_report(&report);
        }
    }
    Ok(())
}

/// Handle the export command
pub async fn handle_export(args: ExportArgs, config: &AppConfig, quiet: bool) -> Result<()> {
    check_measurement_type(&args.measurement_type);
    let mut dataset = build_dataset(config)?;

    let ratelimit = args.ratelimit.unwrap_or(config.fetch.ratelimit);
    let report = run_bulk(&mut dataset, config, &args.measurement_type, ratelimit, quiet).await?;
    let written = export_report(&report, &args.output)?;

    println!(
        "Exported {} of {} stations to {}",
        written.len(),
        report.len(),
        args.output.display()
    );
    if report.failed_count() > 0 {
        println!(
            "{} stations failed; run again to retry them (cached stations are not downloaded twice)",
            report.failed_count()
        );
    }
    Ok(())
}

async fn run_bulk(
    dataset: &mut Dataset,
    config: &AppConfig,
    measurement_type: &str,
    ratelimit: Duration,
    quiet: bool,
) -> Result<BulkReport> {
    let total = dataset.get_stations(config.fetch.filter_stations).await?.len();
    let start = Instant::now();

    let mut display = ProgressDisplay::new(total, !quiet);
    let report = dataset
        .get_all_data_with(measurement_type, ratelimit, |fetch, position, _| {
            display.station_done(fetch, position)
        })
        .await;
    let tally = display.finish();

    let report = report?;
    info!(
        "Bulk fetch of {} finished in {:?}: {}",
        measurement_type,
        start.elapsed(),
        tally.summary()
    );
    Ok(report)
}

fn print_series(station_id: &str, measurement_type: &str, series: &Series) {
    println!(
        "{} {} ({} samples, {:?})",
        station_id,
        measurement_type,
        series.len(),
        series.source
    );
    for (time, value) in series.datetimes() {
        println!("{}  {}", time.format("%Y-%m-%d %H:%M:%S"), value);
    }
}

fn print_report(report: &BulkReport) {
    println!();
    println!("Fetch Summary ({})", report.measurement_type);
    println!("==============");
    println!("Stations:          {}", report.len());
    println!("With data:         {}", report.data_count());
    println!("Without data:      {}", report.no_data_count());
    println!("Failed:            {}", report.failed_count());
    println!("Downloaded now:    {}", report.downloaded_count());

    print_partition("Stations with data:", report.with_data());
    print_partition("Stations without data:", report.without_data());
}

fn print_partition<'a>(title: &str, fetches: impl Iterator<Item = &'a StationFetch>) {
    let fetches: Vec<_> = fetches.collect();
    if fetches.is_empty() {
        return;
    }

    println!();
    println!("{}", title);
    for fetch in fetches {
        let detail = match &fetch.outcome {
            FetchOutcome::Data(series) => format!("{} samples", series.len()),
            FetchOutcome::NoData(SeriesSource::NoModule) => "no module".to_string(),
            FetchOutcome::NoData(_) => "empty".to_string(),
            FetchOutcome::Failed(reason) => format!("failed: {}", reason),
        };
        println!(
            "  {:<20} {:>10.4} {:>10.4}  {}",
            fetch.station_id,
            fetch.longitude.as_f64(),
            fetch.latitude.as_f64(),
            detail
        );
    }
}

/// Handle authentication commands
pub async fn handle_auth(args: AuthArgs, config: &AppConfig) -> Result<()> {
    let client = build_client(config)?;

    match args.action {
        AuthAction::Setup { force } => {
            setup_credentials(&client, force).await?;
        }
        AuthAction::Verify => {
            if verify_credentials(&client).await? {
                println!("Credentials verified successfully");
            } else {
                return Err(AppError::generic("Credential verification failed"));
            }
        }
        AuthAction::Status => {
            show_auth_status(&client).await?;
        }
        AuthAction::Clear => {
            println!("Clearing stored credentials...");
            clear_credentials()?;
        }
    }

    Ok(())
}

/// Handle configuration commands
pub async fn handle_config(
    args: ConfigArgs,
    config: &AppConfig,
    config_path: Option<PathBuf>,
) -> Result<()> {
    match args.action {
        ConfigAction::Init { force, path } => {
            let written = AppConfig::init(path.or(config_path), force).await?;
            println!("Created configuration file:");
            println!("   {}", written.display());
            println!("   You can customize settings by editing this file.");
        }
        ConfigAction::Show => {
            print!("{}", config.to_toml()?);
        }
    }
    Ok(())
}
