//! CSV export of bulk results
//!
//! Every station with data gets one file named after its coordinates,
//! `Lon{longitude}Lat{latitude}.csv`, holding a `time,{type}` header and one
//! row per sample. Times are written as `YYYY-MM-DD HH:MM:SS+00:00`; missing
//! values are left empty.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::app::dataset::{BulkReport, StationFetch};
use crate::app::models::{Degrees, Series};
use crate::errors::ExportError;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

/// File name for a station at the given coordinates
///
/// Coordinates are written as the payload had them, so an integer location
/// gives `Lon-74Lat40.csv` and a decimal one `Lon-73.98Lat40.75.csv`.
pub fn csv_file_name(longitude: &Degrees, latitude: &Degrees) -> String {
    format!("Lon{}Lat{}.csv", longitude, latitude)
}

/// Writes one CSV file per station with data into `output_dir`
///
/// Returns the paths written, in report order.
///
/// # Errors
///
/// Returns `ExportError` if the directory cannot be created or a file cannot
/// be written
pub fn export_report(report: &BulkReport, output_dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    fs::create_dir_all(output_dir).map_err(|source| ExportError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(report.data_count());
    for fetch in report.with_data() {
        if let Some(path) = export_station(fetch, &report.measurement_type, output_dir)? {
            written.push(path);
        }
    }

    info!(
        "Exported {} stations to {}",
        written.len(),
        output_dir.display()
    );
    Ok(written)
}

fn export_station(
    fetch: &StationFetch,
    measurement_type: &str,
    output_dir: &Path,
) -> Result<Option<PathBuf>, ExportError> {
    let Some(series) = fetch.series() else {
        return Ok(None);
    };

    let path = output_dir.join(csv_file_name(&fetch.longitude, &fetch.latitude));
    write_series(&path, measurement_type, series)?;
    info!("Saved {}", path.display());
    Ok(Some(path))
}

/// Writes a single series as CSV
///
/// # Errors
///
/// Returns `ExportError::Csv` on any write failure
pub fn write_series(path: &Path, measurement_type: &str, series: &Series) -> Result<(), ExportError> {
    let csv_error = |source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    writer
        .write_record(["time", measurement_type])
        .map_err(csv_error)?;

    let mut skipped = 0usize;
    for (time, value) in series.points() {
        let Some(timestamp) = chrono::DateTime::from_timestamp(time, 0) else {
            skipped += 1;
            continue;
        };
        let value = if value.is_nan() {
            String::new()
        } else {
            value.to_string()
        };
        writer
            .write_record([timestamp.format(TIME_FORMAT).to_string(), value])
            .map_err(csv_error)?;
    }

    if skipped > 0 {
        debug!("Skipped {} out-of-range timestamps in {}", skipped, path.display());
    }

    writer
        .flush()
        .map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })
}
