//! Per-station results of a bulk retrieval

use crate::app::models::{Degrees, Series, SeriesSource};

/// What a bulk run got for one station
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Non-empty series
    Data(Series),
    /// Nothing to report; the source says whether the station lacks the
    /// sensor or the API returned no samples for the range
    NoData(SeriesSource),
    /// The fetch for this station failed; other stations are unaffected
    Failed(String),
}

/// One station's entry in a [`BulkReport`]
#[derive(Debug, Clone, PartialEq)]
pub struct StationFetch {
    pub station_id: String,
    pub longitude: Degrees,
    pub latitude: Degrees,
    pub outcome: FetchOutcome,
}

impl StationFetch {
    pub fn series(&self) -> Option<&Series> {
        match &self.outcome {
            FetchOutcome::Data(series) => Some(series),
            _ => None,
        }
    }

    pub fn has_data(&self) -> bool {
        matches!(self.outcome, FetchOutcome::Data(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, FetchOutcome::Failed(_))
    }

    /// Whether the series was downloaded during this run
    pub fn was_downloaded(&self) -> bool {
        matches!(
            self.outcome,
            FetchOutcome::Data(Series {
                source: SeriesSource::Network,
                ..
            }) | FetchOutcome::NoData(SeriesSource::Network)
        )
    }
}

/// Results of fetching one measurement type from every station, in catalog
/// order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkReport {
    pub measurement_type: String,
    pub fetches: Vec<StationFetch>,
}

impl BulkReport {
    pub fn new(measurement_type: impl Into<String>) -> Self {
        Self {
            measurement_type: measurement_type.into(),
            fetches: Vec::new(),
        }
    }

    pub fn push(&mut self, fetch: StationFetch) {
        self.fetches.push(fetch);
    }

    pub fn len(&self) -> usize {
        self.fetches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetches.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StationFetch> {
        self.fetches.iter()
    }

    /// Stations that returned samples
    pub fn with_data(&self) -> impl Iterator<Item = &StationFetch> {
        self.fetches.iter().filter(|fetch| fetch.has_data())
    }

    /// Stations that returned nothing, failures included
    pub fn without_data(&self) -> impl Iterator<Item = &StationFetch> {
        self.fetches.iter().filter(|fetch| !fetch.has_data())
    }

    pub fn failures(&self) -> impl Iterator<Item = &StationFetch> {
        self.fetches.iter().filter(|fetch| fetch.is_failed())
    }

    pub fn data_count(&self) -> usize {
        self.with_data().count()
    }

    pub fn no_data_count(&self) -> usize {
        self.fetches
            .iter()
            .filter(|fetch| matches!(fetch.outcome, FetchOutcome::NoData(_)))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    pub fn downloaded_count(&self) -> usize {
        self.fetches.iter().filter(|fetch| fetch.was_downloaded()).count()
    }
}

impl From<Series> for FetchOutcome {
    fn from(series: Series) -> Self {
        if series.is_empty() {
            FetchOutcome::NoData(series.source)
        } else {
            FetchOutcome::Data(series)
        }
    }
}
