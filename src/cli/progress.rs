//! Progress display for bulk station fetches
//!
//! A single indicatif bar advances once per station. The message shows the
//! last station and its outcome; the running data/no-data/failed tally is
//! kept in the prefix. Nothing is drawn when stderr is not a terminal or
//! the display is disabled.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::app::{FetchOutcome, StationFetch};

const TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {prefix} {msg}";

/// Running counts shown next to the bar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressTally {
    pub data: usize,
    pub no_data: usize,
    pub failed: usize,
}

impl ProgressTally {
    pub fn record(&mut self, outcome: &FetchOutcome) {
        match outcome {
            FetchOutcome::Data(_) => self.data += 1,
            FetchOutcome::NoData(_) => self.no_data += 1,
            FetchOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} with data, {} without, {} failed",
            self.data, self.no_data, self.failed
        )
    }
}

/// Progress bar over the stations of a bulk fetch
pub struct ProgressDisplay {
    bar: ProgressBar,
    tally: ProgressTally,
}

impl ProgressDisplay {
    /// Create a display for `total` stations
    pub fn new(total: usize, enabled: bool) -> Self {
        let bar = if enabled {
            ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr())
        } else {
            ProgressBar::hidden()
        };

        // Template is a constant; fall back to the default style if it is rejected
        let style = ProgressStyle::default_bar()
            .template(TEMPLATE)
            .map(|style| style.progress_chars("##-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_length(total as u64);
        bar.enable_steady_tick(Duration::from_millis(200));

        Self {
            bar,
            tally: ProgressTally::default(),
        }
    }

    /// Record one finished station
    pub fn station_done(&mut self, fetch: &StationFetch, position: usize) {
        self.tally.record(&fetch.outcome);

        let status = match &fetch.outcome {
            FetchOutcome::Data(series) => format!("{} samples", series.len()),
            FetchOutcome::NoData(_) => "no data".to_string(),
            FetchOutcome::Failed(_) => "failed".to_string(),
        };

        self.bar.set_prefix(self.tally.summary());
        self.bar.set_message(format!("{}: {}", fetch.station_id, status));
        self.bar.set_position(position as u64);
    }

    pub fn tally(&self) -> ProgressTally {
        self.tally
    }

    /// Clear the bar and return the final tally
    pub fn finish(self) -> ProgressTally {
        self.bar.finish_and_clear();
        self.tally
    }
}
