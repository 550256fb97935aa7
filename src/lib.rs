//! # Sea Level Tracker Core Library
//!
//! This library assembles a full calendar year of NOAA water-level observations for a
//! single tide station and derives the figures a chart needs from it.
//!
//! ## Data Flow
//! 1. **Chunk**: split Jan 1 – Dec 31 into windows the NOAA data getter accepts (≤ 30 days)
//! 2. **Fetch**: request each window in order, one HTTP call per chunk
//! 3. **Assemble**: concatenate the chunk payloads into one chronological series
//! 4. **Derive**: trailing rolling mean plus the highest and lowest samples
//! 5. **Render**: hand the report to a chart layer (the CLI draws it as ASCII)
//!
//! Nothing is cached between requests; every run owns its own series.
//!
//! Alongside the tide pipeline, [`weather`] and [`news`] wrap the OpenWeatherMap
//! and GNews lookups and [`season`] classifies the season for a latitude.
//!
//! ## Core Types
//! - [`TideSample`]: one water-level observation
//! - [`TideSeries`]: the ordered observations for one station and year

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod assembler;
pub mod chunker;
pub mod config;
pub mod metrics;
pub mod news;
pub mod pipeline;
pub mod renderer;
pub mod season;
pub mod tide_data;
pub mod weather;

#[cfg(test)]
mod tests;

/// A single water-level observation.
///
/// Levels are reported in metres relative to Mean Sea Level (MSL), with
/// timestamps in GMT as the NOAA data getter returns them.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use sea_level_lib::TideSample;
///
/// let sample = TideSample {
///     timestamp: Utc.with_ymd_and_hms(2014, 1, 1, 0, 6, 0).unwrap(),
///     water_level: -0.412,
/// };
/// assert!(sample.water_level < 0.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TideSample {
    /// Observation time (GMT)
    pub timestamp: DateTime<Utc>,
    /// Water level in metres above MSL
    pub water_level: f64,
}

/// Ordered water-level observations for one station and year.
///
/// Samples are kept in the order the chunks were fetched, which is
/// chronological because the chunks are. Duplicate timestamps are not
/// removed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TideSeries {
    /// NOAA station the samples came from
    pub station_id: String,
    /// Calendar year requested
    pub year: i32,
    /// Observations, non-decreasing by timestamp
    pub samples: Vec<TideSample>,
    /// Records dropped during assembly because they did not parse
    pub skipped_records: usize,
}

impl TideSeries {
    /// Create an empty series for `station_id` and `year`.
    pub fn new(station_id: impl Into<String>, year: i32) -> Self {
        TideSeries {
            station_id: station_id.into(),
            year,
            samples: Vec::new(),
            skipped_records: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// First and last timestamps, if any samples exist.
    pub fn time_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp)),
            _ => None,
        }
    }
}
