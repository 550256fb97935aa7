//! # Series Assembly
//!
//! Concatenates per-chunk record batches into one [`TideSeries`]. Batches are
//! taken in chunk order and never re-sorted, so the chunk order is the
//! series order.

use crate::tide_data::{RawRecord, TideError};
use crate::{TideSample, TideSeries};
use chrono::NaiveDateTime;
use log::warn;

/// Timestamp layout of the data getter's `t` field (GMT).
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Parse one raw record, or `None` if either field is unusable.
pub fn parse_record(record: &RawRecord) -> Option<TideSample> {
    let timestamp = NaiveDateTime::parse_from_str(record.timestamp.trim(), TIMESTAMP_FORMAT)
        .ok()?
        .and_utc();
    let water_level: f64 = record.level.trim().parse().ok()?;

    // "NaN" parses as f64 but is not an observation
    if !water_level.is_finite() {
        return None;
    }

    Some(TideSample {
        timestamp,
        water_level,
    })
}

/// Merge record batches for `station_id`/`year` into a series.
///
/// Records that fail to parse are skipped and counted in
/// [`TideSeries::skipped_records`]. An empty result is a
/// [`TideError::NoData`].
pub fn assemble<I>(station_id: &str, year: i32, batches: I) -> Result<TideSeries, TideError>
where
    I: IntoIterator<Item = Vec<RawRecord>>,
{
    let mut series = TideSeries::new(station_id, year);

    for batch in batches {
        series.samples.reserve(batch.len());
        for record in &batch {
            match parse_record(record) {
                Some(sample) => series.samples.push(sample),
                None => {
                    warn!(
                        "Skipping unparseable record t={:?} v={:?} for station {}",
                        record.timestamp, record.level, station_id
                    );
                    series.skipped_records += 1;
                }
            }
        }
    }

    if series.is_empty() {
        return Err(TideError::NoData {
            station: station_id.to_string(),
            year,
        });
    }

    Ok(series)
}
