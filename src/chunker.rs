//! # Date Range Chunking
//!
//! The NOAA data getter refuses 6-minute water-level requests that span more
//! than about a month, so a calendar year is fetched as a sequence of bounded
//! windows. This module produces those windows.

use crate::tide_data::TideError;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::fmt;

/// Largest span, in days, between a chunk's first and last date.
pub const DEFAULT_MAX_SPAN_DAYS: u32 = 30;

/// Oldest year accepted by [`year_chunks`].
pub const MIN_YEAR: i32 = 1850;

/// Latest year accepted by [`year_chunks`].
pub const MAX_YEAR: i32 = 2100;

/// Inclusive calendar date range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TideError> {
        if start > end {
            return Err(TideError::InvalidRange(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(DateRange { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Days between `start` and `end` (0 for a single-day range).
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// `begin_date` query value (`YYYYMMDD`).
    pub fn begin_param(&self) -> String {
        self.start.format("%Y%m%d").to_string()
    }

    /// `end_date` query value (`YYYYMMDD`).
    pub fn end_param(&self) -> String {
        self.end.format("%Y%m%d").to_string()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Split `range` into consecutive chunks whose span is at most `max_span_days`.
///
/// Chunks are returned in ascending order, cover every date of `range`
/// exactly once, and only the last one may be shorter than the maximum.
pub fn chunk_range(range: DateRange, max_span_days: u32) -> Vec<DateRange> {
    let span = Duration::days(i64::from(max_span_days));
    let mut chunks = Vec::new();
    let mut start = range.start;

    loop {
        let end = match start.checked_add_signed(span) {
            Some(candidate) if candidate < range.end => candidate,
            _ => range.end,
        };
        chunks.push(DateRange { start, end });

        match end.succ_opt() {
            Some(next) if end < range.end => start = next,
            _ => break,
        }
    }

    chunks
}

/// Chunks covering Jan 1 – Dec 31 of `year`.
///
/// With the default 30-day span this yields 12 chunks for every year.
pub fn year_chunks(year: i32, max_span_days: u32) -> Result<Vec<DateRange>, TideError> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(TideError::InvalidRange(format!(
            "year {year} is outside {MIN_YEAR}..={MAX_YEAR}"
        )));
    }

    let start = NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| TideError::InvalidRange(format!("no January 1st in {year}")))?;
    let end = NaiveDate::from_ymd_opt(year, 12, 31)
        .ok_or_else(|| TideError::InvalidRange(format!("no December 31st in {year}")))?;

    Ok(chunk_range(DateRange::new(start, end)?, max_span_days))
}
