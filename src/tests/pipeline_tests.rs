//! # End-to-End Pipeline Tests
//!
//! These tests drive [`pipeline::run`] with a scripted in-memory source so the
//! whole chunk → fetch → assemble → derive sequence runs without a network.

use std::cell::RefCell;
use std::io;

use chrono::{Duration, NaiveDate};

use crate::chunker::DateRange;
use crate::config::TransportPolicy;
use crate::pipeline::{self, PipelineOptions, SeaLevelRequest};
use crate::tide_data::{ChunkPayload, RawRecord, TideError, TideSource};

type Responder = dyn Fn(usize, &DateRange) -> Result<ChunkPayload, TideError>;

/// Answers each chunk request from a closure and records what was asked.
struct ScriptedSource {
    respond: Box<Responder>,
    requested: RefCell<Vec<(String, DateRange)>>,
}

impl ScriptedSource {
    fn new(respond: impl Fn(usize, &DateRange) -> Result<ChunkPayload, TideError> + 'static) -> Self {
        ScriptedSource {
            respond: Box::new(respond),
            requested: RefCell::new(Vec::new()),
        }
    }

    fn requested_ranges(&self) -> Vec<DateRange> {
        self.requested.borrow().iter().map(|(_, r)| *r).collect()
    }
}

impl TideSource for ScriptedSource {
    async fn fetch_chunk(
        &self,
        station_id: &str,
        range: &DateRange,
    ) -> Result<ChunkPayload, TideError> {
        let index = self.requested.borrow().len();
        self.requested
            .borrow_mut()
            .push((station_id.to_string(), *range));
        (self.respond)(index, range)
    }
}

/// `count` daily records starting at the chunk's first date.
fn daily_records(range: &DateRange, count: usize, level: f64) -> Vec<RawRecord> {
    (0..count)
        .map(|day| {
            let date = range.start() + Duration::days(day as i64);
            RawRecord::new(format!("{} 12:00", date.format("%Y-%m-%d")), level.to_string())
        })
        .collect()
}

fn connection_refused() -> TideError {
    TideError::Transport {
        url: "https://api.tidesandcurrents.noaa.gov/api/prod/datagetter".to_string(),
        timed_out: false,
        source: Box::new(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "connection refused",
        )),
    }
}

fn timed_out() -> TideError {
    TideError::Transport {
        url: "https://api.tidesandcurrents.noaa.gov/api/prod/datagetter".to_string(),
        timed_out: true,
        source: Box::new(io::Error::new(io::ErrorKind::TimedOut, "operation timed out")),
    }
}

fn battery_2014() -> SeaLevelRequest {
    SeaLevelRequest::new("8518750", 2014)
}

/// Twelve chunks of thirty constant daily samples give a flat 360-sample year.
#[tokio::test]
async fn constant_year_assembles_and_derives() {
    let source = ScriptedSource::new(|_, range| {
        Ok(ChunkPayload::Records(daily_records(range, 30, 1.5)))
    });

    let report = pipeline::run(&source, &battery_2014(), &PipelineOptions::default())
        .await
        .expect("pipeline should succeed");

    assert_eq!(report.chunks_requested, 12);
    assert_eq!(report.chunks_skipped, 0);
    assert_eq!(report.series.len(), 360);
    assert_eq!(report.metrics.rolling_average.len(), 360);
    assert!(report
        .metrics
        .rolling_average
        .iter()
        .all(|&avg| (avg - 1.5).abs() < 1e-9));

    let first = report.series.samples[0];
    assert_eq!(report.metrics.max_sample, first);
    assert_eq!(report.metrics.min_sample, first);
    assert_eq!(
        first.timestamp.date_naive(),
        NaiveDate::from_ymd_opt(2014, 1, 1).unwrap()
    );
}

/// Requests go out in ascending chunk order for the requested station.
#[tokio::test]
async fn chunks_are_fetched_in_order() {
    let source = ScriptedSource::new(|_, range| Ok(ChunkPayload::Records(daily_records(range, 1, 0.2))));

    pipeline::run(&source, &battery_2014(), &PipelineOptions::default())
        .await
        .unwrap();

    let ranges = source.requested_ranges();
    assert_eq!(ranges.len(), 12);
    assert!(ranges.windows(2).all(|w| w[0].end() < w[1].start()));
    assert!(source
        .requested
        .borrow()
        .iter()
        .all(|(station, _)| station == "8518750"));
}

/// The series length is the sum of valid records, in chunk order.
#[tokio::test]
async fn series_concatenates_valid_records() {
    let source = ScriptedSource::new(|index, range| {
        let mut records = daily_records(range, index + 1, index as f64 * 0.1);
        records.push(RawRecord::new(
            format!("{} 18:00", range.start().format("%Y-%m-%d")),
            "",
        ));
        Ok(ChunkPayload::Records(records))
    });

    let report = pipeline::run(&source, &battery_2014(), &PipelineOptions::default())
        .await
        .unwrap();

    // 1 + 2 + ... + 12 valid records, one blank level per chunk
    assert_eq!(report.series.len(), 78);
    assert_eq!(report.series.skipped_records, 12);
    assert!(report
        .series
        .samples
        .windows(2)
        .all(|w| w[0].timestamp <= w[1].timestamp));

    let max = report.metrics.max_sample;
    assert!(report.series.samples.iter().all(|s| s.water_level <= max.water_level));
    assert!((max.water_level - 1.1).abs() < 1e-9);
}

/// Every chunk empty: a NoData outcome, not a crash.
#[tokio::test]
async fn all_empty_chunks_report_no_data() {
    let source = ScriptedSource::new(|_, _| Ok(ChunkPayload::Records(Vec::new())));

    let result = pipeline::run(&source, &battery_2014(), &PipelineOptions::default()).await;

    match result {
        Err(TideError::NoData { station, year }) => {
            assert_eq!(station, "8518750");
            assert_eq!(year, 2014);
        }
        other => panic!("expected NoData, got {:?}", other),
    }
}

/// One failing chunk under the default policy aborts with that very error.
#[tokio::test]
async fn transport_error_aborts_by_default() {
    let source = ScriptedSource::new(|index, range| {
        if index == 4 {
            Err(connection_refused())
        } else {
            Ok(ChunkPayload::Records(daily_records(range, 30, 0.5)))
        }
    });

    let result = pipeline::run(&source, &battery_2014(), &PipelineOptions::default()).await;

    match result {
        Err(TideError::Transport { url, timed_out, source: cause }) => {
            assert_eq!(url, "https://api.tidesandcurrents.noaa.gov/api/prod/datagetter");
            assert!(!timed_out);
            assert_eq!(cause.to_string(), "connection refused");
        }
        other => panic!("expected transport error, got {:?}", other),
    }
    // nothing after the failing chunk is requested
    assert_eq!(source.requested_ranges().len(), 5);
}

/// Skip policy keeps the surviving chunks.
#[tokio::test]
async fn skip_policy_drops_failed_chunk() {
    let source = ScriptedSource::new(|index, range| {
        if index == 4 {
            Err(connection_refused())
        } else {
            Ok(ChunkPayload::Records(daily_records(range, 30, 0.5)))
        }
    });
    let options = PipelineOptions {
        transport_policy: TransportPolicy::SkipChunk,
        ..PipelineOptions::default()
    };

    let report = pipeline::run(&source, &battery_2014(), &options).await.unwrap();

    assert_eq!(report.chunks_requested, 12);
    assert_eq!(report.chunks_skipped, 1);
    assert_eq!(report.series.len(), 330);
}

/// Skip policy still fails when nothing could be fetched.
#[tokio::test]
async fn skip_policy_fails_when_every_chunk_fails() {
    let source = ScriptedSource::new(|_, _| Err(connection_refused()));
    let options = PipelineOptions {
        transport_policy: TransportPolicy::SkipChunk,
        ..PipelineOptions::default()
    };

    let result = pipeline::run(&source, &battery_2014(), &options).await;

    assert!(matches!(result, Err(TideError::Transport { .. })));
    assert_eq!(source.requested_ranges().len(), 12);
}

/// Timeouts can be skipped while other transport errors still abort.
#[tokio::test]
async fn timed_out_chunks_skipped_when_enabled() {
    let source = ScriptedSource::new(|index, range| match index {
        2 => Err(timed_out()),
        _ => Ok(ChunkPayload::Records(daily_records(range, 10, 0.1))),
    });
    let options = PipelineOptions {
        skip_timed_out_chunks: true,
        ..PipelineOptions::default()
    };

    let report = pipeline::run(&source, &battery_2014(), &options).await.unwrap();
    assert_eq!(report.chunks_skipped, 1);
    assert_eq!(report.series.len(), 110);

    let strict = ScriptedSource::new(|index, range| match index {
        2 => Err(timed_out()),
        _ => Ok(ChunkPayload::Records(daily_records(range, 10, 0.1))),
    });
    let result = pipeline::run(&strict, &battery_2014(), &PipelineOptions::default()).await;
    assert!(matches!(result, Err(ref e) if e.is_timeout()));
}

/// Error envelopes on some chunks are skipped silently.
#[tokio::test]
async fn error_envelope_chunks_count_as_empty() {
    let source = ScriptedSource::new(|index, range| {
        if index % 2 == 0 {
            Ok(ChunkPayload::UpstreamError("No data was found.".to_string()))
        } else {
            Ok(ChunkPayload::Records(daily_records(range, 5, -0.3)))
        }
    });

    let report = pipeline::run(&source, &battery_2014(), &PipelineOptions::default())
        .await
        .unwrap();
    assert_eq!(report.series.len(), 30);
}

/// Only refusals: the upstream message is surfaced, distinct from NoData.
#[tokio::test]
async fn only_refusals_report_malformed_response() {
    let source = ScriptedSource::new(|index, _| {
        if index == 0 {
            Ok(ChunkPayload::Unrecognized)
        } else {
            Ok(ChunkPayload::UpstreamError(
                "Wrong Station ID: Check Station ID.".to_string(),
            ))
        }
    });

    let result = pipeline::run(&source, &battery_2014(), &PipelineOptions::default()).await;

    match result {
        Err(TideError::MalformedResponse(message)) => {
            assert_eq!(message, "Wrong Station ID: Check Station ID.")
        }
        other => panic!("expected malformed response, got {:?}", other),
    }
}

/// Invalid input fails before any request is made.
#[tokio::test]
async fn invalid_input_fails_before_fetching() {
    let source = ScriptedSource::new(|_, _| Ok(ChunkPayload::Records(Vec::new())));

    let result = pipeline::run(
        &source,
        &SeaLevelRequest::new("8518750", 1066),
        &PipelineOptions::default(),
    )
    .await;
    assert!(matches!(result, Err(TideError::InvalidRange(_))));

    let options = PipelineOptions {
        window: 0,
        ..PipelineOptions::default()
    };
    let result = pipeline::run(&source, &battery_2014(), &options).await;
    assert!(matches!(result, Err(TideError::InvalidWindow)));

    assert!(source.requested_ranges().is_empty());
}

/// A trailing window larger than one sample smooths a step.
#[tokio::test]
async fn rolling_average_follows_window() {
    let source = ScriptedSource::new(|index, range| {
        let level = if index < 6 { 0.0 } else { 1.0 };
        Ok(ChunkPayload::Records(daily_records(range, 30, level)))
    });
    let options = PipelineOptions {
        window: 4,
        ..PipelineOptions::default()
    };

    let report = pipeline::run(&source, &battery_2014(), &options).await.unwrap();
    let avg = &report.metrics.rolling_average;

    // step happens at sample 180
    assert_eq!(avg[179], 0.0);
    assert!((avg[180] - 0.25).abs() < 1e-9);
    assert!((avg[181] - 0.5).abs() < 1e-9);
    assert!((avg[182] - 0.75).abs() < 1e-9);
    assert!((avg[183] - 1.0).abs() < 1e-9);
    assert_eq!(report.metrics.window, 4);
    assert_eq!(report.metrics.min_sample, report.series.samples[0]);
    assert_eq!(report.metrics.max_sample, report.series.samples[180]);
}
