//! # Sea Level Pipeline
//!
//! Runs one `(station, year)` request end to end:
//!
//! ```text
//! Idle → Chunking → Fetching (×N chunks) → Assembling → Deriving → Done
//!                         │                     │
//!                         └──── Failed ◄────────┘
//! ```
//!
//! Chunks are fetched strictly one after another, in chunk order. Nothing
//! outlives the call: every run builds its own series and metrics.
//!
//! ## Failure Handling
//! - Transport errors abort the run under [`TransportPolicy::Abort`] and are
//!   returned unchanged. Under [`TransportPolicy::SkipChunk`] the chunk is
//!   dropped and the run fails only when no chunk could be fetched.
//! - Error envelopes and unknown payloads count as empty chunks. If no chunk
//!   produced a `data` array at all, the run reports
//!   [`TideError::MalformedResponse`] instead of [`TideError::NoData`].

use crate::assembler::assemble;
use crate::chunker::{year_chunks, DEFAULT_MAX_SPAN_DAYS};
use crate::config::{AnalysisConfig, NoaaConfig, TransportPolicy};
use crate::metrics::{DerivedMetrics, DEFAULT_WINDOW};
use crate::tide_data::{ChunkPayload, TideError, TideSource};
use crate::TideSeries;
use log::{debug, info, warn};
use serde::Serialize;

/// What to fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeaLevelRequest {
    pub station_id: String,
    pub year: i32,
}

impl SeaLevelRequest {
    pub fn new(station_id: impl Into<String>, year: i32) -> Self {
        SeaLevelRequest {
            station_id: station_id.into(),
            year,
        }
    }
}

/// How to fetch and derive.
#[derive(Clone, Debug)]
pub struct PipelineOptions {
    pub max_span_days: u32,
    pub window: usize,
    pub transport_policy: TransportPolicy,
    pub skip_timed_out_chunks: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            max_span_days: DEFAULT_MAX_SPAN_DAYS,
            window: DEFAULT_WINDOW,
            transport_policy: TransportPolicy::Abort,
            skip_timed_out_chunks: false,
        }
    }
}

impl PipelineOptions {
    pub fn from_config(noaa: &NoaaConfig, analysis: &AnalysisConfig) -> Self {
        PipelineOptions {
            max_span_days: noaa.max_span_days,
            window: analysis.rolling_window,
            transport_policy: noaa.transport_policy,
            skip_timed_out_chunks: noaa.skip_timed_out_chunks,
        }
    }

    fn skips(&self, error: &TideError) -> bool {
        match error {
            TideError::Transport { timed_out, .. } => {
                self.transport_policy == TransportPolicy::SkipChunk
                    || (*timed_out && self.skip_timed_out_chunks)
            }
            _ => false,
        }
    }
}

/// Output of a successful run, ready for a renderer.
#[derive(Clone, Debug, Serialize)]
pub struct SeaLevelReport {
    pub series: TideSeries,
    pub metrics: DerivedMetrics,
    /// Number of chunk requests issued
    pub chunks_requested: usize,
    /// Chunks dropped after a transport failure
    pub chunks_skipped: usize,
}

/// Fetch, assemble and derive one year of water levels.
pub async fn run<S: TideSource>(
    source: &S,
    request: &SeaLevelRequest,
    options: &PipelineOptions,
) -> Result<SeaLevelReport, TideError> {
    let SeaLevelRequest { station_id, year } = request;

    if options.window == 0 {
        return Err(TideError::InvalidWindow);
    }

    debug!("Chunking {} for station {}", year, station_id);
    let chunks = year_chunks(*year, options.max_span_days)?;

    let mut batches = Vec::with_capacity(chunks.len());
    let mut answered = 0;
    let mut refused = 0;
    let mut first_refusal: Option<String> = None;
    let mut skipped = 0;
    let mut last_failure: Option<TideError> = None;

    for (index, chunk) in chunks.iter().enumerate() {
        debug!(
            "Fetching chunk {}/{}: {} ({} days)",
            index + 1,
            chunks.len(),
            chunk,
            chunk.span_days() + 1
        );
        match source.fetch_chunk(station_id, chunk).await {
            Ok(ChunkPayload::Records(records)) => {
                debug!("Chunk {} returned {} records", chunk, records.len());
                answered += 1;
                batches.push(records);
            }
            Ok(ChunkPayload::UpstreamError(message)) => {
                warn!("NOAA refused chunk {}: {}", chunk, message);
                refused += 1;
                first_refusal.get_or_insert(message);
            }
            Ok(ChunkPayload::Unrecognized) => {
                warn!("Unrecognized payload for chunk {}, treating as empty", chunk);
                refused += 1;
            }
            Err(error) if options.skips(&error) => {
                warn!("Skipping chunk {} after transport failure: {}", chunk, error);
                skipped += 1;
                last_failure = Some(error);
            }
            Err(error) => {
                warn!("Aborting station {} {}: chunk {} failed", station_id, year, chunk);
                return Err(error);
            }
        }
    }

    if skipped == chunks.len() {
        if let Some(error) = last_failure {
            return Err(error);
        }
    }

    debug!("Assembling {} batches", batches.len());
    let series = match assemble(station_id, *year, batches) {
        Err(TideError::NoData { .. }) if answered == 0 && refused > 0 => {
            return Err(TideError::MalformedResponse(first_refusal.unwrap_or_else(
                || "response did not contain a data array".to_string(),
            )));
        }
        result => result?,
    };

    debug!("Deriving metrics over {} samples", series.len());
    let metrics = DerivedMetrics::compute(&series, options.window)?;

    info!(
        "Station {} {}: {} samples from {} chunks ({} skipped, {} records dropped)",
        station_id,
        year,
        series.len(),
        chunks.len(),
        skipped,
        series.skipped_records
    );

    Ok(SeaLevelReport {
        series,
        metrics,
        chunks_requested: chunks.len(),
        chunks_skipped: skipped,
    })
}
