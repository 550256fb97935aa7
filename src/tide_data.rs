//! # NOAA Water Level Fetching
//!
//! This module talks to the NOAA CO-OPS data getter, one request per date
//! chunk, and classifies what comes back.
//!
//! ## Data Source
//!
//! ### NOAA Tides and Currents API
//! - **URL**: https://api.tidesandcurrents.noaa.gov/api/prod/datagetter
//! - **Product**: `water_level` (6-minute observations)
//! - **Datum**: MSL, metric units, GMT timestamps
//! - **Window limit**: roughly one month per request, hence [`crate::chunker`]
//!
//! ### Response Shapes
//! ```json
//! {"metadata": {...}, "data": [{"t": "2014-01-01 00:00", "v": "0.412", ...}, ...]}
//! {"error": {"message": "No data was found. This product may not be offered at this station at the requested time."}}
//! ```
//!
//! ## Error Handling
//!
//! - **Transport failures** (connect, timeout, non-2xx): returned as
//!   [`TideError::Transport`]; the pipeline decides whether that aborts the run
//! - **Error envelopes and unknown payloads**: not errors at this level; they
//!   come back as [`ChunkPayload`] variants and count as zero records
//!
//! No request is ever retried.

use crate::chunker::DateRange;
use crate::config::NoaaConfig;
use log::{debug, warn};
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while building, fetching, or deriving a sea level series.
#[derive(Error, Debug)]
pub enum TideError {
    /// Year out of bounds or a range whose start is after its end
    #[error("invalid date range: {0}")]
    InvalidRange(String),

    /// Request could not be sent or the server answered with a failure status
    #[error("request to {url} failed")]
    Transport {
        url: String,
        timed_out: bool,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Every chunk came back as an error envelope or an unknown payload
    #[error("unexpected response from NOAA: {0}")]
    MalformedResponse(String),

    /// No usable observations for the request
    #[error("no data available for station {station} in {year}")]
    NoData { station: String, year: i32 },

    /// Rolling window of zero samples
    #[error("rolling window must cover at least one sample")]
    InvalidWindow,

    /// HTTP client could not be constructed
    #[error("failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),
}

impl TideError {
    fn transport(url: &str, error: reqwest::Error) -> Self {
        TideError::Transport {
            url: url.to_string(),
            timed_out: error.is_timeout(),
            source: Box::new(error),
        }
    }

    /// True for transport errors caused by the request timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TideError::Transport { timed_out: true, .. })
    }
}

/// One unparsed observation as the API returns it.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RawRecord {
    /// Timestamp string, e.g. `2014-01-01 00:06`
    #[serde(rename = "t", default, deserialize_with = "nullable_string")]
    pub timestamp: String,
    /// Level string in metres, empty when the gauge reported nothing
    #[serde(rename = "v", default, deserialize_with = "nullable_string")]
    pub level: String,
}

impl RawRecord {
    pub fn new(timestamp: impl Into<String>, level: impl Into<String>) -> Self {
        RawRecord {
            timestamp: timestamp.into(),
            level: level.into(),
        }
    }
}

fn nullable_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Classified body of one chunk response.
#[derive(Clone, Debug, PartialEq)]
pub enum ChunkPayload {
    /// A `data` array, possibly empty
    Records(Vec<RawRecord>),
    /// An `error` envelope with the upstream message
    UpstreamError(String),
    /// Neither shape; not JSON or an unexpected schema
    Unrecognized,
}

#[derive(Deserialize)]
struct Envelope {
    data: Option<Vec<RawRecord>>,
    error: Option<UpstreamErrorBody>,
}

#[derive(Deserialize)]
struct UpstreamErrorBody {
    #[serde(default)]
    message: String,
}

/// Classify a data getter response body.
pub fn parse_chunk_body(body: &str) -> ChunkPayload {
    match serde_json::from_str::<Envelope>(body) {
        Ok(Envelope {
            error: Some(error), ..
        }) => ChunkPayload::UpstreamError(error.message),
        Ok(Envelope {
            data: Some(records),
            ..
        }) => ChunkPayload::Records(records),
        Ok(_) => ChunkPayload::Unrecognized,
        Err(e) => {
            warn!("Unparseable NOAA response: {}", e);
            ChunkPayload::Unrecognized
        }
    }
}

/// Query string for one chunk.
pub fn query_params(
    station_id: &str,
    range: &DateRange,
    application: &str,
) -> Vec<(&'static str, String)> {
    vec![
        ("begin_date", range.begin_param()),
        ("end_date", range.end_param()),
        ("station", station_id.to_string()),
        ("product", "water_level".to_string()),
        ("datum", "MSL".to_string()),
        ("units", "metric".to_string()),
        ("time_zone", "gmt".to_string()),
        ("application", application.to_string()),
        ("format", "json".to_string()),
    ]
}

/// Anything that can supply one chunk of water-level records.
///
/// [`NoaaClient`] is the network implementation; the pipeline only depends
/// on this trait.
#[allow(async_fn_in_trait)]
pub trait TideSource {
    async fn fetch_chunk(
        &self,
        station_id: &str,
        range: &DateRange,
    ) -> Result<ChunkPayload, TideError>;
}

/// HTTP client for the NOAA data getter.
pub struct NoaaClient {
    http: reqwest::Client,
    api_url: String,
    application: String,
    api_key: Option<String>,
}

impl NoaaClient {
    /// Build a client from explicit configuration.
    pub fn new(config: &NoaaConfig) -> Result<Self, TideError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(TideError::ClientBuild)?;

        Ok(NoaaClient {
            http,
            api_url: config.api_url.clone(),
            application: config.application.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

impl TideSource for NoaaClient {
    async fn fetch_chunk(
        &self,
        station_id: &str,
        range: &DateRange,
    ) -> Result<ChunkPayload, TideError> {
        debug!("Requesting station {} for {}", station_id, range);

        let mut request = self
            .http
            .get(&self.api_url)
            .query(&query_params(station_id, range, &self.application));
        if let Some(token) = &self.api_key {
            request = request.header("token", token);
        }

        let response = request
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| TideError::transport(&self.api_url, e))?;

        let body = response
            .text()
            .await
            .map_err(|e| TideError::transport(&self.api_url, e))?;

        Ok(parse_chunk_body(&body))
    }
}
