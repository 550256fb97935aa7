//! # OpenWeatherMap Lookups
//!
//! City-name lookups of current conditions and the 5-day / 3-hour forecast,
//! reduced to one entry per calendar day.
//!
//! ## Units
//! Requests ask for metric units, so temperatures arrive in °C and wind in
//! m/s. Wind is also reported in km/h (× 3.6, two decimals).
//!
//! ## Errors
//! The API signals unknown cities with a `cod` other than 200 (a number on
//! `/weather`, a string on `/forecast`) and a `message`. Those surface as
//! [`WeatherError::Api`] with the upstream message.

use crate::config::OpenWeatherConfig;
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeatherError {
    /// No `appid` configured
    #[error("OpenWeatherMap API key is not configured")]
    MissingApiKey,

    /// Request could not be completed
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// API answered with an error code (e.g. city not found)
    #[error("OpenWeatherMap error: {message}")]
    Api { message: String },

    /// Body was not the expected JSON
    #[error("unexpected OpenWeatherMap response")]
    Malformed(#[from] serde_json::Error),

    /// HTTP client could not be constructed
    #[error("failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),
}

/// Rain volume, when the API reports one.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum Rainfall {
    /// Millimetres over the last hour
    LastHour(f64),
    /// Millimetres over the last three hours
    LastThreeHours(f64),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CurrentConditions {
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub temperature_c: f64,
    pub humidity_percent: f64,
    pub description: String,
    pub wind_speed_mps: f64,
    pub wind_speed_kmh: f64,
    pub wind_direction_deg: Option<f64>,
    pub rain: Option<Rainfall>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub temperature_c: f64,
    pub description: String,
    pub humidity_percent: f64,
    pub wind_speed_kmh: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DailyForecast {
    pub city: String,
    pub days: Vec<ForecastDay>,
}

#[derive(Deserialize)]
struct CurrentResponse {
    name: String,
    coord: Coord,
    main: MainBlock,
    #[serde(default)]
    weather: Vec<Condition>,
    wind: Wind,
    #[serde(default)]
    rain: Option<RainBlock>,
}

#[derive(Deserialize)]
struct Coord {
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
struct MainBlock {
    temp: f64,
    humidity: f64,
}

#[derive(Deserialize)]
struct Condition {
    description: String,
}

#[derive(Deserialize)]
struct Wind {
    speed: f64,
    #[serde(default)]
    deg: Option<f64>,
}

#[derive(Deserialize)]
struct RainBlock {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
    #[serde(rename = "3h")]
    three_hours: Option<f64>,
}

#[derive(Deserialize)]
struct ForecastResponse {
    list: Vec<ForecastEntry>,
    city: ForecastCity,
}

#[derive(Deserialize)]
struct ForecastEntry {
    dt: i64,
    main: MainBlock,
    #[serde(default)]
    weather: Vec<Condition>,
    wind: Wind,
}

#[derive(Deserialize)]
struct ForecastCity {
    name: String,
    /// Offset from UTC in seconds
    #[serde(default)]
    timezone: i32,
}

fn mps_to_kmh(speed_mps: f64) -> f64 {
    (speed_mps * 3.6 * 100.0).round() / 100.0
}

/// Upper-case the first character and lower-case the rest.
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn description_of(conditions: &[Condition]) -> String {
    conditions
        .first()
        .map(|c| capitalize(&c.description))
        .unwrap_or_default()
}

/// Parse the body and reject payloads whose `cod` is not 200.
fn checked_payload(body: &str) -> Result<Value, WeatherError> {
    let value: Value = serde_json::from_str(body)?;
    let ok = match value.get("cod") {
        Some(Value::Number(n)) => n.as_i64() == Some(200),
        Some(Value::String(s)) => s == "200",
        _ => false,
    };
    if ok {
        return Ok(value);
    }

    let message = value
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .unwrap_or("City not found.")
        .to_string();
    Err(WeatherError::Api { message })
}

/// Parse a `/weather` response body.
pub fn parse_current(body: &str) -> Result<CurrentConditions, WeatherError> {
    let response: CurrentResponse = serde_json::from_value(checked_payload(body)?)?;

    let rain = response.rain.and_then(|rain| {
        rain.one_hour
            .map(Rainfall::LastHour)
            .or(rain.three_hours.map(Rainfall::LastThreeHours))
    });

    Ok(CurrentConditions {
        description: description_of(&response.weather),
        city: response.name,
        latitude: response.coord.lat,
        longitude: response.coord.lon,
        temperature_c: response.main.temp,
        humidity_percent: response.main.humidity,
        wind_speed_mps: response.wind.speed,
        wind_speed_kmh: mps_to_kmh(response.wind.speed),
        wind_direction_deg: response.wind.deg,
        rain,
    })
}

/// Parse a `/forecast` response body, keeping the first entry of each day.
///
/// Days are calendar dates in the city's own UTC offset.
pub fn parse_forecast(body: &str) -> Result<DailyForecast, WeatherError> {
    let response: ForecastResponse = serde_json::from_value(checked_payload(body)?)?;
    let offset = FixedOffset::east_opt(response.city.timezone).unwrap_or_else(|| Utc.fix());

    let mut seen = HashSet::new();
    let mut days = Vec::new();
    for entry in response.list {
        let Some(at) = DateTime::from_timestamp(entry.dt, 0) else {
            continue;
        };
        let date = at.with_timezone(&offset).date_naive();
        if seen.insert(date) {
            days.push(ForecastDay {
                date,
                temperature_c: entry.main.temp,
                description: description_of(&entry.weather),
                humidity_percent: entry.main.humidity,
                wind_speed_kmh: mps_to_kmh(entry.wind.speed),
            });
        }
    }

    Ok(DailyForecast {
        city: response.city.name,
        days,
    })
}

/// HTTP client for the OpenWeatherMap 2.5 API.
pub struct OpenWeatherClient {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl OpenWeatherClient {
    pub fn new(config: &OpenWeatherConfig) -> Result<Self, WeatherError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(WeatherError::ClientBuild)?;

        Ok(OpenWeatherClient {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Current conditions for `city`.
    pub async fn current(&self, city: &str) -> Result<CurrentConditions, WeatherError> {
        parse_current(&self.get("weather", city).await?)
    }

    /// One forecast entry per day for `city`.
    pub async fn forecast(&self, city: &str) -> Result<DailyForecast, WeatherError> {
        parse_forecast(&self.get("forecast", city).await?)
    }

    async fn get(&self, endpoint: &str, city: &str) -> Result<String, WeatherError> {
        let key = self.api_key.as_deref().ok_or(WeatherError::MissingApiKey)?;
        let url = format!("{}/{}", self.api_url, endpoint);
        debug!("Requesting {} for {}", url, city);

        // Error statuses still carry a JSON body with the message we want
        let response = self
            .http
            .get(&url)
            .query(&[("q", city), ("appid", key), ("units", "metric")])
            .send()
            .await
            .map_err(|source| WeatherError::Transport {
                url: url.clone(),
                source,
            })?;

        response
            .text()
            .await
            .map_err(|source| WeatherError::Transport { url, source })
    }
}
