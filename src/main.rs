//! # Sea Level Tracker Entry Point
//!
//! Command-line front end for the library:
//! - `sea-level`: fetch a year of NOAA water levels and chart them (or print JSON)
//! - `weather`: current conditions and season for a city
//! - `forecast`: one forecast line per day for a city
//! - `news`: latest weather and climate headlines
//! - `init-config`: write the default configuration file
//!
//! API keys may be supplied through `NOAA_API_KEY`, `OPENWEATHER_API_KEY` and
//! `GNEWS_API_KEY`; they override the configuration file.

use anyhow::{bail, Context};
use chrono::{Datelike, Month, Utc};
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;

use sea_level_lib::config::{Config, TransportPolicy, DEFAULT_CONFIG_PATH};
use sea_level_lib::news::GNewsClient;
use sea_level_lib::pipeline::{self, PipelineOptions, SeaLevelRequest};
use sea_level_lib::renderer::draw_ascii;
use sea_level_lib::season;
use sea_level_lib::tide_data::{NoaaClient, TideError};
use sea_level_lib::weather::{OpenWeatherClient, Rainfall};

#[derive(Parser)]
#[command(
    name = "sea-level-tracker",
    about = "NOAA sea level trends and city weather in the terminal"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a year of water levels for a station and chart them.
    SeaLevel {
        /// Calendar year (e.g., 2014).
        #[arg(long)]
        year: i32,

        /// NOAA station ID. Defaults to the configured station.
        #[arg(long)]
        station: Option<String>,

        /// Rolling-average window in samples. Defaults to the configured window.
        #[arg(long)]
        window: Option<usize>,

        /// Skip chunks that fail in transit instead of aborting.
        #[arg(long, default_value_t = false)]
        skip_failed_chunks: bool,

        /// Print the report as JSON instead of a chart.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Current weather and season for a city.
    Weather {
        /// City name (e.g., "Mumbai").
        city: String,
    },
    /// Daily forecast for the next five days.
    Forecast {
        /// City name (e.g., "Mumbai").
        city: String,
    },
    /// Latest weather and climate headlines.
    News,
    /// Write the default configuration to the config path.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = Config::load_from_path(&cli.config);
    config.apply_api_keys(
        env::var("NOAA_API_KEY").ok(),
        env::var("OPENWEATHER_API_KEY").ok(),
        env::var("GNEWS_API_KEY").ok(),
    );

    // One request at a time; a current-thread runtime is enough
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match cli.command {
        Commands::SeaLevel {
            year,
            station,
            window,
            skip_failed_chunks,
            json,
        } => {
            let station = station.unwrap_or_else(|| config.noaa.station_id.clone());
            let mut options = PipelineOptions::from_config(&config.noaa, &config.analysis);
            if let Some(window) = window {
                options.window = window;
            }
            if skip_failed_chunks {
                options.transport_policy = TransportPolicy::SkipChunk;
            }
            rt.block_on(sea_level(&config, SeaLevelRequest::new(station, year), &options, json))
        }
        Commands::Weather { city } => rt.block_on(weather(&config, &city)),
        Commands::Forecast { city } => rt.block_on(forecast(&config, &city)),
        Commands::News => rt.block_on(news(&config)),
        Commands::InitConfig { force } => Config::write_default(&cli.config, force),
    }
}

async fn sea_level(
    config: &Config,
    request: SeaLevelRequest,
    options: &PipelineOptions,
    json: bool,
) -> anyhow::Result<()> {
    let client = NoaaClient::new(&config.noaa)?;

    let report = match pipeline::run(&client, &request, options).await {
        Ok(report) => report,
        // User-facing conditions rather than failures of the tool itself
        Err(TideError::NoData { station, year }) => bail!(
            "No data available for {} at station {}. Try another year or a different station ID.",
            year,
            station
        ),
        Err(TideError::MalformedResponse(message)) => bail!("Error from NOAA: {}", message),
        Err(error) => {
            return Err(error).with_context(|| {
                format!(
                    "Failed to fetch water levels for station {} in {}",
                    request.station_id, request.year
                )
            })
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        draw_ascii(&report);
    }
    Ok(())
}

async fn weather(config: &Config, city: &str) -> anyhow::Result<()> {
    let client = OpenWeatherClient::new(&config.openweather)?;
    let current = client
        .current(city)
        .await
        .with_context(|| format!("Weather lookup for '{}' failed", city))?;

    let month = Month::try_from(Utc::now().month() as u8)
        .ok()
        .context("current month out of range")?;
    let season = season::classify(current.latitude, month);

    println!(
        "{} ({:.2}, {:.2})",
        current.city, current.latitude, current.longitude
    );
    println!("  {}", current.description);
    println!("  Temperature: {:.1} °C", current.temperature_c);
    println!("  Humidity:    {:.0} %", current.humidity_percent);
    match current.wind_direction_deg {
        Some(deg) => println!(
            "  Wind:        {:.2} km/h ({:.1} m/s) from {:.0}°",
            current.wind_speed_kmh, current.wind_speed_mps, deg
        ),
        None => println!(
            "  Wind:        {:.2} km/h ({:.1} m/s)",
            current.wind_speed_kmh, current.wind_speed_mps
        ),
    }
    match current.rain {
        Some(Rainfall::LastHour(mm)) => println!("  Rain:        {:.1} mm in the last hour", mm),
        Some(Rainfall::LastThreeHours(mm)) => {
            println!("  Rain:        {:.1} mm in the last 3 hours", mm)
        }
        None => {}
    }
    println!("  Season:      {}", season);
    Ok(())
}

async fn forecast(config: &Config, city: &str) -> anyhow::Result<()> {
    let client = OpenWeatherClient::new(&config.openweather)?;
    let forecast = client
        .forecast(city)
        .await
        .with_context(|| format!("Forecast lookup for '{}' failed", city))?;

    println!("5-day forecast for {}", forecast.city);
    for day in &forecast.days {
        println!(
            "  {}  {:>5.1} °C  {:>3.0} %  {:>6.2} km/h  {}",
            day.date.format("%a, %b %d"),
            day.temperature_c,
            day.humidity_percent,
            day.wind_speed_kmh,
            day.description
        );
    }
    Ok(())
}

async fn news(config: &Config) -> anyhow::Result<()> {
    let client = GNewsClient::new(&config.gnews)?;
    let headlines = client.headlines().await.context("Headline lookup failed")?;

    if headlines.is_empty() {
        println!("No headlines found.");
        return Ok(());
    }
    for headline in &headlines {
        println!("* {}", headline.title);
        println!("  {} | {}", headline.source, headline.url);
    }
    Ok(())
}
