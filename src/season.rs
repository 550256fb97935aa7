//! Meteorological season from latitude and month.
//!
//! A simplified hemisphere table: three-month seasons, flipped south of the
//! equator, and no seasons at all on it.

use chrono::Month;
use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Season {
    Spring,
    /// Northern summer, which is also the monsoon season in South Asia
    SummerMonsoon,
    Summer,
    Autumn,
    Winter,
    Tropical,
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Season::Spring => "Spring",
            Season::SummerMonsoon => "Summer / Monsoon",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
            Season::Winter => "Winter",
            Season::Tropical => "Tropical",
        };
        f.write_str(label)
    }
}

/// Season at `latitude` (degrees, north positive) during `month`.
pub fn classify(latitude: f64, month: Month) -> Season {
    let month = month.number_from_month();
    if latitude > 0.0 {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::SummerMonsoon,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    } else if latitude < 0.0 {
        match month {
            3..=5 => Season::Autumn,
            6..=8 => Season::Winter,
            9..=11 => Season::Spring,
            _ => Season::Summer,
        }
    } else {
        Season::Tropical
    }
}
