//! # Derived Metrics
//!
//! Trailing rolling mean and extreme samples for an assembled series.
//! Everything here is recomputed per request; nothing is updated incrementally.

use crate::tide_data::TideError;
use crate::{TideSample, TideSeries};
use serde::Serialize;

/// Default rolling window, in samples.
pub const DEFAULT_WINDOW: usize = 7;

/// Figures derived from one [`TideSeries`].
#[derive(Clone, Debug, Serialize)]
pub struct DerivedMetrics {
    /// Window size the rolling average was computed with
    pub window: usize,
    /// Trailing mean, one value per sample of the series
    pub rolling_average: Vec<f64>,
    /// Highest sample; earliest wins on ties
    pub max_sample: TideSample,
    /// Lowest sample; earliest wins on ties
    pub min_sample: TideSample,
}

impl DerivedMetrics {
    /// Compute metrics for `series` with a trailing window of `window` samples.
    pub fn compute(series: &TideSeries, window: usize) -> Result<Self, TideError> {
        if window == 0 {
            return Err(TideError::InvalidWindow);
        }
        let (max_sample, min_sample) =
            extremes(&series.samples).ok_or_else(|| TideError::NoData {
                station: series.station_id.clone(),
                year: series.year,
            })?;

        Ok(DerivedMetrics {
            window,
            rolling_average: rolling_mean(&series.samples, window),
            max_sample,
            min_sample,
        })
    }
}

/// Trailing mean over at most `window` samples ending at each index.
///
/// The first `window - 1` values average whatever samples exist so far
/// (partial windows are allowed).
///
/// The running sum is recomputed from the window itself every `window`
/// samples, so rounding error never spans more than one window.
pub fn rolling_mean(samples: &[TideSample], window: usize) -> Vec<f64> {
    let mut result = Vec::with_capacity(samples.len());
    let mut sum = 0.0;

    for (i, sample) in samples.iter().enumerate() {
        if i >= window && i % window == 0 {
            sum = samples[i + 1 - window..=i]
                .iter()
                .map(|s| s.water_level)
                .sum();
        } else {
            sum += sample.water_level;
            if i >= window {
                sum -= samples[i - window].water_level;
            }
        }
        let count = (i + 1).min(window);
        result.push(sum / count as f64);
    }

    result
}

/// Highest and lowest samples, earliest first on ties.
pub fn extremes(samples: &[TideSample]) -> Option<(TideSample, TideSample)> {
    let (first, rest) = samples.split_first()?;

    let mut max = *first;
    let mut min = *first;
    for sample in rest {
        // strict comparisons keep the earliest of equal levels
        if sample.water_level > max.water_level {
            max = *sample;
        }
        if sample.water_level < min.water_level {
            min = *sample;
        }
    }

    Some((max, min))
}
