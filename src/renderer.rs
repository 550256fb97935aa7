//! # Sea Level Chart Rendering
//!
//! Terminal rendering of a [`SeaLevelReport`]. A year of 6-minute observations
//! is far wider than a terminal, so samples are averaged into fixed-width
//! columns before plotting. The same column buckets are used for the rolling
//! average so both curves line up.

use crate::pipeline::SeaLevelReport;
use crate::TideSample;
use chrono::Datelike;
use std::fmt::Write;

const ROWS: usize = 20;
const COLUMNS: usize = 72;
const Y_AXIS_WIDTH: usize = 7; // "+1.25 " plus the axis line

/// Format a level in metres with an explicit sign
fn format_level(level_m: f64) -> String {
    if level_m.abs() < 0.005 {
        " 0.00".to_string()
    } else if level_m > 0.0 {
        format!("+{:.2}", level_m)
    } else {
        format!("{:.2}", level_m)
    }
}

/// Average `values` into at most `columns` equal-ish buckets
fn bucket_means(values: &[f64], columns: usize) -> Vec<f64> {
    let columns = columns.min(values.len());
    (0..columns)
        .map(|c| {
            let lo = c * values.len() / columns;
            let hi = (c + 1) * values.len() / columns;
            let bucket = &values[lo..hi];
            bucket.iter().sum::<f64>() / bucket.len() as f64
        })
        .collect()
}

/// Column that sample `index` of `len` falls into
fn column_of(index: usize, len: usize, columns: usize) -> usize {
    index * columns / len
}

fn summary_line(label: &str, sample: &TideSample) -> String {
    format!(
        "{label}: {} m at {}",
        format_level(sample.water_level),
        sample.timestamp.format("%Y-%m-%d %H:%M UTC")
    )
}

/// Render the report as an ASCII chart followed by a short summary.
pub fn render_ascii(report: &SeaLevelReport) -> String {
    let samples = &report.series.samples;
    let metrics = &report.metrics;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Mean sea level at station {} in {} (metres, MSL)\n",
        report.series.station_id, report.series.year
    );

    if samples.is_empty() {
        let _ = writeln!(out, "(no samples)");
        return out;
    }

    let levels: Vec<f64> = samples.iter().map(|s| s.water_level).collect();
    let levels_by_column = bucket_means(&levels, COLUMNS);
    let average_by_column = bucket_means(&metrics.rolling_average, COLUMNS);
    let width = levels_by_column.len();

    let lo = metrics.min_sample.water_level;
    let hi = metrics.max_sample.water_level;
    let level_to_row = |level: f64| {
        if hi - lo < f64::EPSILON {
            return ROWS / 2;
        }
        let normalized = (level - lo) / (hi - lo);
        (((1.0 - normalized) * (ROWS as f64 - 1.0)).round() as usize).min(ROWS - 1)
    };

    let mut grid = vec![vec![' '; width + Y_AXIS_WIDTH]; ROWS];

    // Y-axis labels on every fourth row plus the bottom one
    for (row, line) in grid.iter_mut().enumerate() {
        if row % 4 == 0 || row == ROWS - 1 {
            let value = hi - (hi - lo) * row as f64 / (ROWS as f64 - 1.0);
            let label = format!("{:<width$}", format_level(value), width = Y_AXIS_WIDTH - 1);
            for (i, ch) in label.chars().take(Y_AXIS_WIDTH - 1).enumerate() {
                line[i] = ch;
            }
        }
        line[Y_AXIS_WIDTH - 1] = '│';
    }

    // Rolling average first so observations draw over it
    for (column, &avg) in average_by_column.iter().enumerate() {
        grid[level_to_row(avg)][column + Y_AXIS_WIDTH] = '─';
    }
    for (column, &level) in levels_by_column.iter().enumerate() {
        grid[level_to_row(level)][column + Y_AXIS_WIDTH] = '•';
    }

    // Extremes are plotted at their true level, not the bucket mean
    let max_index = samples
        .iter()
        .position(|s| *s == metrics.max_sample)
        .unwrap_or(0);
    let min_index = samples
        .iter()
        .position(|s| *s == metrics.min_sample)
        .unwrap_or(0);
    grid[level_to_row(hi)][column_of(max_index, samples.len(), width) + Y_AXIS_WIDTH] = '▲';
    grid[level_to_row(lo)][column_of(min_index, samples.len(), width) + Y_AXIS_WIDTH] = '▼';

    for row in grid {
        let _ = writeln!(out, "{}", row.into_iter().collect::<String>());
    }

    // Month boundaries below the chart
    let padding = " ".repeat(Y_AXIS_WIDTH);
    let mut previous_month = None;
    let markers: String = (0..width)
        .map(|column| {
            let month = samples[column * samples.len() / width].timestamp.month();
            let marker = if previous_month != Some(month) { '|' } else { ' ' };
            previous_month = Some(month);
            marker
        })
        .collect();
    let _ = writeln!(out, "{}{}", padding, markers);

    if let Some((first, last)) = report.series.time_span() {
        let start_label = first.format("%b %d").to_string();
        let end_label = last.format("%b %d").to_string();
        let gap = width.saturating_sub(start_label.len() + end_label.len());
        let _ = writeln!(
            out,
            "{}{}{}{}",
            padding,
            start_label,
            " ".repeat(gap),
            end_label
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "• observed   ─ {}-sample rolling mean   ▲ max   ▼ min",
        metrics.window
    );
    let _ = writeln!(out, "{}", summary_line("Max", &metrics.max_sample));
    let _ = writeln!(out, "{}", summary_line("Min", &metrics.min_sample));
    let _ = writeln!(
        out,
        "Samples: {} ({} unparseable dropped), chunks: {} ({} skipped)",
        samples.len(),
        report.series.skipped_records,
        report.chunks_requested,
        report.chunks_skipped
    );

    out
}

/// Print the chart to stdout.
pub fn draw_ascii(report: &SeaLevelReport) {
    print!("{}", render_ascii(report));
}
