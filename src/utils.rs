//! # Utility Functions and Helper Module
//!
//! Small shared helpers used throughout the harness: run-nonce generation,
//! statistical calculations over raw samples, and human-readable formatting
//! for log output.

use std::time::Duration;
use uuid::Uuid;

/// Generate a run-scoped nonce
///
/// Creates a short lowercase-hex token from a UUID v4 that uniquely
/// disambiguates peer network names across concurrent runs sharing
/// infrastructure. Eight hex characters keep DNS-style names readable while
/// making collisions between simultaneously live runs vanishingly unlikely.
pub fn run_nonce() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}

/// Calculate statistics from a vector of values
///
/// Returns `(mean, min, max, standard_deviation)`. Uses the population
/// standard deviation formula: σ = √(Σ(x - μ)² / N).
///
/// An empty input returns all zeros rather than causing errors.
pub fn calculate_stats(values: &[f64]) -> (f64, f64, f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0, 0.0, 0.0);
    }

    let sum: f64 = values.iter().sum();
    let count = values.len() as f64;
    let mean = sum / count;

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / count;
    let std_dev = variance.sqrt();

    (mean, min, max, std_dev)
}

/// Calculate percentiles from a vector of values
///
/// Computes each requested percentile (0.0 to 100.0) using linear
/// interpolation between adjacent sorted samples. An empty input yields 0.0
/// for every requested percentile.
pub fn calculate_percentiles(values: &[f64], percentiles: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return vec![0.0; percentiles.len()];
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    percentiles
        .iter()
        .map(|&p| {
            let rank = (p / 100.0) * (sorted.len() - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            if lower == upper {
                sorted[lower]
            } else {
                let weight = rank - lower as f64;
                sorted[lower] * (1.0 - weight) + sorted[upper] * weight
            }
        })
        .collect()
}

/// Format a duration for human-readable log output
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos < 1_000 {
        format!("{}ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.2}μs", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2}ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.2}s", nanos as f64 / 1_000_000_000.0)
    }
}

/// Format a per-second rate for human-readable log output
pub fn format_rate(per_second: f64) -> String {
    if per_second < 1000.0 {
        format!("{:.2}/s", per_second)
    } else if per_second < 1_000_000.0 {
        format!("{:.2}K/s", per_second / 1000.0)
    } else {
        format!("{:.2}M/s", per_second / 1_000_000.0)
    }
}
