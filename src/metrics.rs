use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};

use crate::utils::{calculate_percentiles, calculate_stats};

/// Histograms record latencies in whole microseconds; summaries are reported
/// in milliseconds.
const US_PER_MS: f64 = 1000.0;

/// Immutable statistical summary of a latency distribution
///
/// Constructed once per snapshot from a raw distribution sample and never
/// mutated afterwards. All values are milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
    pub median: f64,
    pub p75: f64,
    pub p95: f64,
    pub p99: f64,
}

impl Timer {
    /// Summarize an HDR histogram of microsecond latencies
    pub fn from_histogram(histogram: &Histogram<u64>) -> Self {
        let pct = |p: f64| histogram.value_at_percentile(p) as f64 / US_PER_MS;
        Self {
            mean: histogram.mean() / US_PER_MS,
            min: histogram.min() as f64 / US_PER_MS,
            max: histogram.max() as f64 / US_PER_MS,
            std_dev: histogram.stdev() / US_PER_MS,
            median: pct(50.0),
            p75: pct(75.0),
            p95: pct(95.0),
            p99: pct(99.0),
        }
    }

    /// Summarize raw millisecond samples directly
    ///
    /// An empty sample set yields the all-zero summary, matching what an
    /// empty histogram reports.
    pub fn from_samples_ms(samples: &[f64]) -> Self {
        let (mean, min, max, std_dev) = calculate_stats(samples);
        let pcts = calculate_percentiles(samples, &[50.0, 75.0, 95.0, 99.0]);
        Self {
            mean,
            min,
            max,
            std_dev,
            median: pcts[0],
            p75: pcts[1],
            p95: pcts[2],
            p99: pcts[3],
        }
    }
}

/// Mean and standard deviation of a counter-style distribution
///
/// Used for per-ledger transaction counts and load-generator step-submission
/// rates, where the full percentile breakdown of a [`Timer`] is not reported
/// by the measured software.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub mean: f64,
    pub std_dev: f64,
}

impl Distribution {
    pub fn new(mean: f64, std_dev: f64) -> Self {
        Self { mean, std_dev }
    }

    /// Summarize raw samples
    pub fn from_samples(samples: &[f64]) -> Self {
        let (mean, _, _, std_dev) = calculate_stats(samples);
        Self { mean, std_dev }
    }
}

/// A structured statistical snapshot pulled from one peer at a point in time
///
/// Reflects the peer's accumulated activity since the last metrics reset.
/// The load-generator distribution is present only if a load generator
/// executed against this peer inside the current measurement window; its
/// absence is explicit, never a sentinel value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Applied-transaction counter for the window
    pub txs_applied: u64,

    /// Per-ledger transaction-count distribution
    pub ledger_txs: Distribution,

    /// Load-generator step-submission distribution, when a load generator ran
    pub load_step_rate: Option<Distribution>,

    /// Nomination latency
    pub nominate: Timer,

    /// Preparation/externalization latency
    pub externalize: Timer,

    /// Ledger-close latency
    pub ledger_close: Timer,

    /// Ledger closes per second over the window
    pub close_rate: f64,
}
