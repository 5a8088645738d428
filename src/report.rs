//! # Report Export Module
//!
//! Manages the serialization of accumulated per-peer performance histories
//! into tab-delimited `.perf` artifacts, written through a pluggable storage
//! sink. This module is the single serialization boundary: the rule that an
//! absent load-generator distribution renders as the IEEE `NaN` literal lives
//! here and nowhere else.
//!
//! Export walks every peer the topology has ever known (all ordinals up to
//! each core-set's configured maximum), not just the currently live ones, so
//! a peer removed from the live set after round R still produces an artifact
//! containing its rows through R. A peer that was never measured produces no
//! artifact; that is a no-op, not an error.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::aggregator::{LoadParams, PerformanceHistory};
use crate::metrics::{Distribution, MetricsSnapshot, Timer};
use crate::topology::{CoreSet, NetworkCfg};

/// One per-peer, per-round measurement record
///
/// Immutable once built. Field order here is the column order of the
/// exported table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRow {
    /// When the round's snapshot phase ran
    pub timestamp: DateTime<Utc>,

    /// Workload label for the round
    pub txtype: String,

    /// Load-generation account count
    pub accounts: u64,

    /// Expected number of submitted transactions
    pub txs: u64,

    /// Transactions the peer actually applied during the window
    pub txs_applied: u64,

    /// Target transaction rate
    pub tx_rate: u32,

    /// Load-generation batch size
    pub batch_size: u32,

    /// Per-ledger transaction-count distribution
    pub ledger_txs: Distribution,

    /// Load-generator step-submission distribution, absent when no load
    /// generator ran against the peer this round
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

impl PerformanceRow {
    /// Combine a peer snapshot with the round's labeling into one record
    pub fn from_snapshot(
        timestamp: DateTime<Utc>,
        params: &LoadParams,
        snapshot: MetricsSnapshot,
    ) -> Self {
        Self {
            timestamp,
            txtype: params.txtype.clone(),
            accounts: params.accounts,
            txs: params.txs,
            txs_applied: snapshot.txs_applied,
            tx_rate: params.tx_rate,
            batch_size: params.batch_size,
            ledger_txs: snapshot.ledger_txs,
            load_step_rate: snapshot.load_step_rate,
            nominate: snapshot.nominate,
            externalize: snapshot.externalize,
            ledger_close: snapshot.ledger_close,
            close_rate: snapshot.close_rate,
        }
    }
}

const TIMER_FIELDS: [&str; 8] = [
    "mean", "min", "max", "stddev", "median", "p75", "p95", "p99",
];

const TIMER_PREFIXES: [&str; 3] = ["nominate", "externalize", "close"];

/// Total column count of the exported table
const COLUMN_COUNT: usize = 11 + TIMER_PREFIXES.len() * TIMER_FIELDS.len() + 1;

/// Tab-separated header row naming every column in field order
pub fn header() -> String {
    let mut columns: Vec<String> = [
        "timestamp",
        "txtype",
        "accounts",
        "txs",
        "txs_applied",
        "tx_rate",
        "batch_size",
        "ledger_txs_mean",
        "ledger_txs_stddev",
        "load_step_mean",
        "load_step_stddev",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    for prefix in TIMER_PREFIXES {
        for field in TIMER_FIELDS {
            columns.push(format!("{}_{}", prefix, field));
        }
    }
    columns.push("close_rate".to_string());
    columns.join("\t")
}

fn push_timer(fields: &mut Vec<String>, timer: &Timer) {
    for value in [
        timer.mean,
        timer.min,
        timer.max,
        timer.std_dev,
        timer.median,
        timer.p75,
        timer.p95,
        timer.p99,
    ] {
        fields.push(value.to_string());
    }
}

/// Render one row as a tab-separated line
///
/// Timestamps use RFC 3339 with nanosecond precision so they parse back
/// exactly; floats use the shortest round-trip decimal rendering; the absent
/// load-generator distribution renders as two `NaN` fields.
pub fn render_row(row: &PerformanceRow) -> String {
    let mut fields: Vec<String> = vec![
        row.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
        row.txtype.clone(),
        row.accounts.to_string(),
        row.txs.to_string(),
        row.txs_applied.to_string(),
        row.tx_rate.to_string(),
        row.batch_size.to_string(),
        row.ledger_txs.mean.to_string(),
        row.ledger_txs.std_dev.to_string(),
    ];
    match &row.load_step_rate {
        Some(dist) => {
            fields.push(dist.mean.to_string());
            fields.push(dist.std_dev.to_string());
        }
        None => {
            fields.push("NaN".to_string());
            fields.push("NaN".to_string());
        }
    }
    push_timer(&mut fields, &row.nominate);
    push_timer(&mut fields, &row.externalize);
    push_timer(&mut fields, &row.ledger_close);
    fields.push(row.close_rate.to_string());
    fields.join("\t")
}

/// Render a full table: header plus one line per row, in row order
pub fn render_table(rows: &[PerformanceRow]) -> String {
    let mut out = header();
    out.push('\n');
    for row in rows {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out
}

fn parse_timer(fields: &[&str]) -> anyhow::Result<Timer> {
    let value = |i: usize| -> anyhow::Result<f64> { Ok(fields[i].parse()?) };
    Ok(Timer {
        mean: value(0)?,
        min: value(1)?,
        max: value(2)?,
        std_dev: value(3)?,
        median: value(4)?,
        p75: value(5)?,
        p95: value(6)?,
        p99: value(7)?,
    })
}

/// Parse a rendered table back into rows
///
/// Used by tests and downstream tooling to consume `.perf` artifacts. Fields
/// equal the originals exactly under the shortest round-trip rendering; the
/// `NaN` sentinel parses back to an absent distribution.
pub fn parse_rows(content: &str) -> anyhow::Result<Vec<PerformanceRow>> {
    let mut lines = content.lines();
    match lines.next() {
        Some(first) if first == header() => {}
        _ => anyhow::bail!("missing or unrecognized header row"),
    }

    let mut rows = Vec::new();
    for line in lines.filter(|l| !l.is_empty()) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != COLUMN_COUNT {
            anyhow::bail!(
                "expected {} columns, found {}",
                COLUMN_COUNT,
                fields.len()
            );
        }

        let load_step_mean: f64 = fields[9].parse()?;
        let load_step_stddev: f64 = fields[10].parse()?;
        let load_step_rate = if load_step_mean.is_nan() && load_step_stddev.is_nan() {
            None
        } else {
            Some(Distribution::new(load_step_mean, load_step_stddev))
        };

        rows.push(PerformanceRow {
            timestamp: DateTime::parse_from_rfc3339(fields[0])?.with_timezone(&Utc),
            txtype: fields[1].to_string(),
            accounts: fields[2].parse()?,
            txs: fields[3].parse()?,
            txs_applied: fields[4].parse()?,
            tx_rate: fields[5].parse()?,
            batch_size: fields[6].parse()?,
            ledger_txs: Distribution::new(fields[7].parse()?, fields[8].parse()?),
            load_step_rate,
            nominate: parse_timer(&fields[11..19])?,
            externalize: parse_timer(&fields[19..27])?,
            ledger_close: parse_timer(&fields[27..35])?,
            close_rate: fields[35].parse()?,
        });
    }
    Ok(rows)
}

/// Storage-sink failure taxonomy
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink failed to persist an artifact
    #[error("failed to write artifact {name}: {source}")]
    Write {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Destination for exported artifacts
///
/// The namespace is the run's artifact namespace from [`NetworkCfg`]; the
/// artifact name is `<peerShortName>.perf` for performance tables.
pub trait Sink {
    fn write_string(
        &self,
        namespace: &str,
        artifact_name: &str,
        content: &str,
    ) -> Result<(), SinkError>;
}

/// Sink writing artifacts as files under `<root>/<namespace>/<name>`
pub struct FileSink {
    root: PathBuf,
}

impl FileSink {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl Sink for FileSink {
    fn write_string(
        &self,
        namespace: &str,
        artifact_name: &str,
        content: &str,
    ) -> Result<(), SinkError> {
        let dir = self.root.join(namespace);
        fs::create_dir_all(&dir).map_err(|source| SinkError::Write {
            name: artifact_name.to_string(),
            source,
        })?;
        fs::write(dir.join(artifact_name), content).map_err(|source| SinkError::Write {
            name: artifact_name.to_string(),
            source,
        })?;
        debug!("wrote artifact {}/{}", namespace, artifact_name);
        Ok(())
    }
}

/// In-memory sink collecting artifacts for tests
#[derive(Default)]
pub struct MemorySink {
    artifacts: parking_lot::Mutex<HashMap<String, String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve an artifact written earlier, if any
    pub fn artifact(&self, namespace: &str, artifact_name: &str) -> Option<String> {
        self.artifacts
            .lock()
            .get(&format!("{}/{}", namespace, artifact_name))
            .cloned()
    }

    pub fn artifact_count(&self) -> usize {
        self.artifacts.lock().len()
    }
}

impl Sink for MemorySink {
    fn write_string(
        &self,
        namespace: &str,
        artifact_name: &str,
        content: &str,
    ) -> Result<(), SinkError> {
        self.artifacts
            .lock()
            .insert(format!("{}/{}", namespace, artifact_name), content.to_string());
        Ok(())
    }
}

/// Export one peer's history as `<shortName>.perf`
///
/// A peer with no recorded history produces no artifact; that is a
/// successful no-op.
pub fn export_peer(
    history: &PerformanceHistory,
    namespace: &str,
    short_name: &str,
    sink: &dyn Sink,
) -> Result<(), SinkError> {
    match history.get(short_name) {
        None => Ok(()),
        Some(rows) => {
            let content = render_table(rows);
            sink.write_string(namespace, &format!("{}.perf", short_name), &content)
        }
    }
}

/// Export every known peer of the topology
///
/// Walks all ordinals up to each core-set's configured maximum so that peers
/// no longer live still have their histories flushed. A write failure for
/// one peer is collected and the walk continues; failures are per-peer,
/// never whole-run fatal.
pub fn export_all(
    history: &PerformanceHistory,
    network: &NetworkCfg,
    sink: &dyn Sink,
) -> Vec<(String, SinkError)> {
    let mut failures = Vec::new();
    for peer in network.known_peers() {
        let short_name = peer.short_name();
        if let Err(err) = export_peer(history, &network.namespace, &short_name, sink) {
            warn!("export failed for {}: {}", short_name, err);
            failures.push((short_name, err));
        }
    }
    info!(
        "exported performance artifacts to namespace {:?} ({} failures)",
        network.namespace,
        failures.len()
    );
    failures
}

/// Host details recorded in the run summary for reproducibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub architecture: String,
    pub cpu_cores: usize,
    pub harness_version: String,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            cpu_cores: num_cpus::get(),
            harness_version: crate::VERSION.to_string(),
        }
    }
}

/// Run-level metadata written alongside the per-peer artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub nonce: String,
    pub namespace: String,
    pub rounds: usize,
    pub core_sets: Vec<CoreSet>,
    pub system_info: SystemInfo,
}

impl RunSummary {
    pub fn new(network: &NetworkCfg, rounds: usize) -> Self {
        Self {
            version: crate::VERSION.to_string(),
            timestamp: Utc::now(),
            nonce: network.nonce().to_string(),
            namespace: network.namespace.clone(),
            rounds,
            core_sets: network.core_sets().to_vec(),
            system_info: SystemInfo::default(),
        }
    }
}
