//! # Ledger Benchmark Harness Library
//!
//! A performance measurement harness for distributed ledger replication test
//! networks, implemented in Rust. The library coordinates windowed performance
//! measurement ("clear metrics, run workload, snapshot metrics") across an
//! ensemble of peer nodes and exports comparable per-peer performance tables.
//!
//! ## Core Responsibilities
//!
//! - **Deterministic peer addressing**: every peer in a core-set has a stable
//!   short name and network address derived purely from the run nonce, the
//!   core-set name, and the peer's ordinal within the set
//! - **Windowed telemetry**: per-round reset/snapshot of each peer's
//!   statistical state, so rounds never contaminate each other
//! - **History accumulation**: append-only, round-ordered performance rows
//!   per peer, retained across topology changes
//! - **Artifact export**: tab-delimited `.perf` tables per peer, written
//!   through a pluggable storage sink
//!
//! ## Architecture Overview
//!
//! The library is organized into several key modules:
//!
//! - `topology`: core-set model, network configuration, and peer addressing
//! - `metrics`: statistical timer summaries and peer metrics snapshots
//! - `transport`: the metrics-access seam and an in-process simulated ensemble
//! - `aggregator`: the measurement-round protocol and history accumulation
//! - `report`: performance rows, table rendering, and storage sinks
//! - `cli`: command-line interface for the demo mission binary
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use ledger_benchmark::{
//!     CatchupMode, CoreSet, LoadParams, NetworkCfg, PerformanceAggregator,
//!     SimTransport,
//! };
//! use parking_lot::RwLock;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let core = CoreSet::new("core", 3, 3, CatchupMode::None)?;
//!     let network = RwLock::new(NetworkCfg::new("demo", vec![core])?);
//!
//!     let sim = SimTransport::new();
//!     sim.register_network(&network.read())?;
//!
//!     let mut aggregator = PerformanceAggregator::new(sim.clone());
//!     let params = LoadParams::new("pay", 1000, 10000, 100, 100);
//!     let outcome = aggregator
//!         .measure_round(&network, params, || async {
//!             // drive the measured workload here
//!         })
//!         .await;
//!
//!     println!("recorded {} rows", outcome.rows_recorded);
//!     Ok(())
//! }
//! ```
//!
//! ## Measurement Guarantees
//!
//! - Rows for a peer appear in its history in round order, never reordered
//! - An unreachable peer never corrupts another peer's round
//! - Histories are keyed by short name, so a peer removed from the live set
//!   keeps its accumulated rows and still produces an export artifact

/// Measurement-round orchestration
///
/// Contains the `PerformanceAggregator` that drives the reset → execute →
/// snapshot protocol across the live topology, fanning per-peer metric calls
/// out to concurrent tasks and appending one row per peer per round.
pub mod aggregator;

/// Command-line interface and configuration
///
/// Provides argument parsing using clap for the demo mission binary,
/// including duration parsing with human-readable formats (e.g. "10s", "5m")
/// and catchup-mode selection.
pub mod cli;

pub mod logging;

/// Statistical measurement types
///
/// Implements the immutable `Timer` latency summary (built from HDR
/// histograms), the `Distribution` mean/std-dev pair, and the per-peer
/// `MetricsSnapshot` pulled over the transport seam.
pub mod metrics;

/// Performance rows, table rendering, and storage sinks
///
/// Manages per-round performance records and their export as tab-delimited
/// text artifacts. Absent optional fields render as the IEEE `NaN` literal,
/// centralized at this single serialization boundary.
pub mod report;

/// Core-set model and peer addressing
///
/// Represents the run topology: named homogeneous groups of peers with a
/// mutable live count, and cheap peer projections whose names and addresses
/// are pure functions of (run nonce, core-set name, ordinal).
pub mod topology;

/// Metrics transport seam and simulated ensemble
///
/// The `MetricsTransport` trait is the narrow interface to the measured
/// software; `SimTransport` is an in-process implementation used by tests
/// and the demo mission.
pub mod transport;

pub mod utils;

// Re-export key types for convenient library usage

/// Measurement-round orchestration types
pub use aggregator::{
    LoadParams, PerformanceAggregator, PerformanceHistory, RoundOutcome, TopologySnapshot,
};

/// Command-line interface types
pub use cli::Args;

/// Statistical measurement types
pub use metrics::{Distribution, MetricsSnapshot, Timer};

/// Export and sink types
pub use report::{FileSink, MemorySink, PerformanceRow, Sink, SinkError};

/// Topology and addressing types
pub use topology::{CatchupMode, CoreSet, NetworkCfg, Peer};

/// Transport seam types
pub use transport::{sim::SimTransport, MetricsTransport, TransportError};

/// The current version of the ledger benchmark harness
///
/// This version string is automatically populated from Cargo.toml and used
/// in run-summary output for reproducibility and debugging purposes.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
///
/// Sensible defaults for the demo mission's configurable parameters, chosen
/// to produce a short run with statistically meaningful per-round samples.
pub mod defaults {
    /// Default number of core-sets in the simulated topology
    pub const CORE_SETS: usize = 1;

    /// Default configured maximum size of each core-set
    pub const MAX_NODES: usize = 3;

    /// Default number of measurement rounds per run
    ///
    /// Three rounds exercise the windowing protocol (each round must reflect
    /// only its own activity) while keeping the demo run short.
    pub const ROUNDS: usize = 3;

    /// Default number of load-generation accounts
    pub const ACCOUNTS: u64 = 1000;

    /// Default number of transactions submitted per round
    pub const TX_COUNT: u64 = 10_000;

    /// Default target transaction rate (transactions per second)
    pub const TX_RATE: u32 = 100;

    /// Default load-generation batch size
    pub const BATCH_SIZE: u32 = 100;

    /// Default output directory for `.perf` artifacts
    pub const OUTPUT_DIR: &str = "perf-results";

    /// Default artifact namespace within the output directory
    pub const NAMESPACE: &str = "run";
}
