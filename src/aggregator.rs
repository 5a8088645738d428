//! # Performance Aggregator Module
//!
//! This module orchestrates measurement rounds across the live topology and
//! accumulates per-peer performance histories for the lifetime of a run.
//!
//! ## Measurement-Round Protocol
//!
//! One round is a single reset → execute → snapshot cycle:
//!
//! 1. **Reset**: every currently-live peer has its metrics cleared. All
//!    resets complete (concurrently, one task per peer) before the workload
//!    starts, so no peer begins accumulating round statistics early.
//! 2. **Execute**: the caller-supplied workload closure runs. The aggregator
//!    neither inspects nor bounds it; this is the single suspension point
//!    where the measured software accumulates its own statistics.
//! 3. **Snapshot & Record**: the live set is re-read, every live peer is
//!    snapshotted (again concurrently), and one row per reachable peer is
//!    appended to that peer's history.
//!
//! The live set is captured as an explicit [`TopologySnapshot`] at the start
//! of phases 1 and 3, so "which peers existed in this round" is a value the
//! round holds, not something inferred from shared mutable state afterwards.
//! Re-reading at phase 3 means a peer added while the workload ran is
//! snapshotted without having received this round's reset; it reports
//! whatever baseline the remote side has, which is surfaced as an explicit
//! edge case rather than papered over.
//!
//! ## Failure Isolation
//!
//! A peer that cannot be reached for its reset or its snapshot simply
//! produces no row for the round; its prior history is untouched and every
//! other peer records normally. A round in which every peer is unreachable
//! still completes, since the workload has already run and cannot be
//! un-executed.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::report::PerformanceRow;
use crate::topology::NetworkCfg;
use crate::transport::MetricsTransport;

/// Mapping from peer short name to its round-ordered performance rows
///
/// Keyed by short name rather than peer object identity precisely so that
/// rows survive the peer's removal from the live set. Owned exclusively by
/// the aggregator while recording; read-only once handed to the exporter.
pub type PerformanceHistory = HashMap<String, Vec<PerformanceRow>>;

/// Caller-supplied labeling for one measurement round
#[derive(Debug, Clone)]
pub struct LoadParams {
    /// Workload label, e.g. "pay" or "pregenerated"
    pub txtype: String,

    /// Number of load-generation accounts
    pub accounts: u64,

    /// Expected number of submitted transactions
    pub txs: u64,

    /// Target transaction rate in transactions per second
    pub tx_rate: u32,

    /// Load-generation batch size
    pub batch_size: u32,
}

impl LoadParams {
    pub fn new(txtype: impl Into<String>, accounts: u64, txs: u64, tx_rate: u32, batch_size: u32) -> Self {
        Self {
            txtype: txtype.into(),
            accounts,
            txs,
            tx_rate,
            batch_size,
        }
    }
}

/// One peer's identity and address as captured by a topology snapshot
#[derive(Debug, Clone)]
pub struct PeerTarget {
    pub short_name: String,
    pub address: String,
}

/// The live peers of a topology at one instant
///
/// An owned, versioned view: once captured, later topology mutations do not
/// change it. Each round captures one snapshot at reset time and a second
/// one after the workload returns.
#[derive(Debug, Clone)]
pub struct TopologySnapshot {
    pub peers: Vec<PeerTarget>,
}

impl TopologySnapshot {
    /// Capture the currently live peers of the given topology
    pub fn capture(network: &NetworkCfg) -> Self {
        let peers = network
            .live_peers()
            .map(|peer| PeerTarget {
                short_name: peer.short_name(),
                address: peer.dns_name(),
            })
            .collect();
        Self { peers }
    }
}

/// Partial-failure signal returned from a measurement round
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    /// Number of performance rows appended this round
    pub rows_recorded: usize,

    /// Short names of peers that produced no row this round
    pub unreachable: Vec<String>,
}

/// Orchestrates measurement rounds and owns the per-peer history
///
/// One aggregator instance serves one run. Rounds are issued sequentially
/// through `&mut self`, which is what guarantees that rows land in each
/// peer's history in round order: per-peer metric calls fan out to worker
/// tasks within a round, but every history append happens on the
/// coordinating task after those workers are joined.
pub struct PerformanceAggregator<T: MetricsTransport> {
    transport: Arc<T>,
    history: PerformanceHistory,
}

impl<T: MetricsTransport> PerformanceAggregator<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            history: HashMap::new(),
        }
    }

    /// Run one measurement round against the current topology
    ///
    /// Resets every live peer, runs the workload closure, then snapshots the
    /// (re-read) live set and appends one row per reachable peer. A peer
    /// whose reset failed is excluded from the snapshot phase: its window
    /// would not be comparable to the others.
    ///
    /// Returns the partial-failure signal for the mission to inspect; an
    /// entirely unreachable round is still a completed round.
    pub async fn measure_round<F, Fut>(
        &mut self,
        network: &RwLock<NetworkCfg>,
        params: LoadParams,
        workload: F,
    ) -> RoundOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        let reset_view = TopologySnapshot::capture(&network.read());
        debug!(
            "starting round {:?} against {} live peers",
            params.txtype,
            reset_view.peers.len()
        );

        let mut unreachable = Vec::new();

        // Phase 1: clear metrics on every live peer, all resets joined
        // before the workload may start.
        let mut resets = Vec::with_capacity(reset_view.peers.len());
        for target in reset_view.peers.iter().cloned() {
            let transport = Arc::clone(&self.transport);
            resets.push(tokio::spawn(async move {
                let result = transport.clear_metrics(&target.address).await;
                (target, result)
            }));
        }
        for handle in resets {
            match handle.await {
                Ok((_, Ok(()))) => {}
                Ok((target, Err(err))) => {
                    warn!("reset failed for {}: {}", target.short_name, err);
                    unreachable.push(target.short_name);
                }
                Err(err) => warn!("reset task aborted: {}", err),
            }
        }

        // Phase 2: the measured subject. Opaque and unbounded.
        workload().await;

        // Phase 3: re-read the live set and snapshot it. A peer added during
        // the workload appears here without having been reset; a peer whose
        // reset failed is skipped.
        let snapshot_view = TopologySnapshot::capture(&network.read());
        let recorded_at = Utc::now();

        let mut snapshots = Vec::with_capacity(snapshot_view.peers.len());
        for target in snapshot_view.peers.iter().cloned() {
            if unreachable.contains(&target.short_name) {
                continue;
            }
            let transport = Arc::clone(&self.transport);
            snapshots.push(tokio::spawn(async move {
                let result = transport.get_metrics(&target.address).await;
                (target, result)
            }));
        }

        let mut rows_recorded = 0;
        for handle in snapshots {
            match handle.await {
                Ok((target, Ok(snapshot))) => {
                    let row = PerformanceRow::from_snapshot(recorded_at, &params, snapshot);
                    self.history
                        .entry(target.short_name)
                        .or_default()
                        .push(row);
                    rows_recorded += 1;
                }
                Ok((target, Err(err))) => {
                    warn!(
                        "snapshot failed for {}, no row this round: {}",
                        target.short_name, err
                    );
                    unreachable.push(target.short_name);
                }
                Err(err) => warn!("snapshot task aborted: {}", err),
            }
        }

        info!(
            "round {:?} complete: {} rows recorded, {} peers unreachable",
            params.txtype,
            rows_recorded,
            unreachable.len()
        );

        RoundOutcome {
            rows_recorded,
            unreachable,
        }
    }

    /// Read access to the accumulated per-peer history
    pub fn history(&self) -> &PerformanceHistory {
        &self.history
    }

    /// Hand the history off for export once recording is complete
    pub fn into_history(self) -> PerformanceHistory {
        self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{CatchupMode, CoreSet};
    use crate::transport::sim::{SimLoadProfile, SimTransport};
    use std::time::Duration;

    fn test_network(live: usize, max: usize) -> RwLock<NetworkCfg> {
        let core = CoreSet::new("core", max, live, CatchupMode::None).unwrap();
        RwLock::new(NetworkCfg::with_nonce("t0", "test", vec![core]).unwrap())
    }

    fn test_profile() -> SimLoadProfile {
        SimLoadProfile {
            ledgers: 5,
            mean_txs_per_ledger: 20.0,
            mean_close_ms: 100.0,
            window: Duration::from_secs(1),
            with_load_generator: true,
        }
    }

    #[test]
    fn test_topology_snapshot_is_a_value() {
        let network = test_network(2, 3);
        let snapshot = TopologySnapshot::capture(&network.read());
        assert_eq!(snapshot.peers.len(), 2);

        network
            .write()
            .core_set_mut("core")
            .unwrap()
            .set_live_count(3)
            .unwrap();
        // the captured view must not move underneath the round
        assert_eq!(snapshot.peers.len(), 2);
        assert_eq!(snapshot.peers[0].short_name, "core-0");
        assert_eq!(snapshot.peers[0].address, "core-0.t0");
    }

    #[tokio::test]
    async fn test_reset_failure_excludes_peer_from_snapshot() {
        let network = test_network(2, 2);
        let sim = SimTransport::new();
        sim.register_network(&network.read()).unwrap();
        sim.set_reachable("core-1.t0", false).unwrap();

        let mut aggregator = PerformanceAggregator::new(sim.clone());
        let sim_in_round = sim.clone();
        let outcome = aggregator
            .measure_round(
                &network,
                LoadParams::new("load", 10, 100, 5, 20),
                || async move {
                    sim_in_round.apply_load("core-0.t0", &test_profile()).unwrap();
                    // reachable again before the snapshot phase; the missed
                    // reset still keeps it out of this round
                    sim_in_round.set_reachable("core-1.t0", true).unwrap();
                },
            )
            .await;

        assert_eq!(outcome.rows_recorded, 1);
        assert_eq!(outcome.unreachable, vec!["core-1".to_string()]);
        assert!(aggregator.history().contains_key("core-0"));
        assert!(!aggregator.history().contains_key("core-1"));
    }

    #[tokio::test]
    async fn test_fully_unreachable_round_still_completes() {
        let network = test_network(2, 2);
        let sim = SimTransport::new();
        sim.register_network(&network.read()).unwrap();
        sim.set_reachable("core-0.t0", false).unwrap();
        sim.set_reachable("core-1.t0", false).unwrap();

        let mut aggregator = PerformanceAggregator::new(sim);
        let outcome = aggregator
            .measure_round(&network, LoadParams::new("load", 10, 100, 5, 20), || async {})
            .await;

        assert_eq!(outcome.rows_recorded, 0);
        assert_eq!(outcome.unreachable.len(), 2);
        assert!(aggregator.history().is_empty());
    }
}
