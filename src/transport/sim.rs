//! In-process simulated peer ensemble
//!
//! `SimTransport` stands in for a real test network: it keeps one
//! accumulator per registered peer address and lets tests and the demo
//! mission apply synthetic ledger activity between a metrics reset and the
//! following snapshot. The accumulate/reset lifecycle mirrors what the
//! measured software's own metrics registry does, so the aggregator cannot
//! tell the difference.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use hdrhistogram::Histogram;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{MetricsTransport, TransportError};
use crate::aggregator::LoadParams;
use crate::metrics::{Distribution, MetricsSnapshot, Timer};
use crate::topology::NetworkCfg;

/// Synthetic activity applied to a simulated peer for one workload phase
#[derive(Debug, Clone)]
pub struct SimLoadProfile {
    /// Number of ledgers the peer closes during the phase
    pub ledgers: u64,

    /// Mean transactions applied per ledger
    pub mean_txs_per_ledger: f64,

    /// Mean ledger-close latency in milliseconds
    pub mean_close_ms: f64,

    /// Wall-clock length of the phase, for close-rate derivation
    pub window: Duration,

    /// Whether a load generator ran against the peer during the phase
    pub with_load_generator: bool,
}

impl SimLoadProfile {
    /// Derive a plausible activity profile from round load parameters
    ///
    /// Each submission batch becomes roughly one ledger; the close latency
    /// is a fixed baseline the jitter spreads around.
    pub fn for_load(params: &LoadParams, window: Duration) -> Self {
        let batch = u64::from(params.batch_size.max(1));
        Self {
            ledgers: (params.txs / batch).max(1),
            mean_txs_per_ledger: batch as f64,
            mean_close_ms: 250.0,
            window,
            with_load_generator: true,
        }
    }
}

/// Accumulated state of one simulated peer since its last metrics reset
struct SimPeer {
    reachable: bool,
    txs_applied: u64,
    ledger_txs: Vec<f64>,
    load_steps: Vec<f64>,
    nominate: Histogram<u64>,
    externalize: Histogram<u64>,
    ledger_close: Histogram<u64>,
    ledgers_closed: u64,
    window_secs: f64,
}

impl SimPeer {
    fn new() -> Result<Self> {
        Ok(Self {
            reachable: true,
            txs_applied: 0,
            ledger_txs: Vec::new(),
            load_steps: Vec::new(),
            nominate: Histogram::new(3)?,
            externalize: Histogram::new(3)?,
            ledger_close: Histogram::new(3)?,
            ledgers_closed: 0,
            window_secs: 0.0,
        })
    }

    fn clear(&mut self) {
        self.txs_applied = 0;
        self.ledger_txs.clear();
        self.load_steps.clear();
        self.nominate.reset();
        self.externalize.reset();
        self.ledger_close.reset();
        self.ledgers_closed = 0;
        self.window_secs = 0.0;
    }

    fn snapshot(&self) -> MetricsSnapshot {
        let load_step_rate = if self.load_steps.is_empty() {
            None
        } else {
            Some(Distribution::from_samples(&self.load_steps))
        };
        let close_rate = if self.window_secs > 0.0 {
            self.ledgers_closed as f64 / self.window_secs
        } else {
            0.0
        };
        MetricsSnapshot {
            txs_applied: self.txs_applied,
            ledger_txs: Distribution::from_samples(&self.ledger_txs),
            load_step_rate,
            nominate: Timer::from_histogram(&self.nominate),
            externalize: Timer::from_histogram(&self.externalize),
            ledger_close: Timer::from_histogram(&self.ledger_close),
            close_rate,
        }
    }
}

/// In-process metrics transport over a simulated ensemble
///
/// Cloning is cheap and shares the underlying ensemble, so a clone can be
/// handed to the aggregator while the test keeps driving simulated activity
/// and reachability through its own handle.
#[derive(Clone)]
pub struct SimTransport {
    peers: Arc<Mutex<HashMap<String, SimPeer>>>,
}

impl SimTransport {
    pub fn new() -> Self {
        Self {
            peers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a single peer address as reachable and idle
    ///
    /// Registering an address that already exists resets nothing; the
    /// existing accumulator is kept.
    pub fn register_peer(&self, address: &str) -> Result<()> {
        let mut peers = self.peers.lock();
        if !peers.contains_key(address) {
            peers.insert(address.to_string(), SimPeer::new()?);
            debug!("registered simulated peer {}", address);
        }
        Ok(())
    }

    /// Register every currently live peer of the given topology
    pub fn register_network(&self, network: &NetworkCfg) -> Result<()> {
        for peer in network.live_peers() {
            self.register_peer(&peer.dns_name())?;
        }
        Ok(())
    }

    /// Mark a peer reachable or unreachable
    pub fn set_reachable(&self, address: &str, reachable: bool) -> Result<()> {
        let mut peers = self.peers.lock();
        let peer = peers
            .get_mut(address)
            .ok_or_else(|| anyhow!("unknown simulated peer {}", address))?;
        peer.reachable = reachable;
        Ok(())
    }

    /// Apply synthetic ledger activity to a peer
    ///
    /// Accumulates jittered per-ledger samples into the peer's state, on top
    /// of whatever is already there. The jitter keeps repeated rounds from
    /// producing identical distributions.
    pub fn apply_load(&self, address: &str, profile: &SimLoadProfile) -> Result<()> {
        let mut peers = self.peers.lock();
        let peer = peers
            .get_mut(address)
            .ok_or_else(|| anyhow!("unknown simulated peer {}", address))?;

        let mut rng = rand::thread_rng();
        for _ in 0..profile.ledgers {
            let txs = profile.mean_txs_per_ledger * rng.gen_range(0.8..1.2);
            peer.ledger_txs.push(txs);
            peer.txs_applied += txs.round() as u64;

            let close_ms = profile.mean_close_ms * rng.gen_range(0.7..1.5);
            let nominate_ms = close_ms * rng.gen_range(0.2..0.4);
            let externalize_ms = close_ms * rng.gen_range(0.4..0.7);
            peer.ledger_close.record((close_ms * 1000.0) as u64)?;
            peer.nominate.record((nominate_ms * 1000.0) as u64)?;
            peer.externalize.record((externalize_ms * 1000.0) as u64)?;
            peer.ledgers_closed += 1;

            if profile.with_load_generator {
                let step_rate =
                    profile.mean_txs_per_ledger / (close_ms / 1000.0) * rng.gen_range(0.9..1.1);
                peer.load_steps.push(step_rate);
            }
        }
        peer.window_secs += profile.window.as_secs_f64();
        Ok(())
    }
}

impl Default for SimTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsTransport for SimTransport {
    async fn get_metrics(&self, peer_address: &str) -> Result<MetricsSnapshot, TransportError> {
        let peers = self.peers.lock();
        match peers.get(peer_address) {
            Some(peer) if peer.reachable => Ok(peer.snapshot()),
            _ => Err(TransportError::Unreachable(peer_address.to_string())),
        }
    }

    async fn clear_metrics(&self, peer_address: &str) -> Result<(), TransportError> {
        let mut peers = self.peers.lock();
        match peers.get_mut(peer_address) {
            Some(peer) if peer.reachable => {
                peer.clear();
                Ok(())
            }
            _ => Err(TransportError::Unreachable(peer_address.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(ledgers: u64, with_load_generator: bool) -> SimLoadProfile {
        SimLoadProfile {
            ledgers,
            mean_txs_per_ledger: 50.0,
            mean_close_ms: 200.0,
            window: Duration::from_secs(5),
            with_load_generator,
        }
    }

    #[tokio::test]
    async fn test_snapshot_reflects_applied_load() {
        let sim = SimTransport::new();
        sim.register_peer("core-0.nonce").unwrap();
        sim.apply_load("core-0.nonce", &profile(10, true)).unwrap();

        let snapshot = sim.get_metrics("core-0.nonce").await.unwrap();
        assert!(snapshot.txs_applied > 0);
        assert!(snapshot.ledger_txs.mean > 0.0);
        assert!(snapshot.load_step_rate.is_some());
        assert!(snapshot.ledger_close.mean > 0.0);
        assert!((snapshot.close_rate - 2.0).abs() < 0.01, "10 ledgers / 5s");
    }

    #[tokio::test]
    async fn test_clear_resets_the_window() {
        let sim = SimTransport::new();
        sim.register_peer("core-0.nonce").unwrap();
        sim.apply_load("core-0.nonce", &profile(10, true)).unwrap();

        sim.clear_metrics("core-0.nonce").await.unwrap();
        let snapshot = sim.get_metrics("core-0.nonce").await.unwrap();
        assert_eq!(snapshot.txs_applied, 0);
        assert_eq!(snapshot.ledger_txs.mean, 0.0);
        assert!(snapshot.load_step_rate.is_none());
        assert_eq!(snapshot.close_rate, 0.0);
    }

    #[tokio::test]
    async fn test_no_load_generator_means_absent_distribution() {
        let sim = SimTransport::new();
        sim.register_peer("core-0.nonce").unwrap();
        sim.apply_load("core-0.nonce", &profile(5, false)).unwrap();

        let snapshot = sim.get_metrics("core-0.nonce").await.unwrap();
        assert!(snapshot.load_step_rate.is_none());
        assert!(snapshot.txs_applied > 0);
    }

    #[tokio::test]
    async fn test_unreachable_and_unknown_peers() {
        let sim = SimTransport::new();
        sim.register_peer("core-0.nonce").unwrap();
        sim.set_reachable("core-0.nonce", false).unwrap();

        assert!(matches!(
            sim.get_metrics("core-0.nonce").await,
            Err(TransportError::Unreachable(_))
        ));
        assert!(matches!(
            sim.clear_metrics("core-0.nonce").await,
            Err(TransportError::Unreachable(_))
        ));
        assert!(matches!(
            sim.get_metrics("never-registered").await,
            Err(TransportError::Unreachable(_))
        ));
    }
}
