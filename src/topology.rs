//! # Topology and Peer Addressing Module
//!
//! This module models one test run's topology: an immutable run nonce, an
//! ordered collection of core-sets, and the peers projected from them.
//!
//! Peer identity is deliberately *derived, never stored*. A peer's short name
//! is a pure function of its core-set name and ordinal, and its network
//! address additionally folds in the run nonce so that concurrent runs
//! sharing infrastructure never collide. Because identity is derived, a peer
//! object is a cheap projection that can be recomputed at any time, and the
//! per-peer performance history (keyed by short name) survives the peer being
//! removed from the live set.
//!
//! ## Live vs. known peers
//!
//! A core-set is configured with a maximum size but tracks a *current* live
//! count that external topology operations may raise or lower between
//! measurement rounds. Measurement targets the live ordinals `[0, live)`;
//! export retention walks the known ordinals `[0, max)`.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

use crate::utils::run_nonce;

/// How much ledger history a peer must replay before participating
///
/// This is configuration consumed by the external workload-execution
/// collaborator; the harness only carries it through into run labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatchupMode {
    /// Start from the current ledger without replaying history
    None,

    /// Replay the given number of recent ledgers
    RecentWindow(u32),

    /// Replay the entire history from genesis
    Complete,
}

impl fmt::Display for CatchupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatchupMode::None => write!(f, "none"),
            CatchupMode::RecentWindow(n) => write!(f, "recent/{}", n),
            CatchupMode::Complete => write!(f, "complete"),
        }
    }
}

/// A named, homogeneous group of peers sharing configuration
///
/// All peers of a core-set run identical configuration (quorum membership,
/// catchup mode, history-fetch command). The set is created once when a
/// mission defines its topology; only the live count changes afterwards, via
/// [`CoreSet::set_live_count`]. It never shrinks implicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreSet {
    /// Set name, unique within a run; forms the prefix of peer short names
    pub name: String,

    /// Configured maximum number of peers this set may grow to
    pub max_size: usize,

    /// Catchup mode shared by all peers of the set
    pub catchup_mode: CatchupMode,

    /// Opaque quorum membership description, passed through to run labeling
    pub quorum_set: Vec<String>,

    /// Optional per-peer history-fetch command template, passed through
    pub history_fetch_cmd: Option<String>,

    live_count: usize,
}

impl CoreSet {
    /// Create a core-set with the given live count
    ///
    /// Fails if `live_count` exceeds `max_size`.
    pub fn new(
        name: impl Into<String>,
        max_size: usize,
        live_count: usize,
        catchup_mode: CatchupMode,
    ) -> Result<Self> {
        let name = name.into();
        if live_count > max_size {
            bail!(
                "core-set {}: live count {} exceeds configured maximum {}",
                name,
                live_count,
                max_size
            );
        }
        Ok(Self {
            name,
            max_size,
            catchup_mode,
            quorum_set: Vec::new(),
            history_fetch_cmd: None,
            live_count,
        })
    }

    /// Current number of live peers in the set
    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// Set the current live count, an explicit topology-change operation
    ///
    /// Rejects counts above the configured maximum. Shrinking the live set
    /// does not discard any previously recorded peer history.
    pub fn set_live_count(&mut self, live_count: usize) -> Result<()> {
        if live_count > self.max_size {
            bail!(
                "core-set {}: live count {} exceeds configured maximum {}",
                self.name,
                live_count,
                self.max_size
            );
        }
        self.live_count = live_count;
        Ok(())
    }

    /// Ordinals of the currently live peers
    pub fn live_ordinals(&self) -> Range<usize> {
        0..self.live_count
    }

    /// Ordinals of every peer the set may ever contain
    ///
    /// Export walks this range so that peers removed from the live set still
    /// have their accumulated history flushed.
    pub fn all_ordinals(&self) -> Range<usize> {
        0..self.max_size
    }
}

/// Process-wide description of one test run's topology
///
/// The run nonce is generated at construction and immutable for the run's
/// lifetime; it disambiguates peer network addresses across concurrent runs
/// sharing infrastructure. Core-set order is preserved as given so that peer
/// enumeration is deterministic and reproducible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkCfg {
    nonce: String,

    /// Namespace identifier used for artifact storage paths
    pub namespace: String,

    core_sets: Vec<CoreSet>,
}

impl NetworkCfg {
    /// Create a network configuration with a freshly generated run nonce
    ///
    /// Fails if two core-sets share a name, which would make peer short
    /// names ambiguous.
    pub fn new(namespace: impl Into<String>, core_sets: Vec<CoreSet>) -> Result<Self> {
        Self::with_nonce(run_nonce(), namespace, core_sets)
    }

    /// Create a network configuration with a caller-supplied nonce
    ///
    /// Useful for tests that need reproducible addresses.
    pub fn with_nonce(
        nonce: impl Into<String>,
        namespace: impl Into<String>,
        core_sets: Vec<CoreSet>,
    ) -> Result<Self> {
        for (i, a) in core_sets.iter().enumerate() {
            for b in core_sets.iter().skip(i + 1) {
                if a.name == b.name {
                    bail!("duplicate core-set name: {}", a.name);
                }
            }
        }
        Ok(Self {
            nonce: nonce.into(),
            namespace: namespace.into(),
            core_sets,
        })
    }

    /// The run-scoped nonce embedded in every peer address
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Core-sets in their stable configuration order
    pub fn core_sets(&self) -> &[CoreSet] {
        &self.core_sets
    }

    /// Look up a core-set by name
    pub fn core_set(&self, name: &str) -> Option<&CoreSet> {
        self.core_sets.iter().find(|cs| cs.name == name)
    }

    /// Mutable lookup, for explicit topology-change operations
    pub fn core_set_mut(&mut self, name: &str) -> Option<&mut CoreSet> {
        self.core_sets.iter_mut().find(|cs| cs.name == name)
    }

    /// Enumerate the currently live peers across all core-sets
    pub fn live_peers(&self) -> impl Iterator<Item = Peer<'_>> {
        self.core_sets.iter().flat_map(move |cs| {
            cs.live_ordinals().map(move |ordinal| Peer {
                network: self,
                core_set: cs,
                ordinal,
            })
        })
    }

    /// Enumerate every peer the topology may ever contain
    ///
    /// Includes ordinals above the current live count, up to each set's
    /// configured maximum.
    pub fn known_peers(&self) -> impl Iterator<Item = Peer<'_>> {
        self.core_sets.iter().flat_map(move |cs| {
            cs.all_ordinals().map(move |ordinal| Peer {
                network: self,
                core_set: cs,
                ordinal,
            })
        })
    }

    /// Project the peer at (core-set name, ordinal)
    ///
    /// Returns `None` for an unknown set name. An ordinal at or above the
    /// set's configured maximum is a caller contract violation.
    pub fn peer<'a>(&'a self, set_name: &str, ordinal: usize) -> Option<Peer<'a>> {
        let core_set = self.core_set(set_name)?;
        debug_assert!(
            ordinal < core_set.max_size,
            "ordinal {} out of range for core-set {} (max {})",
            ordinal,
            core_set.name,
            core_set.max_size
        );
        Some(Peer {
            network: self,
            core_set,
            ordinal,
        })
    }
}

/// One addressable peer node, identified by (core-set, ordinal)
///
/// A `Peer` is a cheap, recomputable projection over the topology, never a
/// persisted mutable object. Its short name and network address are pure
/// functions of the identity tuple: repeated calls always yield identical
/// values, ordinals within a set always yield distinct values, and the run
/// nonce keeps addresses distinct across concurrent runs.
#[derive(Debug, Clone, Copy)]
pub struct Peer<'a> {
    network: &'a NetworkCfg,
    core_set: &'a CoreSet,

    /// Ordinal index of this peer within its core-set
    pub ordinal: usize,
}

impl<'a> Peer<'a> {
    /// Human-readable short name, unique across the whole topology
    pub fn short_name(&self) -> String {
        format!("{}-{}", self.core_set.name, self.ordinal)
    }

    /// Network address, unique within the run and across concurrent runs
    pub fn dns_name(&self) -> String {
        format!(
            "{}-{}.{}",
            self.core_set.name,
            self.ordinal,
            self.network.nonce
        )
    }

    /// The core-set this peer belongs to
    pub fn core_set(&self) -> &'a CoreSet {
        self.core_set
    }
}

impl PartialEq for Peer<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.core_set.name == other.core_set.name && self.ordinal == other.ordinal
    }
}

impl Eq for Peer<'_> {}

impl fmt::Display for Peer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}
