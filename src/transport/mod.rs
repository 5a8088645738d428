use async_trait::async_trait;
use thiserror::Error;

use crate::metrics::MetricsSnapshot;

pub mod sim;

pub use sim::SimTransport;

/// Transport-layer failure taxonomy
///
/// The transport collaborator owns timeout policy: a peer that does not
/// respond within the transport's bounded timeout surfaces here as
/// `Unreachable`, not as a distinct timeout kind. Retry policy, if any, also
/// belongs beneath this seam; the aggregator never retries.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Peer did not respond to a metrics operation
    #[error("peer {0} is unreachable")]
    Unreachable(String),
}

/// Narrow interface for reading and clearing one peer's metrics
///
/// This is the seam between the harness and the measured software. The
/// harness addresses peers purely by their derived network address; it never
/// holds connections or per-peer state of its own.
///
/// Implementations must be safe to share across the per-peer worker tasks a
/// measurement round fans out to.
#[async_trait]
pub trait MetricsTransport: Send + Sync + 'static {
    /// Pull a structured statistical snapshot from the peer
    ///
    /// The snapshot reflects activity accumulated since the peer's last
    /// metrics reset.
    async fn get_metrics(&self, peer_address: &str) -> Result<MetricsSnapshot, TransportError>;

    /// Clear the peer's accumulated distributions
    ///
    /// After a successful clear, the next snapshot reflects only activity
    /// since this call.
    async fn clear_metrics(&self, peer_address: &str) -> Result<(), TransportError>;
}
