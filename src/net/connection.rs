//! Route connection identity and transport endpoint introspection.
//!
//! # Responsibilities
//! - Generate unique connection IDs for route records and tracing
//! - Expose the peer's IP endpoint when the transport has one

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a route connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rid-{}", self.0)
    }
}

/// Optional capability of a transport: report the remote IP endpoint.
///
/// Transports that are not IP based (such as in-memory pipes) return
/// `None`, and the admin surface renders an empty IP and port 0.
pub trait PeerEndpoint {
    fn peer_endpoint(&self) -> Option<SocketAddr>;
}

impl PeerEndpoint for tokio::net::TcpStream {
    fn peer_endpoint(&self) -> Option<SocketAddr> {
        self.peer_addr().ok()
    }
}

impl PeerEndpoint for tokio::io::DuplexStream {
    fn peer_endpoint(&self) -> Option<SocketAddr> {
        None
    }
}
