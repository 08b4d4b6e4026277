//! Route subsystem: inter-node connections and the registry that tracks them.
//!
//! # Data Flow
//! ```text
//! Outbound (solicited):
//!     connector.rs (dial + handshake, bounded by timeouts)
//!     → record.rs (RouteRecord, solicited = true)
//!     → registry.rs (add)
//!     → connection.rs (I/O tasks update counters)
//!
//! Inbound (accepted):
//!     net::listener → connection.rs handshake
//!     → record.rs (RouteRecord, solicited = false, no URL)
//!     → registry.rs (add) → connection.rs
//!
//! Close:
//!     record.close() or EOF → connection.rs stops
//!     → registry.rs (remove)
//!     → connector.rs redials only if the record is still solicited
//! ```
//!
//! # Design Decisions
//! - Two-level locking: registry lock for membership, record lock for fields
//! - Lock order is always registry before record; I/O never runs under either

pub mod connection;
pub mod connector;
pub mod protocol;
pub mod record;
pub mod registry;

pub use connector::{ConnectError, RouteConnector, RouteSettings, TcpRouteConnector};
pub use record::{RouteRecord, RouteSnapshot};
pub use registry::RouteRegistry;
