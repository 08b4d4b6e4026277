//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP route connection
//!     → listener.rs (accept loop, route limits)
//!     → route::connection handshake
//!     → registered as an accepted route
//!
//! connection.rs supplies the connection IDs and the optional
//! IP endpoint capability used by both directions.
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Endpoint introspection is a capability trait, so non-IP transports
//!   simply report no address

pub mod connection;
pub mod listener;
