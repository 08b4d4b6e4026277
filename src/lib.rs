//! Route table administration for a message-broker node.
//!
//! Lists live inter-node routes with their traffic counters, adds outbound
//! routes, and tears routes down without letting their reconnect logic race
//! the removal.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod route;

pub use admin::RouteAdminService;
pub use config::schema::NodeConfig;
pub use http::AdminServer;
pub use lifecycle::{Node, Shutdown};
pub use route::RouteRegistry;
