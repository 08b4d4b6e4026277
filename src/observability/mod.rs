//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! route tasks, registry, admin handlers
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Events carry `route_id` and `url` fields so one route can be followed
//!   through connect, traffic, and close
//! - Admin requests get a request ID (see `http::request`)

pub mod logging;
pub mod metrics;
