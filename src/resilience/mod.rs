//! Resilience subsystem.
//!
//! # Design Decisions
//! - Only solicited routes are retried; accepted routes are the peer's to redial
//! - Admin connect attempts are one-shot; retry applies to lost routes only
//! - Backoff is exponential with jitter so a restarted peer is not stampeded

pub mod backoff;
