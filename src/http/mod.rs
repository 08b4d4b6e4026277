//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (admin bind address)
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID assigned or kept)
//!     → admin router (/routez)
//!     → JSON response
//! ```

pub mod request;
pub mod server;

pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::AdminServer;
