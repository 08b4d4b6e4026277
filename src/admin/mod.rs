//! Route admin surface.
//!
//! # Data Flow
//! ```text
//! GET    /routez          → handlers::list_routes   → service.list()
//! PUT    /routez  <url>   → handlers::add_route     → service.connect()
//! DELETE /routez  <url>   → handlers::remove_route  → service.disconnect()
//! ```

pub mod error;
pub mod handlers;
pub mod service;

use axum::{extract::DefaultBodyLimit, routing::get, Router};

use crate::config::AdminConfig;
use self::handlers::*;

pub use error::AdminError;
pub use handlers::AdminState;
pub use service::{RouteAdminService, RouteInfo, Routez};

pub fn setup_admin_router(state: AdminState, config: &AdminConfig) -> Router {
    Router::new()
        .route("/routez", get(list_routes).put(add_route).delete(remove_route))
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .with_state(state)
}
