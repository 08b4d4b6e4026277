//! Node-wide route registry.
//!
//! # Responsibilities
//! - Sole authority for which routes exist
//! - Snapshot membership for the admin surface
//! - Lookup by connection ID or advertised URL
//!
//! # Design Decisions
//! - One coarse lock guards membership only; per-route fields are guarded by
//!   the record's own lock
//! - The lock is never held across an `.await` or any network I/O
//! - Callers get `Arc` handles, never the backing map

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::net::connection::ConnectionId;
use crate::observability::metrics;
use crate::route::record::RouteRecord;

/// Collection of live (or closing) route records.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    routes: Mutex<HashMap<ConnectionId, Arc<RouteRecord>>>,
}

impl RouteRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn routes(&self) -> MutexGuard<'_, HashMap<ConnectionId, Arc<RouteRecord>>> {
        self.routes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of the current membership, taken under a single lock acquisition.
    pub fn snapshot(&self) -> Vec<Arc<RouteRecord>> {
        self.routes().values().cloned().collect()
    }

    /// First record whose URL matches exactly. Iteration order is unspecified,
    /// so duplicates resolve to an arbitrary one of them.
    pub fn find_by_url(&self, url: &str) -> Option<Arc<RouteRecord>> {
        self.routes()
            .values()
            .find(|record| record.url().is_some_and(|u| u.as_str() == url))
            .cloned()
    }

    /// Find the route with this URL and give up reconnect ownership of it
    /// while membership is still locked.
    ///
    /// A connection task unregisters its record before deciding whether to
    /// redial, so it either sees the cleared flag or the record is already
    /// gone and this returns `None`.
    pub fn release_by_url(&self, url: &str) -> Option<Arc<RouteRecord>> {
        let routes = self.routes();
        let record = routes
            .values()
            .find(|record| record.url().is_some_and(|u| u.as_str() == url))?;
        record.clear_solicited();
        Some(record.clone())
    }

    pub fn get(&self, id: ConnectionId) -> Option<Arc<RouteRecord>> {
        self.routes().get(&id).cloned()
    }

    pub fn add(&self, record: Arc<RouteRecord>) {
        let count = {
            let mut routes = self.routes();
            routes.insert(record.id(), record.clone());
            routes.len()
        };
        metrics::set_active_routes(count);
        tracing::debug!(
            route_id = %record.id(),
            url = record.url().map(|u| u.as_str()).unwrap_or(""),
            active_routes = count,
            "Route registered"
        );
    }

    pub fn remove(&self, id: ConnectionId) -> Option<Arc<RouteRecord>> {
        let (removed, count) = {
            let mut routes = self.routes();
            let removed = routes.remove(&id);
            (removed, routes.len())
        };
        if removed.is_some() {
            metrics::set_active_routes(count);
            tracing::debug!(route_id = %id, active_routes = count, "Route unregistered");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.routes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes().is_empty()
    }
}
