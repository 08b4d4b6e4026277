//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the route registry and connector
//! - Bind the cluster listener and start accepting routes
//! - Solicit the configured seed routes
//! - Expose the admin service for the HTTP layer
//!
//! # Design Decisions
//! - Fail fast: a listener bind error is fatal
//! - Seed routes are solicited in the background; an unreachable seed does
//!   not block startup

use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::admin::RouteAdminService;
use crate::config::NodeConfig;
use crate::lifecycle::Shutdown;
use crate::net::listener::{Listener, ListenerError};
use crate::route::{RouteRegistry, RouteSettings, TcpRouteConnector};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("route listener: {0}")]
    Listener(#[from] ListenerError),

    #[error("invalid seed route '{url}': {source}")]
    SeedRoute { url: String, source: url::ParseError },
}

/// A running node's route machinery.
pub struct Node {
    registry: Arc<RouteRegistry>,
    admin: Arc<RouteAdminService>,
    cluster_addr: SocketAddr,
}

impl Node {
    /// Bind the cluster listener, spawn its accept loop, and solicit seeds.
    pub async fn start(config: &NodeConfig, shutdown: Shutdown) -> Result<Self, StartupError> {
        let seeds = config
            .cluster
            .routes
            .iter()
            .map(|raw| {
                Url::parse(raw).map_err(|source| StartupError::SeedRoute {
                    url: raw.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let registry = Arc::new(RouteRegistry::new());
        let settings = RouteSettings::from_config(config);
        let connector = TcpRouteConnector::new(registry.clone(), settings.clone(), shutdown.clone());

        let listener = Listener::bind(&config.cluster).await?;
        let cluster_addr = listener.local_addr().map_err(ListenerError::Bind)?;
        tokio::spawn(listener.run(registry.clone(), settings, shutdown));

        for url in seeds {
            tracing::info!(url = %url, "Soliciting seed route");
            connector.solicit(url);
        }

        let admin = Arc::new(RouteAdminService::new(registry.clone(), Arc::new(connector)));

        Ok(Self {
            registry,
            admin,
            cluster_addr,
        })
    }

    pub fn registry(&self) -> &Arc<RouteRegistry> {
        &self.registry
    }

    pub fn admin_service(&self) -> Arc<RouteAdminService> {
        self.admin.clone()
    }

    /// Address the cluster listener is actually bound to.
    pub fn cluster_addr(&self) -> SocketAddr {
        self.cluster_addr
    }

    /// Signal every registered route to close. Reconnects are suppressed by
    /// the shutdown flag, so solicited routes keep their flag.
    pub fn close_all_routes(&self) {
        for record in self.registry.snapshot() {
            record.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> NodeConfig {
        let mut config = NodeConfig::default();
        config.cluster.bind_address = "127.0.0.1:0".into();
        config
    }

    #[tokio::test]
    async fn start_binds_cluster_listener() {
        let shutdown = Shutdown::new();
        let node = Node::start(&config(), shutdown.clone()).await.unwrap();
        assert_ne!(node.cluster_addr().port(), 0);
        assert!(node.registry().is_empty());
        assert_eq!(node.admin_service().list().num_routes, 0);
        shutdown.trigger();
    }

    #[tokio::test]
    async fn bad_seed_route_fails_startup() {
        let mut config = config();
        config.cluster.routes = vec!["not a url://".into()];
        assert!(matches!(
            Node::start(&config, Shutdown::new()).await,
            Err(StartupError::SeedRoute { .. })
        ));
    }
}
