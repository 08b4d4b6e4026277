//! Outbound route establishment.
//!
//! # Responsibilities
//! - One-shot connect to a route URL (connect + handshake, both bounded)
//! - Register the solicited record and spawn its connection task
//! - Redial solicited routes that drop while still solicited
//!
//! # Design Decisions
//! - `connect_once` never retries; retry belongs to the lost-route path only
//! - Reconnect ownership is read from the record after its task has
//!   unregistered it. Admin removal clears the flag under the registry lock
//!   before closing, so a removal that succeeds is never followed by a redial

use std::sync::Arc;
use std::time::Duration;
use futures_util::future::{BoxFuture, FutureExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use url::{Host, Url};

use crate::config::{NodeConfig, ReconnectConfig};
use crate::lifecycle::Shutdown;
use crate::net::connection::PeerEndpoint;
use crate::observability::metrics;
use crate::resilience::backoff::ReconnectBackoff;
use crate::route::connection::{handshake, serve_route};
use crate::route::protocol::ProtocolError;
use crate::route::record::RouteRecord;
use crate::route::registry::RouteRegistry;

/// Port used when a route URL does not name one.
pub const DEFAULT_ROUTE_PORT: u16 = 6222;

/// Errors from a single outbound connection attempt.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("route URL '{0}' has no host")]
    MissingHost(String),

    #[error("timed out connecting to {addr} after {timeout:?}")]
    Timeout { addr: String, timeout: Duration },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("handshake failed: {0}")]
    Handshake(#[from] ProtocolError),

    #[error("node is shutting down")]
    ShuttingDown,
}

/// Establishes a route to a URL with exactly one attempt.
pub trait RouteConnector: Send + Sync {
    fn connect_once<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Arc<RouteRecord>, ConnectError>>;
}

/// Settings shared by outbound and inbound route setup.
#[derive(Debug, Clone)]
pub struct RouteSettings {
    pub server_name: String,
    pub connect_timeout: Duration,
    pub handshake_timeout: Duration,
    pub max_payload: usize,
    pub reconnect: ReconnectConfig,
}

impl RouteSettings {
    pub fn from_config(config: &NodeConfig) -> Self {
        Self {
            server_name: config.node.server_name.clone(),
            connect_timeout: Duration::from_secs(config.timeouts.connect_secs),
            handshake_timeout: Duration::from_secs(config.timeouts.handshake_secs),
            max_payload: config.cluster.max_payload,
            reconnect: config.reconnect.clone(),
        }
    }
}

/// TCP implementation of [`RouteConnector`].
#[derive(Clone)]
pub struct TcpRouteConnector {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Arc<RouteRegistry>,
    settings: RouteSettings,
    shutdown: Shutdown,
}

impl TcpRouteConnector {
    pub fn new(registry: Arc<RouteRegistry>, settings: RouteSettings, shutdown: Shutdown) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                settings,
                shutdown,
            }),
        }
    }

    /// Dial, handshake, register, and start serving a solicited route.
    pub async fn connect(&self, url: &Url) -> Result<Arc<RouteRecord>, ConnectError> {
        let inner = &self.inner;
        if inner.shutdown.is_triggered() {
            return Err(ConnectError::ShuttingDown);
        }

        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => return Err(ConnectError::MissingHost(url.to_string())),
        };
        let port = url.port().unwrap_or(DEFAULT_ROUTE_PORT);
        let timeout = inner.settings.connect_timeout;

        tracing::debug!(url = %url, host = %host, port, "Connecting route");
        let stream = tokio::time::timeout(timeout, TcpStream::connect((host.as_str(), port)))
            .await
            .map_err(|_| ConnectError::Timeout {
                addr: format!("{}:{}", host, port),
                timeout,
            })??;
        let remote = stream.peer_endpoint();

        let (stream, peer_name) =
            handshake(stream, &inner.settings.server_name, inner.settings.handshake_timeout).await?;

        let (record, channels) = RouteRecord::new(Some(url.clone()), remote, true);
        inner.registry.add(record.clone());
        tracing::info!(
            route_id = %record.id(),
            url = %url,
            peer = %peer_name,
            "Solicited route established"
        );

        let this = self.clone();
        let task_record = record.clone();
        tokio::spawn(async move {
            serve_route(
                stream,
                task_record.clone(),
                channels,
                this.inner.registry.clone(),
                this.inner.settings.max_payload,
            )
            .await;
            this.on_route_lost(&task_record);
        });

        Ok(record)
    }

    /// Connect to a seed route, falling back to the reconnect loop on failure.
    pub fn solicit(&self, url: Url) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            match this.connect(&url).await {
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Seed route connect failed");
                    if this.inner.settings.reconnect.enabled {
                        this.reconnect(url).await;
                    }
                }
            }
        })
    }

    fn on_route_lost(&self, record: &RouteRecord) {
        // Cleared by an admin removal; the route must stay gone.
        if !record.is_solicited() {
            return;
        }
        if !self.inner.settings.reconnect.enabled || self.inner.shutdown.is_triggered() {
            return;
        }
        if let Some(url) = record.url().cloned() {
            self.spawn_reconnect(url);
        }
    }

    pub fn spawn_reconnect(&self, url: Url) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.reconnect(url).await })
    }

    async fn reconnect(&self, url: Url) {
        let mut backoff = ReconnectBackoff::new(&self.inner.settings.reconnect);
        let mut shutdown = self.inner.shutdown.subscribe();

        while let Some(delay) = backoff.next_delay() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.recv() => return,
            }
            if self.inner.shutdown.is_triggered() {
                return;
            }

            metrics::record_reconnect_attempt();
            match self.connect(&url).await {
                Ok(record) => {
                    tracing::info!(
                        route_id = %record.id(),
                        url = %url,
                        attempt = backoff.attempts(),
                        "Route reconnected"
                    );
                    return;
                }
                Err(e) => {
                    tracing::warn!(url = %url, attempt = backoff.attempts(), error = %e, "Route reconnect failed");
                }
            }
        }
        tracing::warn!(url = %url, attempts = backoff.attempts(), "Giving up on route");
    }
}

impl RouteConnector for TcpRouteConnector {
    fn connect_once<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Arc<RouteRecord>, ConnectError>> {
        self.connect(url).boxed()
    }
}
