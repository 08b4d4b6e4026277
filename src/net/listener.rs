//! Inbound route listener with backpressure.
//!
//! # Responsibilities
//! - Bind to the cluster address
//! - Accept incoming route connections
//! - Enforce max_routes via semaphore
//! - Handshake and register each accepted route as unsolicited

use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::config::ClusterConfig;
use crate::lifecycle::Shutdown;
use crate::net::connection::PeerEndpoint;
use crate::route::connection::{handshake, serve_route};
use crate::route::{RouteRecord, RouteRegistry, RouteSettings};

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    Bind(std::io::Error),
    /// Failed to accept connection.
    #[error("Failed to accept: {0}")]
    Accept(std::io::Error),
}

/// A bounded TCP listener that limits concurrent inbound routes.
///
/// Uses a semaphore to enforce `max_routes`. When the limit is reached,
/// new connections wait until a slot becomes available.
pub struct Listener {
    inner: TcpListener,
    connection_limit: Arc<Semaphore>,
    max_routes: usize,
}

impl Listener {
    /// Bind to the configured cluster address.
    pub async fn bind(config: &ClusterConfig) -> Result<Self, ListenerError> {
        let addr: SocketAddr = config
            .bind_address
            .parse()
            .map_err(|e| ListenerError::Bind(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;

        let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
        let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

        tracing::info!(
            address = %local_addr,
            max_routes = config.max_routes,
            "Route listener bound"
        );

        Ok(Self {
            inner: listener,
            connection_limit: Arc::new(Semaphore::new(config.max_routes)),
            max_routes: config.max_routes,
        })
    }

    /// Accept a new connection, respecting the route limit.
    ///
    /// Returns the stream and a permit that must be held for the route's lifetime.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit), ListenerError> {
        let permit = self
            .connection_limit
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| ListenerError::Accept(std::io::Error::other(e)))?;

        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Route connection accepted"
        );

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    pub fn max_routes(&self) -> usize {
        self.max_routes
    }

    /// Accept routes until shutdown, serving each on its own task.
    pub async fn run(self, registry: Arc<RouteRegistry>, settings: RouteSettings, shutdown: Shutdown) {
        let mut shutdown_rx = shutdown.subscribe();
        let settings = Arc::new(settings);
        loop {
            let accepted = tokio::select! {
                accepted = self.accept() => accepted,
                _ = shutdown_rx.recv() => break,
            };
            match accepted {
                Ok((stream, addr, permit)) => {
                    let registry = registry.clone();
                    let settings = settings.clone();
                    tokio::spawn(async move {
                        accept_route(stream, addr, registry, &settings).await;
                        drop(permit);
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Route accept failed");
                }
            }
        }
        tracing::info!("Route listener stopped");
    }
}

async fn accept_route(stream: TcpStream, addr: SocketAddr, registry: Arc<RouteRegistry>, settings: &RouteSettings) {
    let remote = stream.peer_endpoint();
    let (stream, peer_name) = match handshake(stream, &settings.server_name, settings.handshake_timeout).await {
        Ok(done) => done,
        Err(e) => {
            tracing::warn!(peer_addr = %addr, error = %e, "Inbound route handshake failed");
            return;
        }
    };

    let (record, channels) = RouteRecord::new(None, remote, false);
    registry.add(record.clone());
    tracing::info!(route_id = %record.id(), peer_addr = %addr, peer = %peer_name, "Accepted route");

    serve_route(stream, record, channels, registry, settings.max_payload).await;
}

/// A permit representing an inbound route slot.
///
/// When dropped, the slot is released back to the pool.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconnectConfig;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn cluster(max_routes: usize) -> ClusterConfig {
        ClusterConfig {
            bind_address: "127.0.0.1:0".into(),
            max_routes,
            ..ClusterConfig::default()
        }
    }

    fn settings() -> RouteSettings {
        RouteSettings {
            server_name: "node-a".into(),
            connect_timeout: Duration::from_secs(1),
            handshake_timeout: Duration::from_secs(1),
            max_payload: 1024,
            reconnect: ReconnectConfig::default(),
        }
    }

    #[tokio::test]
    async fn bind_rejects_bad_address() {
        let config = ClusterConfig {
            bind_address: "not-an-address".into(),
            ..ClusterConfig::default()
        };
        assert!(matches!(Listener::bind(&config).await, Err(ListenerError::Bind(_))));
    }

    #[tokio::test]
    async fn permits_are_released_on_drop() {
        let listener = Listener::bind(&cluster(2)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _client = TcpStream::connect(addr).await.unwrap();

        let (_stream, _peer, permit) = listener.accept().await.unwrap();
        assert_eq!(listener.available_permits(), 1);
        drop(permit);
        assert_eq!(listener.available_permits(), 2);
        assert_eq!(listener.max_routes(), 2);
    }

    #[tokio::test]
    async fn accepted_route_is_unsolicited_without_url() {
        let listener = Listener::bind(&cluster(4)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let registry = Arc::new(RouteRegistry::new());
        let shutdown = Shutdown::new();
        let task = tokio::spawn(listener.run(registry.clone(), settings(), shutdown.clone()));

        let mut peer = BufReader::new(TcpStream::connect(addr).await.unwrap());
        peer.get_mut().write_all(b"INFO node-b\r\n").await.unwrap();
        let mut line = String::new();
        peer.read_line(&mut line).await.unwrap();
        assert_eq!(line, "INFO node-a\r\n");

        tokio::time::timeout(Duration::from_secs(2), async {
            while registry.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        let snap = registry.snapshot()[0].snapshot();
        assert!(!snap.solicited);
        assert!(snap.url.is_none());
        assert!(snap.remote.is_some());

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
    }
}
