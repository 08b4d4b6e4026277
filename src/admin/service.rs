//! Route admin operations.
//!
//! # Responsibilities
//! - List: per-route views of the registry
//! - Connect: parse a URL and make one outbound attempt
//! - Disconnect: give up reconnect ownership, then signal close
//!
//! # Design Decisions
//! - No lock is held across the connect attempt; the connector registers
//!   the route itself once the handshake completes
//! - Disconnect clears the solicited flag while the registry lock is held,
//!   so a connection task that unregisters concurrently either sees the
//!   cleared flag or makes Disconnect miss the route
//! - Disconnect returns as soon as close is signalled; the connection task
//!   removes the record when its teardown finishes

use std::net::SocketAddr;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::admin::error::AdminError;
use crate::route::{RouteConnector, RouteRecord, RouteRegistry, RouteSnapshot};

/// Response body of the list operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routez {
    pub num_routes: usize,
    pub routes: Vec<RouteInfo>,
}

/// Public view of one route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub cid: u64,
    pub url: String,
    pub ip: String,
    pub port: u16,
    pub solicited: bool,
    pub subscriptions: usize,
    pub pending_size: usize,
    pub in_msgs: u64,
    pub out_msgs: u64,
    pub in_bytes: u64,
    pub out_bytes: u64,
}

impl From<RouteSnapshot> for RouteInfo {
    fn from(snap: RouteSnapshot) -> Self {
        let (ip, port) = match snap.remote {
            Some(SocketAddr::V4(addr)) => (addr.ip().to_string(), addr.port()),
            Some(SocketAddr::V6(addr)) => (addr.ip().to_string(), addr.port()),
            None => (String::new(), 0),
        };
        Self {
            cid: snap.id.as_u64(),
            url: snap.url.unwrap_or_default(),
            ip,
            port,
            solicited: snap.solicited,
            subscriptions: snap.subscriptions,
            pending_size: snap.pending_bytes,
            in_msgs: snap.in_msgs,
            out_msgs: snap.out_msgs,
            in_bytes: snap.in_bytes,
            out_bytes: snap.out_bytes,
        }
    }
}

/// Strip NUL padding and surrounding whitespace from a request body.
pub fn normalize_body(raw: &str) -> &str {
    raw.trim_matches(|c: char| c == '\0' || c.is_ascii_whitespace())
}

/// List / Connect / Disconnect over a route registry.
pub struct RouteAdminService {
    registry: Arc<RouteRegistry>,
    connector: Arc<dyn RouteConnector>,
}

impl RouteAdminService {
    pub fn new(registry: Arc<RouteRegistry>, connector: Arc<dyn RouteConnector>) -> Self {
        Self { registry, connector }
    }

    pub fn registry(&self) -> &Arc<RouteRegistry> {
        &self.registry
    }

    /// Current routes. Each entry is consistent on its own; entries are not
    /// captured at one common instant, and their order is unspecified.
    pub fn list(&self) -> Routez {
        let routes: Vec<RouteInfo> = self
            .registry
            .snapshot()
            .iter()
            .map(|record| RouteInfo::from(record.snapshot()))
            .collect();
        Routez {
            num_routes: routes.len(),
            routes,
        }
    }

    /// Parse `raw` as a URL and make exactly one attempt to route to it.
    pub async fn connect(&self, raw: &str) -> Result<Arc<RouteRecord>, AdminError> {
        let text = normalize_body(raw);
        let url = Url::parse(text).map_err(|e| {
            tracing::debug!(input = %text, error = %e, "Rejected route URL");
            AdminError::InvalidUrl(e)
        })?;

        match self.connector.connect_once(&url).await {
            Ok(record) => {
                tracing::info!(route_id = %record.id(), url = %url, "Route added via admin");
                Ok(record)
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Admin route connect failed");
                Err(AdminError::ConnectionFailed(e))
            }
        }
    }

    /// Tear down the route whose URL equals `raw` exactly.
    pub fn disconnect(&self, raw: &str) -> Result<Arc<RouteRecord>, AdminError> {
        let url = normalize_body(raw);
        // Flag cleared under the registry lock, before close: the connection
        // task redials on close while solicited.
        let record = self.registry.release_by_url(url).ok_or(AdminError::RouteNotFound)?;
        record.close();

        tracing::info!(route_id = %record.id(), url = %url, "Route removal requested via admin");
        Ok(record)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::route::record::RouteChannels;
    use crate::route::ConnectError;
    use futures_util::future::{BoxFuture, FutureExt};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Registers a record on success without touching the network.
    #[derive(Default)]
    pub(crate) struct FakeConnector {
        pub registry: Arc<RouteRegistry>,
        pub fail: bool,
        pub attempts: AtomicUsize,
        pub channels: Mutex<Vec<RouteChannels>>,
    }

    impl FakeConnector {
        pub fn new(registry: Arc<RouteRegistry>, fail: bool) -> Self {
            Self {
                registry,
                fail,
                ..Self::default()
            }
        }
    }

    impl RouteConnector for FakeConnector {
        fn connect_once<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Arc<RouteRecord>, ConnectError>> {
            async move {
                self.attempts.fetch_add(1, Ordering::SeqCst);
                if self.fail {
                    return Err(ConnectError::Io(std::io::Error::new(
                        std::io::ErrorKind::ConnectionRefused,
                        "connection refused",
                    )));
                }
                let (record, channels) = RouteRecord::new(Some(url.clone()), None, true);
                self.registry.add(record.clone());
                self.channels.lock().unwrap().push(channels);
                Ok(record)
            }
            .boxed()
        }
    }

    fn service(fail: bool) -> (RouteAdminService, Arc<FakeConnector>) {
        let registry = Arc::new(RouteRegistry::new());
        let connector = Arc::new(FakeConnector::new(registry.clone(), fail));
        (RouteAdminService::new(registry, connector.clone()), connector)
    }

    #[test]
    fn normalize_strips_padding() {
        assert_eq!(normalize_body("nats://a:1\0\0\0"), "nats://a:1");
        assert_eq!(normalize_body("  nats://a:1\r\n"), "nats://a:1");
        assert_eq!(normalize_body("\0\0"), "");
    }

    #[test]
    fn list_empty() {
        let (svc, _) = service(false);
        let routez = svc.list();
        assert_eq!(routez, Routez { num_routes: 0, routes: vec![] });
        let json = serde_json::to_value(&routez).unwrap();
        assert_eq!(json, serde_json::json!({ "num_routes": 0, "routes": [] }));
    }

    #[test]
    fn route_info_renders_missing_endpoint_as_empty() {
        let (record, _channels) = RouteRecord::new(None, None, false);
        let info = RouteInfo::from(record.snapshot());
        assert_eq!(info.ip, "");
        assert_eq!(info.port, 0);
        assert_eq!(info.url, "");
    }

    #[test]
    fn route_info_renders_endpoint() {
        let remote: SocketAddr = "10.1.2.3:6222".parse().unwrap();
        let (record, _channels) = RouteRecord::new(None, Some(remote), false);
        let info = RouteInfo::from(record.snapshot());
        assert_eq!(info.ip, "10.1.2.3");
        assert_eq!(info.port, 6222);
    }

    #[tokio::test]
    async fn connect_then_list() {
        let (svc, connector) = service(false);
        svc.connect("nats://127.0.0.1:4222").await.unwrap();
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);

        let routez = svc.list();
        assert_eq!(routez.num_routes, 1);
        assert_eq!(routez.routes[0].url, "nats://127.0.0.1:4222");
        assert!(routez.routes[0].solicited);
    }

    #[tokio::test]
    async fn connect_trims_padding() {
        let (svc, _) = service(false);
        svc.connect("nats://127.0.0.1:4222\0\0\0\0").await.unwrap();
        assert_eq!(svc.list().routes[0].url, "nats://127.0.0.1:4222");
    }

    #[tokio::test]
    async fn invalid_url_does_not_touch_registry() {
        let (svc, connector) = service(false);
        let err = svc.connect("not a url://").await.unwrap_err();
        assert!(matches!(err, AdminError::InvalidUrl(_)));
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 0);
        assert!(svc.registry().is_empty());
    }

    #[tokio::test]
    async fn failed_connect_is_single_attempt() {
        let (svc, connector) = service(true);
        let err = svc.connect("nats://127.0.0.1:4222").await.unwrap_err();
        assert!(err.to_string().starts_with("could not connect: "));
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
        assert!(svc.registry().is_empty());
    }

    #[test]
    fn disconnect_unknown_route() {
        let (svc, _) = service(false);
        let (other, _channels) = RouteRecord::new(Some(Url::parse("nats://10.0.0.9:6222").unwrap()), None, true);
        svc.registry().add(other.clone());

        let err = svc.disconnect("nats://10.0.0.1:6222").unwrap_err();
        assert!(matches!(err, AdminError::RouteNotFound));
        assert_eq!(svc.registry().len(), 1);
        assert!(other.is_solicited());
        assert!(!other.is_closing());
    }

    #[tokio::test]
    async fn disconnect_clears_solicited_before_close() {
        let (svc, connector) = service(false);
        let record = svc.connect("nats://127.0.0.1:4222").await.unwrap();
        let mut close = connector.channels.lock().unwrap().pop().unwrap().close;

        let observer = {
            let record = record.clone();
            tokio::spawn(async move {
                let _ = close.wait_for(|closing| *closing).await;
                record.is_solicited()
            })
        };

        let removed = svc.disconnect("nats://127.0.0.1:4222").unwrap();
        assert_eq!(removed.id(), record.id());
        assert!(!observer.await.unwrap(), "solicited must be false once close is visible");

        // Still listed until the connection task finishes its teardown.
        let routez = svc.list();
        assert_eq!(routez.num_routes, 1);
        assert!(!routez.routes[0].solicited);

        svc.registry().remove(record.id());
        assert_eq!(svc.list().num_routes, 0);
    }

    #[test]
    fn list_reads_each_record_consistently() {
        let (svc, _) = service(false);
        let records: Vec<_> = (0..4)
            .map(|_| {
                let (record, channels) = RouteRecord::new(None, None, false);
                svc.registry().add(record.clone());
                (record, channels)
            })
            .collect();

        let writers: Vec<_> = records
            .iter()
            .map(|(record, _)| {
                let record = record.clone();
                std::thread::spawn(move || {
                    for _ in 0..5_000 {
                        record.record_inbound(16);
                    }
                })
            })
            .collect();

        for _ in 0..500 {
            for info in svc.list().routes {
                assert_eq!(info.in_bytes, info.in_msgs * 16);
            }
        }
        for w in writers {
            w.join().unwrap();
        }
        assert!(svc.list().routes.iter().all(|r| r.in_msgs == 5_000));
    }

    #[test]
    fn disconnect_racing_teardown_never_redials() {
        let (svc, _) = service(false);
        let url = "nats://127.0.0.1:4222";
        for _ in 0..2_000 {
            let (record, _channels) = RouteRecord::new(Some(Url::parse(url).unwrap()), None, true);
            svc.registry().add(record.clone());
            let barrier = Arc::new(std::sync::Barrier::new(2));

            let teardown = {
                let registry = svc.registry().clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    // Tail of a finished connection task: unregister, then
                    // redial only if still solicited.
                    registry.remove(record.id());
                    record.is_solicited()
                })
            };

            barrier.wait();
            let removed = svc.disconnect(url).is_ok();
            let redialed = teardown.join().unwrap();
            assert!(!(removed && redialed), "redial decided after a successful disconnect");
            assert!(svc.registry().is_empty());
        }
    }
}
