//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use routez::{AdminServer, Node, NodeConfig, Shutdown};

/// A fake peer node accepting route connections.
pub struct MockPeer {
    pub addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
    kill_tx: broadcast::Sender<()>,
}

impl MockPeer {
    pub fn url(&self) -> String {
        format!("nats://{}", self.addr)
    }

    /// Connections accepted so far.
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Close every open route connection from the peer's side.
    pub fn drop_connections(&self) {
        let _ = self.kill_tx.send(());
    }
}

/// Start a mock peer that answers the INFO exchange and then writes `greeting`.
pub async fn start_mock_peer(greeting: &'static [u8]) -> MockPeer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let (kill_tx, _) = broadcast::channel(4);

    let counter = accepted.clone();
    let kill = kill_tx.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let mut kill_rx = kill.subscribe();
            tokio::spawn(async move {
                let mut reader = BufReader::new(socket);
                if reader.get_mut().write_all(b"INFO mock-peer\r\n").await.is_err() {
                    return;
                }
                let _ = reader.get_mut().write_all(greeting).await;
                let mut line = String::new();
                loop {
                    line.clear();
                    tokio::select! {
                        read = reader.read_line(&mut line) => match read {
                            Ok(0) | Err(_) => break,
                            Ok(_) => {}
                        },
                        _ = kill_rx.recv() => break,
                    }
                }
            });
        }
    });

    MockPeer {
        addr,
        accepted,
        kill_tx,
    }
}

/// Node configuration suited to tests: ephemeral ports, fast reconnects.
pub fn test_config() -> NodeConfig {
    let mut config = NodeConfig::default();
    config.node.server_name = "node-under-test".into();
    config.cluster.bind_address = "127.0.0.1:0".into();
    config.timeouts.connect_secs = 1;
    config.timeouts.handshake_secs = 1;
    config.reconnect.base_delay_ms = 20;
    config.reconnect.max_delay_ms = 100;
    config
}

/// A node with its admin endpoint served on an ephemeral port.
pub struct TestNode {
    pub node: Node,
    pub admin_url: String,
    pub shutdown: Shutdown,
}

impl TestNode {
    pub fn routez(&self) -> String {
        format!("{}/routez", self.admin_url)
    }
}

impl Drop for TestNode {
    fn drop(&mut self) {
        self.shutdown.trigger();
        self.node.close_all_routes();
    }
}

pub async fn start_node(config: NodeConfig) -> TestNode {
    let shutdown = Shutdown::new();
    let node = Node::start(&config, shutdown.clone()).await.unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let admin_addr = listener.local_addr().unwrap();
    let server = AdminServer::new(config.admin.clone(), node.admin_service());
    tokio::spawn(server.run(listener, shutdown.clone()));

    TestNode {
        node,
        admin_url: format!("http://{}", admin_addr),
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Synchronous variant of [`eventually`] for in-process state.
pub async fn wait_until<F: Fn() -> bool>(check: F) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
