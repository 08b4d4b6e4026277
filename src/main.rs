//! routez node
//!
//! # Data Flow
//! ```text
//! Admin client
//!     → http::AdminServer (GET / PUT / DELETE /routez)
//!     → admin::RouteAdminService
//!     → route::RouteRegistry
//!
//! Peer nodes
//!     → net::listener (accepted routes)
//!     ← route::TcpRouteConnector (solicited routes, redial on loss)
//!     → route::RouteRegistry
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use routez::config::{load_config, NodeConfig};
use routez::lifecycle::signals::wait_for_signal;
use routez::observability::{logging, metrics};
use routez::{AdminServer, Node, Shutdown};

#[derive(Parser)]
#[command(name = "routez")]
#[command(about = "Broker node with a route administration endpoint", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => NodeConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "routez starting");

    tracing::info!(
        server_name = %config.node.server_name,
        cluster_address = %config.cluster.bind_address,
        seed_routes = config.cluster.routes.len(),
        admin_enabled = config.admin.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let shutdown = Shutdown::new();
    let node = Node::start(&config, shutdown.clone()).await?;

    let admin_task = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let server = AdminServer::new(config.admin.clone(), node.admin_service());
        Some(tokio::spawn(server.run(listener, shutdown.clone())))
    } else {
        None
    };

    wait_for_signal().await;
    shutdown.trigger();
    node.close_all_routes();

    if let Some(task) = admin_task {
        match task.await {
            Ok(Err(e)) => tracing::error!(error = %e, "Admin server error"),
            Err(e) => tracing::error!(error = %e, "Admin server task failed"),
            Ok(Ok(())) => {}
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
