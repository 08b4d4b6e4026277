//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a node.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for a broker node's route surface.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct NodeConfig {
    /// Node identity.
    pub node: NodeIdentityConfig,

    /// Cluster listener and seed routes.
    pub cluster: ClusterConfig,

    /// Admin endpoint settings.
    pub admin: AdminConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Reconnect policy for solicited routes.
    pub reconnect: ReconnectConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Node identity announced to peers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeIdentityConfig {
    /// Name sent in the INFO handshake frame.
    pub server_name: String,
}

impl Default for NodeIdentityConfig {
    fn default() -> Self {
        Self {
            server_name: "routez".to_string(),
        }
    }
}

/// Cluster (route) listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Bind address for inbound routes (e.g., "0.0.0.0:6222").
    pub bind_address: String,

    /// Maximum concurrent inbound routes (backpressure).
    pub max_routes: usize,

    /// Route URLs to solicit at startup.
    pub routes: Vec<String>,

    /// Largest message payload accepted from a peer, in bytes.
    pub max_payload: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:6222".to_string(),
            max_routes: 1024,
            routes: Vec::new(),
            max_payload: 1024 * 1024,
        }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve the admin endpoint.
    pub enabled: bool,

    /// Admin endpoint bind address.
    pub bind_address: String,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Answer failed route connects with 502 instead of 200.
    pub strict_connect_status: bool,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:8222".to_string(),
            max_body_size: 1024,
            request_timeout_secs: 30,
            strict_connect_status: false,
        }
    }
}

/// Timeout configuration for route establishment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// TCP connect timeout in seconds.
    pub connect_secs: u64,

    /// INFO exchange timeout in seconds.
    pub handshake_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 2,
            handshake_secs: 2,
        }
    }
}

/// Reconnect configuration for solicited routes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Redial solicited routes that drop.
    pub enabled: bool,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Attempts per lost route before giving up (0 = unlimited).
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            max_attempts: 0,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
