//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Bind addresses parse as socket addresses
//! - Seed route URLs parse and name a host
//! - Value ranges (timeouts > 0, backoff bounds ordered)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: NodeConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::NodeConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("cluster.routes: invalid route URL '{url}': {message}")]
    InvalidRouteUrl { url: String, message: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("reconnect.base_delay_ms ({base}) exceeds reconnect.max_delay_ms ({max})")]
    BackoffBounds { base: u64, max: u64 },

    #[error("node.server_name must be a single non-empty token")]
    ServerName,
}

pub fn validate_config(config: &NodeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let name = &config.node.server_name;
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        errors.push(ValidationError::ServerName);
    }

    check_address(&mut errors, "cluster.bind_address", &config.cluster.bind_address);
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }
    if config.observability.metrics_enabled {
        check_address(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }

    for route in &config.cluster.routes {
        match Url::parse(route) {
            Ok(url) if url.host_str().is_none() => errors.push(ValidationError::InvalidRouteUrl {
                url: route.clone(),
                message: "missing host".to_string(),
            }),
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::InvalidRouteUrl {
                url: route.clone(),
                message: e.to_string(),
            }),
        }
    }

    let positive: [(&'static str, u64); 5] = [
        ("cluster.max_routes", config.cluster.max_routes as u64),
        ("admin.max_body_size", config.admin.max_body_size as u64),
        ("admin.request_timeout_secs", config.admin.request_timeout_secs),
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.handshake_secs", config.timeouts.handshake_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    if config.reconnect.base_delay_ms > config.reconnect.max_delay_ms {
        errors.push(ValidationError::BackoffBounds {
            base: config.reconnect.base_delay_ms,
            max: config.reconnect.max_delay_ms,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
