//! Admin operation errors and their HTTP mapping.

use axum::http::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

use crate::route::ConnectError;

/// Errors surfaced by the route admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Add route body did not parse as a URL. Client error.
    #[error("could not parse URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Remove route body matched no route. Client error, or a benign race
    /// with a route that closed moments earlier.
    #[error("could not find matching route")]
    RouteNotFound,

    /// The one-shot connect attempt failed.
    #[error("could not connect: {0}")]
    ConnectionFailed(#[from] ConnectError),

    /// Producing the response body failed.
    #[error("could not serialize response: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AdminError {
    /// HTTP status for this error. Connect failures use the configured
    /// status since they are neither clearly client nor server faults.
    pub fn status_code(&self, connect_failure_status: StatusCode) -> StatusCode {
        match self {
            AdminError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            AdminError::RouteNotFound => StatusCode::NOT_FOUND,
            AdminError::ConnectionFailed(_) => connect_failure_status,
            AdminError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON error body, `{"error": "<message>"}`.
    pub fn body(&self) -> Value {
        json!({ "error": self.to_string() })
    }

    /// Whether the error reflects a fault on this node.
    pub fn is_server_fault(&self) -> bool {
        matches!(self, AdminError::Serialization(_))
    }
}
