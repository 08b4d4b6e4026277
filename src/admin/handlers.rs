use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::admin::error::AdminError;
use crate::admin::service::RouteAdminService;
use crate::observability::metrics;

/// State injected into the admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub service: Arc<RouteAdminService>,
    /// Status for a failed connect attempt (200 unless configured strict).
    pub connect_failure_status: StatusCode,
}

impl AdminState {
    pub fn new(service: Arc<RouteAdminService>, strict_connect_status: bool) -> Self {
        let connect_failure_status = if strict_connect_status {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::OK
        };
        Self {
            service,
            connect_failure_status,
        }
    }
}

/// `GET /routez`
pub async fn list_routes(State(state): State<AdminState>) -> Response {
    let routez = state.service.list();
    match serde_json::to_vec_pretty(&routez) {
        Ok(body) => {
            metrics::record_admin_request("list", StatusCode::OK.as_u16());
            ([(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
        Err(e) => {
            let err = AdminError::from(e);
            tracing::error!(error = %err, "Error marshalling response to routez request");
            metrics::record_admin_request("list", StatusCode::INTERNAL_SERVER_ERROR.as_u16());
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `PUT /routez` with the route URL as body.
pub async fn add_route(State(state): State<AdminState>, body: Bytes) -> Response {
    let raw = String::from_utf8_lossy(&body);
    match state.service.connect(&raw).await {
        Ok(_) => ok_response("add"),
        Err(e) => error_response("add", e, state.connect_failure_status),
    }
}

/// `DELETE /routez` with the exact route URL as body.
pub async fn remove_route(State(state): State<AdminState>, body: Bytes) -> Response {
    let raw = String::from_utf8_lossy(&body);
    match state.service.disconnect(&raw) {
        Ok(_) => ok_response("remove"),
        Err(e) => error_response("remove", e, state.connect_failure_status),
    }
}

fn ok_response(op: &'static str) -> Response {
    metrics::record_admin_request(op, StatusCode::OK.as_u16());
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

fn error_response(op: &'static str, err: AdminError, connect_failure_status: StatusCode) -> Response {
    let status = err.status_code(connect_failure_status);
    if err.is_server_fault() {
        tracing::error!(op, error = %err, "Admin request failed");
    } else {
        tracing::debug!(op, status = %status, error = %err, "Admin request rejected");
    }
    metrics::record_admin_request(op, status.as_u16());
    (status, Json(err.body())).into_response()
}
