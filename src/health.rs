//! Liveness and readiness endpoints for the HTTP transport.

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    fn status_code(&self) -> StatusCode {
        match self {
            // Degraded still serves traffic.
            HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub workspace_root: String,
    pub workspace_accessible: bool,
    pub bridge_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

pub async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

pub async fn readiness_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = state.config();
    let workspace_accessible =
        config.workspace_root.exists() && config.workspace_root.is_dir();
    let bridge_available = state.bridge().is_some_and(|b| b.is_available());

    let (status, detail) = if !workspace_accessible {
        (
            HealthStatus::Unhealthy,
            Some(format!(
                "workspace root {:?} is not accessible",
                config.workspace_root
            )),
        )
    } else if !bridge_available {
        (
            HealthStatus::Degraded,
            Some("automation bridge unavailable; PDF export disabled".to_string()),
        )
    } else {
        (HealthStatus::Healthy, None)
    };

    let report = HealthReport {
        status,
        workspace_root: config.workspace_root.display().to_string(),
        workspace_accessible,
        bridge_available,
        detail,
    };

    (status.status_code(), Json(report))
}
