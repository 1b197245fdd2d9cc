use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::router::StockState;
use crate::service::HealthStatus;

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<HealthStatus> for CheckResult {
    fn from(status: HealthStatus) -> Self {
        match status {
            HealthStatus::Healthy => Self {
                healthy: true,
                message: None,
            },
            HealthStatus::Unhealthy { cause } => Self {
                healthy: false,
                message: Some(cause),
            },
        }
    }
}

/// GET /healthcheck -> 200 when every check passes, 500 otherwise.
pub async fn healthcheck_handler(State(state): State<StockState>) -> Response {
    let status = state.health.check().await;
    let status_code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    let mut checks = BTreeMap::new();
    checks.insert(state.health.name(), CheckResult::from(status));
    (status_code, Json(checks)).into_response()
}
