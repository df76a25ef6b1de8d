//! Health, metrics and audit endpoints.
//!
//! - `GET /health`: public liveness summary
//! - `GET /monitoring/health`: component checks (manager)
//! - `GET /monitoring/metrics`: per-route counters (manager)
//! - `GET /audit?aggregate_id=&event_type=&since=` (manager)
//!
//! Both health endpoints answer 503 while the service is Unhealthy.

use super::{Json, Query};
use crate::api::rest::auth::{AuthUser, Role};
use crate::api::rest::error::ApiResult;
use crate::api::rest::state::AppState;
use crate::application::services::{AuditQuery, HealthReport, HealthStatus, MetricsSnapshot};
use crate::domain::events::EventType;
use crate::domain::value_objects::Timestamp;
use crate::infrastructure::persistence::StoredEvent;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSummary {
    /// Overall status.
    pub status: HealthStatus,
    /// Crate version.
    pub version: String,
    /// Seconds since start.
    pub uptime_secs: u64,
}

/// Query of `GET /audit`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AuditParams {
    /// One aggregate's stream.
    pub aggregate_id: Option<Uuid>,
    /// One category.
    pub event_type: Option<EventType>,
    /// Only after this instant.
    pub since: Option<Timestamp>,
}

fn status_code(status: HealthStatus) -> StatusCode {
    if status.is_serving() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Liveness for load balancers.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthSummary>) {
    let report = state.monitor.health().await;
    (
        status_code(report.status),
        Json(HealthSummary {
            status: report.status,
            version: report.version,
            uptime_secs: report.uptime_secs,
        }),
    )
}

/// Every component check.
pub async fn health_report(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<HealthReport>)> {
    user.require(Role::Manager)?;
    let report = state.monitor.health().await;
    Ok((status_code(report.status), Json(report)))
}

/// Request counters.
#[allow(clippy::unused_async)]
pub async fn metrics(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<MetricsSnapshot>> {
    user.require(Role::Manager)?;
    Ok(Json(state.monitor.metrics()))
}

/// The tenant's audit trail.
pub async fn audit_trail(
    user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<AuditParams>,
) -> ApiResult<Json<Vec<StoredEvent>>> {
    user.require(Role::Manager)?;
    let query = AuditQuery {
        aggregate_id: params.aggregate_id,
        event_type: params.event_type,
        since: params.since,
    };
    Ok(Json(state.audit.trail(user.tenant, query).await?))
}
