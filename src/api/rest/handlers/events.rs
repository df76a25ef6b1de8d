//! Event endpoints.
//!
//! - `GET /events` (alias `/eventos`): list, `?status=&page=&per_page=`
//! - `POST /events`: create a draft (manager)
//! - `GET /events/{id}`, `PUT /events/{id}` (manager)
//! - `DELETE /events/{id}?reason=`: cancel and notify participants (manager)
//! - `POST /events/{id}/publish|start|finish` (manager)
//! - `GET /events/{id}/dashboard`

use super::{Json, Path, Query, page_of};
use crate::api::rest::auth::{AuthUser, Role};
use crate::api::rest::error::ApiResult;
use crate::api::rest::state::AppState;
use crate::application::services::{EventCancellation, EventPage};
use crate::domain::entities::{Event, EventDetails};
use crate::domain::services::EventDashboard;
use crate::domain::value_objects::{EventId, EventStatus};
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

/// Query of `GET /events`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Only events in this status.
    pub status: Option<EventStatus>,
    /// Page number, from 1.
    pub page: Option<usize>,
    /// Page size.
    pub per_page: Option<usize>,
}

/// Query of `DELETE /events/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelParams {
    /// Why the event is cancelled; sent to participants.
    pub reason: String,
}

/// Lists the tenant's events.
pub async fn list_events(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> ApiResult<Json<EventPage>> {
    let page = page_of(filter.page, filter.per_page);
    Ok(Json(state.events.list(user.tenant, filter.status, page).await?))
}

/// Creates a draft event.
pub async fn create_event(
    user: AuthUser,
    State(state): State<AppState>,
    Json(details): Json<EventDetails>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    user.require(Role::Manager)?;
    let event = state.events.create(user.tenant, details).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// Returns one event.
pub async fn get_event(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> ApiResult<Json<Event>> {
    Ok(Json(state.events.get(user.tenant, id).await?))
}

/// Replaces an event's details.
pub async fn update_event(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<EventId>,
    Json(details): Json<EventDetails>,
) -> ApiResult<Json<Event>> {
    user.require(Role::Manager)?;
    let event = state.events.update(user.tenant, id, details).await?;
    state.dashboards.invalidate(user.tenant, id).await;
    Ok(Json(event))
}

/// Cancels an event. The row is kept with status `CANCELLED`.
pub async fn cancel_event(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<EventId>,
    Query(params): Query<CancelParams>,
) -> ApiResult<Json<EventCancellation>> {
    user.require(Role::Manager)?;
    let cancellation = state.events.cancel(user.tenant, id, &params.reason).await?;
    state.dashboards.invalidate(user.tenant, id).await;
    Ok(Json(cancellation))
}

/// Opens registrations.
pub async fn publish_event(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> ApiResult<Json<Event>> {
    user.require(Role::Manager)?;
    Ok(Json(state.events.publish(user.tenant, id).await?))
}

/// Opens the doors.
pub async fn start_event(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> ApiResult<Json<Event>> {
    user.require(Role::Manager)?;
    Ok(Json(state.events.start(user.tenant, id).await?))
}

/// Closes the event.
pub async fn finish_event(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> ApiResult<Json<Event>> {
    user.require(Role::Manager)?;
    let event = state.events.finish(user.tenant, id).await?;
    state.dashboards.invalidate(user.tenant, id).await;
    Ok(Json(event))
}

/// Attendance, sales and payment figures, cached briefly.
pub async fn event_dashboard(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> ApiResult<Json<EventDashboard>> {
    Ok(Json(state.dashboards.dashboard(user.tenant, id).await?))
}
