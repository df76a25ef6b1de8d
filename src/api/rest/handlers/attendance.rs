//! Participant and check-in endpoints.
//!
//! - `GET /events/{id}/participants`, `POST /events/{id}/participants` (operator)
//! - `GET /participants/{id}`, `DELETE /participants/{id}` (operator)
//! - `GET /participants/{id}/ticket`: PDF ticket
//! - `GET /events/{id}/checkins`, `POST /events/{id}/checkins` (operator)
//! - `GET /events/{id}/checkins/stats`
//! - `POST /checkins/{id}/checkout` (operator)

use super::{Json, Path};
use crate::api::rest::auth::{AuthUser, Role};
use crate::api::rest::error::{ApiError, ApiResult};
use crate::api::rest::state::AppState;
use crate::application::services::CheckinRequest;
use crate::domain::entities::{CheckinLog, Participant, ParticipantDetails};
use crate::domain::services::CheckinStats;
use crate::domain::value_objects::{CheckinId, EventId, ParticipantId};
use crate::infrastructure::documents::{TicketContent, render_ticket};
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use tracing::error;

// ========== Participants ==========

/// Lists an event's participants.
pub async fn list_participants(
    user: AuthUser,
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> ApiResult<Json<Vec<Participant>>> {
    Ok(Json(state.events.list_participants(user.tenant, event_id).await?))
}

/// Registers a participant.
pub async fn register_participant(
    user: AuthUser,
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
    Json(details): Json<ParticipantDetails>,
) -> ApiResult<(StatusCode, Json<Participant>)> {
    user.require(Role::Operator)?;
    let participant = state
        .events
        .register_participant(user.tenant, event_id, details)
        .await?;
    state.dashboards.invalidate(user.tenant, event_id).await;
    Ok((StatusCode::CREATED, Json(participant)))
}

/// Returns one participant.
pub async fn get_participant(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<ParticipantId>,
) -> ApiResult<Json<Participant>> {
    Ok(Json(state.events.get_participant(user.tenant, id).await?))
}

/// Cancels a registration.
pub async fn cancel_participant(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<ParticipantId>,
) -> ApiResult<Json<Participant>> {
    user.require(Role::Operator)?;
    let participant = state.events.cancel_participant(user.tenant, id).await?;
    state
        .dashboards
        .invalidate(user.tenant, participant.event_id())
        .await;
    Ok(Json(participant))
}

/// Renders the participant's ticket as a PDF download.
pub async fn participant_ticket(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<ParticipantId>,
) -> ApiResult<impl IntoResponse> {
    let participant = state.events.get_participant(user.tenant, id).await?;
    let event = state.events.get(user.tenant, participant.event_id()).await?;
    let content = TicketContent::new(&event, &participant);

    let pdf = tokio::task::spawn_blocking(move || render_ticket(&content))
        .await
        .map_err(|e| {
            error!(participant_id = %id, error = %e, "ticket task failed");
            ApiError::internal()
        })?
        .map_err(|e| {
            error!(participant_id = %id, error = %e, "ticket not rendered");
            ApiError::internal()
        })?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"ingresso-{id}.pdf\""),
            ),
        ],
        pdf,
    ))
}

// ========== Check-in ==========

/// Lists an event's check-ins, newest first.
pub async fn list_checkins(
    user: AuthUser,
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> ApiResult<Json<Vec<CheckinLog>>> {
    Ok(Json(state.checkins.list(user.tenant, event_id).await?))
}

/// Checks a participant in by QR token, CPF or id.
pub async fn check_in(
    user: AuthUser,
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
    Json(request): Json<CheckinRequest>,
) -> ApiResult<(StatusCode, Json<CheckinLog>)> {
    user.require(Role::Operator)?;
    let log = state
        .checkins
        .check_in(user.tenant, event_id, user.user_id, request)
        .await?;
    state.dashboards.invalidate(user.tenant, event_id).await;
    Ok((StatusCode::CREATED, Json(log)))
}

/// Door figures of an event.
pub async fn checkin_stats(
    user: AuthUser,
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> ApiResult<Json<CheckinStats>> {
    Ok(Json(state.checkins.stats(user.tenant, event_id).await?))
}

/// Closes a check-in session.
pub async fn check_out(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<CheckinId>,
) -> ApiResult<Json<CheckinLog>> {
    user.require(Role::Operator)?;
    let log = state.checkins.check_out(user.tenant, id).await?;
    state.dashboards.invalidate(user.tenant, log.event_id()).await;
    Ok(Json(log))
}
