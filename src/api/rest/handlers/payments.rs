//! Payment, refund and webhook endpoints.
//!
//! - `GET /payments?event_id=&status=`, `POST /payments` (operator)
//! - `GET /payments/{id}`
//! - `POST /payments/{id}/confirm|cancel` (manager)
//! - `POST /webhooks/payments`: provider callback, signed, no bearer token
//! - `GET /refunds?state=&transaction_id=`, `POST /refunds` (operator)
//! - `GET /refunds/{id}`
//! - `POST /refunds/{id}/approve|reject|retry` (manager)

use super::{Json, Path, Query, page_of};
use crate::api::rest::auth::{AuthUser, Role};
use crate::api::rest::error::{ApiError, ApiResult};
use crate::api::rest::state::AppState;
use crate::application::services::{CreatePayment, RefundRequest, WebhookOutcome};
use crate::domain::entities::{Refund, Transaction};
use crate::domain::value_objects::{
    EventId, RefundId, RefundState, TenantId, TransactionId, TransactionStatus,
};
use crate::infrastructure::gateways::SIGNATURE_HEADER;
use crate::infrastructure::persistence::TransactionFilter;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Query of `GET /payments`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentQuery {
    /// Only payments of this event.
    pub event_id: Option<EventId>,
    /// Only payments in this status.
    pub status: Option<TransactionStatus>,
    /// Page number, from 1.
    pub page: Option<usize>,
    /// Page size.
    pub per_page: Option<usize>,
}

/// Query of `GET /refunds`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefundQuery {
    /// Only refunds in this state.
    pub state: Option<RefundState>,
    /// Every refund of one transaction; paging is ignored.
    pub transaction_id: Option<TransactionId>,
    /// Page number, from 1.
    pub page: Option<usize>,
    /// Page size.
    pub per_page: Option<usize>,
}

/// Body of `POST /refunds/{id}/reject`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RejectRefund {
    /// Shown to the payer.
    pub reason: String,
}

/// Answer to a provider callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    /// Whether the transaction changed.
    pub outcome: WebhookOutcome,
}

// ========== Payments ==========

/// Lists payments, newest first.
pub async fn list_payments(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaymentQuery>,
) -> ApiResult<Json<Vec<Transaction>>> {
    let filter = TransactionFilter {
        event_id: query.event_id,
        status: query.status,
    };
    let page = page_of(query.page, query.per_page);
    Ok(Json(state.payments.list(user.tenant, filter, page).await?))
}

/// Charges a payer. A declined card still creates the transaction, in
/// status `FAILED`.
pub async fn create_payment(
    user: AuthUser,
    State(state): State<AppState>,
    Json(request): Json<CreatePayment>,
) -> ApiResult<(StatusCode, Json<Transaction>)> {
    user.require(Role::Operator)?;
    let event_id = request.event_id;
    let tx = state.payments.create(user.tenant, request).await?;
    state.dashboards.invalidate(user.tenant, event_id).await;
    Ok((StatusCode::CREATED, Json(tx)))
}

/// Returns one payment.
pub async fn get_payment(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<TransactionId>,
) -> ApiResult<Json<Transaction>> {
    Ok(Json(state.payments.get(user.tenant, id).await?))
}

/// Confirms a bank transfer or cash payment by hand.
pub async fn confirm_payment(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<TransactionId>,
) -> ApiResult<Json<Transaction>> {
    user.require(Role::Manager)?;
    let tx = state.payments.confirm(user.tenant, id).await?;
    state.dashboards.invalidate(user.tenant, tx.event_id()).await;
    Ok(Json(tx))
}

/// Cancels a pending payment.
pub async fn cancel_payment(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<TransactionId>,
) -> ApiResult<Json<Transaction>> {
    user.require(Role::Manager)?;
    let tx = state.payments.cancel(user.tenant, id).await?;
    state.dashboards.invalidate(user.tenant, tx.event_id()).await;
    Ok(Json(tx))
}

/// Applies a signed status update from the payment provider.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized(format!("missing {SIGNATURE_HEADER} header")))?;
    let (outcome, tx) = state.payments.apply_webhook(signature, &body).await?;
    if outcome == WebhookOutcome::Applied {
        state.dashboards.invalidate(tx.tenant_id(), tx.event_id()).await;
    }
    info!(?outcome, "payment webhook handled");
    Ok(Json(WebhookAck { outcome }))
}

// ========== Refunds ==========

/// Drops the cached dashboard of the event the refunded payment belongs to.
async fn forget_dashboard(state: &AppState, tenant: TenantId, refund: &Refund) {
    match state.payments.get(tenant, refund.transaction_id()).await {
        Ok(tx) => state.dashboards.invalidate(tenant, tx.event_id()).await,
        Err(e) => warn!(refund = %refund.id(), error = %e, "dashboard not invalidated"),
    }
}

/// Lists refunds, newest first.
pub async fn list_refunds(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<RefundQuery>,
) -> ApiResult<Json<Vec<Refund>>> {
    let refunds = match query.transaction_id {
        Some(tx) => {
            let mut refunds = state.refunds.list_for_transaction(user.tenant, tx).await?;
            if let Some(wanted) = query.state {
                refunds.retain(|r| r.state() == wanted);
            }
            refunds
        }
        None => {
            let page = page_of(query.page, query.per_page);
            state.refunds.list(user.tenant, query.state, page).await?
        }
    };
    Ok(Json(refunds))
}

/// Requests a refund. Small, low-risk refunds are processed before the
/// response; the rest wait for review or are rejected by policy.
pub async fn request_refund(
    user: AuthUser,
    State(state): State<AppState>,
    Json(request): Json<RefundRequest>,
) -> ApiResult<(StatusCode, Json<Refund>)> {
    user.require(Role::Operator)?;
    let refund = state.refunds.request(user.tenant, user.user_id, request).await?;
    forget_dashboard(&state, user.tenant, &refund).await;
    Ok((StatusCode::CREATED, Json(refund)))
}

/// Returns one refund.
pub async fn get_refund(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<RefundId>,
) -> ApiResult<Json<Refund>> {
    Ok(Json(state.refunds.get(user.tenant, id).await?))
}

/// Approves a refund under review and processes it.
pub async fn approve_refund(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<RefundId>,
) -> ApiResult<Json<Refund>> {
    user.require(Role::Manager)?;
    let refund = state.refunds.approve(user.tenant, id, user.user_id).await?;
    forget_dashboard(&state, user.tenant, &refund).await;
    Ok(Json(refund))
}

/// Rejects a refund under review.
pub async fn reject_refund(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<RefundId>,
    Json(body): Json<RejectRefund>,
) -> ApiResult<Json<Refund>> {
    user.require(Role::Manager)?;
    let refund = state
        .refunds
        .reject(user.tenant, id, user.user_id, &body.reason)
        .await?;
    forget_dashboard(&state, user.tenant, &refund).await;
    Ok(Json(refund))
}

/// Processes a failed refund again.
pub async fn retry_refund(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<RefundId>,
) -> ApiResult<Json<Refund>> {
    user.require(Role::Manager)?;
    let refund = state.refunds.retry(user.tenant, id).await?;
    forget_dashboard(&state, user.tenant, &refund).await;
    Ok(Json(refund))
}
