//! Treasury, notification and cache endpoints.
//!
//! - `GET /treasury/balance`, `GET /treasury/statement?from=&to=` (manager)
//! - `POST /treasury/sweep` (admin)
//! - `GET /notifications?status=`, `POST /notifications` (manager)
//! - `POST /notifications/retry` (manager)
//! - `GET /cache/stats` (manager), `DELETE /cache` (admin)
//! - `GET /cache/{key}`, `PUT /cache/{key}` and `DELETE /cache/{key}` (manager)

use super::{Json, Path, Query, page_of};
use crate::api::rest::auth::{AuthUser, Role};
use crate::api::rest::error::{ApiError, ApiResult};
use crate::api::rest::state::AppState;
use crate::application::services::{NotificationRequest, RetryReport, Statement};
use crate::domain::entities::{LedgerEntry, Notification, TreasuryBalance};
use crate::domain::value_objects::{NotificationStatus, Timestamp};
use crate::infrastructure::cache::CacheStats;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

/// Query of `GET /treasury/statement`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StatementQuery {
    /// First instant included, RFC 3339.
    pub from: Option<Timestamp>,
    /// Last instant included, RFC 3339.
    pub to: Option<Timestamp>,
}

/// Result of a manual sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepResult {
    /// Whether money left the platform account.
    pub swept: bool,
    /// The transfer entry, if any.
    pub entry: Option<LedgerEntry>,
}

/// Query of `GET /notifications`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NotificationQuery {
    /// Only notifications in this status.
    pub status: Option<NotificationStatus>,
    /// Page number, from 1.
    pub page: Option<usize>,
    /// Page size.
    pub per_page: Option<usize>,
}

/// A cached value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Key as given by the caller.
    pub key: String,
    /// Stored JSON.
    pub value: serde_json::Value,
}

/// Body of `PUT /cache/{key}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CachePut {
    /// JSON to store.
    pub value: serde_json::Value,
    /// Lifetime; the configured default when omitted, zero for none.
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

/// Result of `DELETE /cache`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheCleared {
    /// Entries removed.
    pub removed: u64,
}

// ========== Treasury ==========

/// Settled, pending and total balance.
pub async fn treasury_balance(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<TreasuryBalance>> {
    user.require(Role::Manager)?;
    Ok(Json(state.treasury.balance(user.tenant).await?))
}

/// Ledger lines of a period with totals.
pub async fn treasury_statement(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<StatementQuery>,
) -> ApiResult<Json<Statement>> {
    user.require(Role::Manager)?;
    let statement = state
        .treasury
        .statement(user.tenant, query.from, query.to)
        .await?;
    Ok(Json(statement))
}

/// Moves the available balance above the minimum to the bank account.
pub async fn treasury_sweep(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<SweepResult>> {
    user.require(Role::Admin)?;
    let entry = state.treasury.sweep(user.tenant).await?;
    Ok(Json(SweepResult {
        swept: entry.is_some(),
        entry,
    }))
}

// ========== Notifications ==========

/// Lists notifications, newest first.
pub async fn list_notifications(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<Json<Vec<Notification>>> {
    user.require(Role::Manager)?;
    let page = page_of(query.page, query.per_page);
    Ok(Json(
        state.notifications.list(user.tenant, query.status, page).await?,
    ))
}

/// Sends one message. A delivery failure is recorded on the returned
/// notification.
pub async fn send_notification(
    user: AuthUser,
    State(state): State<AppState>,
    Json(request): Json<NotificationRequest>,
) -> ApiResult<(StatusCode, Json<Notification>)> {
    user.require(Role::Manager)?;
    let notification = state.notifications.send(user.tenant, request).await?;
    Ok((StatusCode::CREATED, Json(notification)))
}

/// Delivers failed notifications again.
pub async fn retry_notifications(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<RetryReport>> {
    user.require(Role::Manager)?;
    Ok(Json(state.notifications.retry_failed(user.tenant).await?))
}

// ========== Cache ==========

/// Backend counters.
pub async fn cache_stats(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<CacheStats>> {
    user.require(Role::Manager)?;
    Ok(Json(state.cache.stats().await?))
}

/// Drops every entry of the caller's tenant.
pub async fn cache_clear(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<CacheCleared>> {
    user.require(Role::Admin)?;
    let removed = state.cache.clear(user.tenant).await?;
    Ok(Json(CacheCleared { removed }))
}

/// Reads one key.
pub async fn cache_get(
    user: AuthUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<CacheEntry>> {
    user.require(Role::Manager)?;
    let value = state
        .cache
        .get(user.tenant, &key)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("cache key {key} not found")))?;
    Ok(Json(CacheEntry { key, value }))
}

/// Stores one key.
pub async fn cache_put(
    user: AuthUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<CachePut>,
) -> ApiResult<StatusCode> {
    user.require(Role::Manager)?;
    state
        .cache
        .set(user.tenant, &key, body.value, body.ttl_secs)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Removes one key.
pub async fn cache_delete(
    user: AuthUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<StatusCode> {
    user.require(Role::Manager)?;
    if state.cache.delete(user.tenant, &key).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("cache key {key} not found")))
    }
}
