//! Point-of-sale endpoints.
//!
//! - `GET /events/{id}/products`, `POST /events/{id}/products` (manager)
//! - `GET /events/{id}/products/low-stock`
//! - `PUT /products/{id}` (manager), `POST /products/{id}/stock` (manager)
//! - `GET /events/{id}/sales`, `POST /events/{id}/sales` (operator)
//! - `GET /sales/{id}`, `POST /sales/{id}/cancel` (manager)

use super::{Json, Path};
use crate::api::rest::auth::{AuthUser, Role};
use crate::api::rest::error::ApiResult;
use crate::api::rest::state::AppState;
use crate::application::services::SaleRequest;
use crate::domain::entities::{Product, ProductDetails, ProductUpdate, Sale};
use crate::domain::value_objects::{EventId, ProductId, SaleId};
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

/// Body of `POST /products/{id}/stock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StockAdjustment {
    /// Units added (positive) or written off (negative).
    pub delta: i64,
}

// ========== Products ==========

/// Lists an event's catalog.
pub async fn list_products(
    user: AuthUser,
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.pdv.list_products(user.tenant, event_id).await?))
}

/// Adds a product to an event's catalog.
pub async fn create_product(
    user: AuthUser,
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
    Json(details): Json<ProductDetails>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    user.require(Role::Manager)?;
    let product = state.pdv.create_product(user.tenant, event_id, details).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Products at or below their restock threshold, scarcest first.
pub async fn low_stock(
    user: AuthUser,
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.pdv.low_stock(user.tenant, event_id).await?))
}

/// Changes name, price, category, threshold or availability.
pub async fn update_product(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(update): Json<ProductUpdate>,
) -> ApiResult<Json<Product>> {
    user.require(Role::Manager)?;
    Ok(Json(state.pdv.update_product(user.tenant, id, update).await?))
}

/// Restocks or writes off units.
pub async fn adjust_stock(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(adjustment): Json<StockAdjustment>,
) -> ApiResult<Json<Product>> {
    user.require(Role::Manager)?;
    let product = state
        .pdv
        .adjust_stock(user.tenant, id, adjustment.delta)
        .await?;
    Ok(Json(product))
}

// ========== Sales ==========

/// Lists an event's sales.
pub async fn list_sales(
    user: AuthUser,
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> ApiResult<Json<Vec<Sale>>> {
    Ok(Json(state.pdv.list_sales(user.tenant, event_id).await?))
}

/// Rings up a sale.
pub async fn create_sale(
    user: AuthUser,
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
    Json(request): Json<SaleRequest>,
) -> ApiResult<(StatusCode, Json<Sale>)> {
    user.require(Role::Operator)?;
    let sale = state
        .pdv
        .create_sale(user.tenant, event_id, user.user_id, request)
        .await?;
    state.dashboards.invalidate(user.tenant, event_id).await;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// Returns one sale.
pub async fn get_sale(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<SaleId>,
) -> ApiResult<Json<Sale>> {
    Ok(Json(state.pdv.get_sale(user.tenant, id).await?))
}

/// Voids a sale, returning its units to stock.
pub async fn cancel_sale(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<SaleId>,
) -> ApiResult<Json<Sale>> {
    user.require(Role::Manager)?;
    let sale = state.pdv.cancel_sale(user.tenant, id).await?;
    state.dashboards.invalidate(user.tenant, sale.event_id()).await;
    Ok(Json(sale))
}
