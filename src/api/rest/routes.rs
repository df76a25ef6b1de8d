//! # Routes
//!
//! Builds the router: every endpoint under `/api/v1`, the public `/health`,
//! and the layers shared by all of them (tracing, CORS, gzip, request
//! metrics).

use crate::api::rest::handlers::{attendance, back_office, events, monitoring, payments, pdv};
use crate::api::rest::state::AppState;
use crate::config::ServerSettings;
use axum::Router;
use axum::extract::{MatchedPath, Request, State};
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use std::time::Instant;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Prefix of the versioned API.
pub const API_PREFIX: &str = "/api/v1";

/// Builds the full router.
pub fn create_router(state: AppState, server: &ServerSettings) -> Router {
    Router::new()
        .route("/health", get(monitoring::health))
        .nest(API_PREFIX, api_routes())
        .layer(middleware::from_fn_with_state(state.clone(), record_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors(&server.cors_origins))
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Events
        .route("/events", get(events::list_events).post(events::create_event))
        .route("/eventos", get(events::list_events).post(events::create_event))
        .route(
            "/events/{id}",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::cancel_event),
        )
        .route(
            "/eventos/{id}",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::cancel_event),
        )
        .route("/events/{id}/publish", post(events::publish_event))
        .route("/events/{id}/start", post(events::start_event))
        .route("/events/{id}/finish", post(events::finish_event))
        .route("/events/{id}/dashboard", get(events::event_dashboard))
        // Participants
        .route(
            "/events/{id}/participants",
            get(attendance::list_participants).post(attendance::register_participant),
        )
        .route(
            "/participants/{id}",
            get(attendance::get_participant).delete(attendance::cancel_participant),
        )
        .route("/participants/{id}/ticket", get(attendance::participant_ticket))
        // Check-in
        .route(
            "/events/{id}/checkins",
            get(attendance::list_checkins).post(attendance::check_in),
        )
        .route("/events/{id}/checkins/stats", get(attendance::checkin_stats))
        .route("/checkins/{id}/checkout", post(attendance::check_out))
        // PDV
        .route(
            "/events/{id}/products",
            get(pdv::list_products).post(pdv::create_product),
        )
        .route("/events/{id}/products/low-stock", get(pdv::low_stock))
        .route("/products/{id}", axum::routing::put(pdv::update_product))
        .route("/products/{id}/stock", post(pdv::adjust_stock))
        .route(
            "/events/{id}/sales",
            get(pdv::list_sales).post(pdv::create_sale),
        )
        .route("/sales/{id}", get(pdv::get_sale))
        .route("/sales/{id}/cancel", post(pdv::cancel_sale))
        // Payments
        .route(
            "/payments",
            get(payments::list_payments).post(payments::create_payment),
        )
        .route("/payments/{id}", get(payments::get_payment))
        .route("/payments/{id}/confirm", post(payments::confirm_payment))
        .route("/payments/{id}/cancel", post(payments::cancel_payment))
        .route("/webhooks/payments", post(payments::payment_webhook))
        // Refunds
        .route(
            "/refunds",
            get(payments::list_refunds).post(payments::request_refund),
        )
        .route("/refunds/{id}", get(payments::get_refund))
        .route("/refunds/{id}/approve", post(payments::approve_refund))
        .route("/refunds/{id}/reject", post(payments::reject_refund))
        .route("/refunds/{id}/retry", post(payments::retry_refund))
        // Treasury
        .route("/treasury/balance", get(back_office::treasury_balance))
        .route("/treasury/statement", get(back_office::treasury_statement))
        .route("/treasury/sweep", post(back_office::treasury_sweep))
        // Notifications
        .route(
            "/notifications",
            get(back_office::list_notifications).post(back_office::send_notification),
        )
        .route("/notifications/retry", post(back_office::retry_notifications))
        // Cache
        .route("/cache", axum::routing::delete(back_office::cache_clear))
        .route("/cache/stats", get(back_office::cache_stats))
        .route(
            "/cache/{key}",
            get(back_office::cache_get)
                .put(back_office::cache_put)
                .delete(back_office::cache_delete),
        )
        // Monitoring
        .route("/monitoring/health", get(monitoring::health_report))
        .route("/monitoring/metrics", get(monitoring::metrics))
        .route("/audit", get(monitoring::audit_trail))
}

/// Counts every request under its matched route.
async fn record_metrics(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let route = format!(
        "{} {}",
        request.method(),
        request
            .extensions()
            .get::<MatchedPath>()
            .map_or("unmatched", MatchedPath::as_str)
    );
    let started = Instant::now();
    let response = next.run(request).await;
    state
        .monitor
        .record(&route, response.status().as_u16(), started.elapsed());
    response
}

fn cors(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(%origin, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
