//! End-to-end flows through the HTTP router.

#![allow(clippy::unwrap_used)]

mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use eventos::api::rest::Role;
use eventos::domain::value_objects::TenantId;
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;

#[tokio::test]
async fn created_event_reads_back_through_both_paths() {
    let app = TestApp::new();
    let token = app.token(Role::Manager);
    let starts_at = chrono::Utc::now() + chrono::Duration::days(10);

    let (status, created) = app
        .post(
            "/api/v1/eventos",
            &token,
            json!({
                "name": "Congresso de Tecnologia",
                "venue": "Expo Center Norte",
                "starts_at": starts_at,
                "ends_at": starts_at + chrono::Duration::hours(8),
                "capacity": 250,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "DRAFT");

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = app.get(&format!("/api/v1/events/{id}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Congresso de Tecnologia");
    assert_eq!(fetched["venue"], "Expo Center Norte");
    assert_eq!(fetched["capacity"], 250);
    assert_eq!(fetched["starts_at"], created["starts_at"]);
}

#[tokio::test]
async fn requests_need_a_token_and_the_right_role() {
    let app = TestApp::new();

    let (status, body) = app
        .send(Method::GET, "/api/v1/events", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");

    let (status, body) = app
        .post(
            "/api/v1/events",
            &app.token(Role::Operator),
            json!({
                "name": "Show",
                "venue": "Arena",
                "starts_at": "2030-01-01T20:00:00Z",
                "ends_at": "2030-01-01T23:00:00Z",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");
}

#[tokio::test]
async fn tenants_do_not_see_each_other() {
    let app = TestApp::new();
    let event_id = app.published_event(5).await;

    let stranger = app.token_for(TenantId::new_v4(), Role::Admin);
    let (status, body) = app.get(&format!("/api/v1/events/{event_id}"), &stranger).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");

    let (status, list) = app.get("/api/v1/events", &stranger).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 0);
    assert!(list["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn qr_check_in_is_accepted_once() {
    let app = TestApp::new();
    let event_id = app.published_event(1).await;
    let participant = app.participant(&event_id, "Ana", Some("529.982.247-25")).await;
    let qr = participant["qr_token"].as_str().unwrap();
    let operator = app.token(Role::Operator);
    let uri = format!("/api/v1/events/{event_id}/checkins");

    let (status, checkin) = app
        .post(&uri, &operator, json!({ "method": "QR_CODE", "value": qr }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{checkin}");
    assert_eq!(checkin["participant_id"], participant["id"]);

    let (status, body) = app
        .post(&uri, &operator, json!({ "method": "QR_CODE", "value": qr }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "DUPLICATE_CHECKIN");

    let (status, body) = app
        .post(&uri, &operator, json!({ "method": "CPF", "value": "52998224725" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "DUPLICATE_CHECKIN");
}

#[tokio::test]
async fn pdv_sale_totals_and_oversell() {
    let app = TestApp::new();
    let event_id = app.published_event(1).await;
    let manager = app.token(Role::Manager);
    let operator = app.token(Role::Operator);

    let (status, water) = app
        .post(
            &format!("/api/v1/events/{event_id}/products"),
            &manager,
            json!({ "name": "Água", "sku": "AGUA-500", "unit_price": "4.50", "stock": 10 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{water}");
    let (status, beer) = app
        .post(
            &format!("/api/v1/events/{event_id}/products"),
            &manager,
            json!({ "name": "Cerveja", "sku": "CERV-350", "unit_price": "12.00", "stock": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{beer}");

    let sales = format!("/api/v1/events/{event_id}/sales");
    let (status, sale) = app
        .post(
            &sales,
            &operator,
            json!({
                "items": [
                    { "product_id": water["id"], "quantity": 3 },
                    { "product_id": beer["id"], "quantity": 1 },
                ],
                "discount": "1.50",
                "payment_method": "CASH",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{sale}");
    let total = Decimal::from_str(sale["total"].as_str().unwrap()).unwrap();
    assert_eq!(total, Decimal::from_str("24.00").unwrap());

    let (status, body) = app
        .post(
            &sales,
            &operator,
            json!({
                "items": [{ "product_id": beer["id"], "quantity": 2 }],
                "payment_method": "CASH",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "INSUFFICIENT_STOCK");

    let (_, product) = app
        .get(&format!("/api/v1/events/{event_id}/products"), &manager)
        .await;
    let beer_stock = product
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["sku"] == "CERV-350")
        .map(|p| p["stock"].clone())
        .unwrap();
    assert_eq!(beer_stock, 1);
}

#[tokio::test]
async fn cache_entries_round_trip() {
    let app = TestApp::new();
    let manager = app.token(Role::Manager);
    let uri = "/api/v1/cache/lineup";

    let (status, _) = app
        .send(
            Method::PUT,
            uri,
            Some(&manager),
            Some(json!({ "value": { "headliner": "Banda X" }, "ttl_secs": 60 })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, entry) = app.get(uri, &manager).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["value"]["headliner"], "Banda X");

    let (status, _) = app.send(Method::DELETE, uri, Some(&manager), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(uri, &manager).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "HEALTHY");
}
