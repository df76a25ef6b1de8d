//! Payments, refunds and provider webhooks through the HTTP router.

#![allow(clippy::unwrap_used)]

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use common::TestApp;
use eventos::api::rest::Role;
use eventos::config::DEVELOPMENT_SECRET;
use eventos::infrastructure::gateways::{SIGNATURE_HEADER, WebhookVerifier};
use serde_json::{Value, json};

async fn pay(app: &TestApp, event_id: &str, participant: &Value, method: &str) -> Value {
    let (status, tx) = app
        .post(
            "/api/v1/payments",
            &app.token(Role::Operator),
            json!({
                "event_id": event_id,
                "participant_id": participant["id"],
                "amount": "150.00",
                "method": method,
                "payer": {
                    "name": participant["name"],
                    "email": participant["email"],
                    "cpf": "52998224725",
                },
                "card_token": "tok_visa",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{tx}");
    tx
}

fn webhook(body: &Value, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/webhooks/payments")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn partial_refund_completes_and_excess_is_refused() {
    let app = TestApp::new();
    let event_id = app.published_event(30).await;
    let participant = app.participant(&event_id, "Bruno", None).await;
    let tx = pay(&app, &event_id, &participant, "CREDIT_CARD").await;
    assert_eq!(tx["status"], "PAID");

    let operator = app.token(Role::Operator);
    let (status, refund) = app
        .post(
            "/api/v1/refunds",
            &operator,
            json!({
                "transaction_id": tx["id"],
                "amount": "50.00",
                "reason": "desistência parcial",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{refund}");
    assert_eq!(refund["state"], "COMPLETED");

    let manager = app.token(Role::Manager);
    let (_, stored) = app
        .get(&format!("/api/v1/payments/{}", tx["id"].as_str().unwrap()), &manager)
        .await;
    assert_eq!(stored["status"], "PARTIALLY_REFUNDED");

    let (status, body) = app
        .post(
            "/api/v1/refunds",
            &operator,
            json!({
                "transaction_id": tx["id"],
                "amount": "120.00",
                "reason": "quero tudo de volta",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "REFUND_EXCEEDS_AVAILABLE");
}

#[tokio::test]
async fn signed_webhook_settles_pix_once() {
    let app = TestApp::new();
    let event_id = app.published_event(30).await;
    let participant = app.participant(&event_id, "Carla", None).await;
    let tx = pay(&app, &event_id, &participant, "PIX").await;
    assert_eq!(tx["status"], "PENDING");
    let reference = tx["gateway_reference"].as_str().unwrap();

    let body = json!({ "reference": reference, "status": "PAID" });
    let signature = WebhookVerifier::new(DEVELOPMENT_SECRET)
        .sign(body.to_string().as_bytes())
        .unwrap();

    let (status, _) = app.raw(webhook(&body, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, ack) = app.raw(webhook(&body, Some(&signature))).await;
    assert_eq!(status, StatusCode::OK, "{ack}");
    assert_eq!(ack["outcome"], "APPLIED");

    let manager = app.token(Role::Manager);
    let (_, stored) = app
        .get(&format!("/api/v1/payments/{}", tx["id"].as_str().unwrap()), &manager)
        .await;
    assert_eq!(stored["status"], "PAID");

    let (status, ack) = app.raw(webhook(&body, Some(&signature))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "IGNORED");
}

#[tokio::test]
async fn forged_webhook_is_rejected() {
    let app = TestApp::new();
    let body = json!({ "reference": "sim_ch_unknown", "status": "PAID" });
    let signature = WebhookVerifier::new("some-other-secret")
        .sign(body.to_string().as_bytes())
        .unwrap();

    let (status, _) = app.raw(webhook(&body, Some(&signature))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

fn amount(value: &Value) -> f64 {
    value.as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn dashboard_reflects_refunds_and_webhooks() {
    let app = TestApp::new();
    let event_id = app.published_event(30).await;
    let manager = app.token(Role::Manager);
    let dashboard_uri = format!("/api/v1/events/{event_id}/dashboard");

    let participant = app.participant(&event_id, "Diego", None).await;
    let card = pay(&app, &event_id, &participant, "CREDIT_CARD").await;
    let (status, before) = app.get(&dashboard_uri, &manager).await;
    assert_eq!(status, StatusCode::OK, "{before}");
    assert_eq!(amount(&before["refunded"]), 0.0);

    let (status, refund) = app
        .post(
            "/api/v1/refunds",
            &app.token(Role::Operator),
            json!({
                "transaction_id": card["id"],
                "amount": "50.00",
                "reason": "desistência parcial",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{refund}");
    let (_, after_refund) = app.get(&dashboard_uri, &manager).await;
    assert_eq!(amount(&after_refund["refunded"]), 50.0);
    assert_eq!(
        amount(&after_refund["net_revenue"]),
        amount(&before["net_revenue"]) - 50.0
    );

    let other = app.participant(&event_id, "Elisa", None).await;
    let pix = pay(&app, &event_id, &other, "PIX").await;
    let (_, pending) = app.get(&dashboard_uri, &manager).await;
    let body = json!({ "reference": pix["gateway_reference"], "status": "PAID" });
    let signature = WebhookVerifier::new(DEVELOPMENT_SECRET)
        .sign(body.to_string().as_bytes())
        .unwrap();
    let (status, ack) = app.raw(webhook(&body, Some(&signature))).await;
    assert_eq!(status, StatusCode::OK, "{ack}");

    let (_, settled) = app.get(&dashboard_uri, &manager).await;
    assert_eq!(
        amount(&settled["gross_revenue"]),
        amount(&pending["gross_revenue"]) + 150.0
    );
}

#[tokio::test]
async fn payment_amount_beyond_the_maximum_is_a_validation_error() {
    let app = TestApp::new();
    let event_id = app.published_event(30).await;
    let participant = app.participant(&event_id, "Fabio", None).await;

    let (status, body) = app
        .post(
            "/api/v1/payments",
            &app.token(Role::Operator),
            json!({
                "event_id": event_id,
                "participant_id": participant["id"],
                "amount": "79228162514264337593543950335",
                "method": "CREDIT_CARD",
                "payer": {
                    "name": participant["name"],
                    "email": participant["email"],
                    "cpf": "52998224725",
                },
                "card_token": "tok_visa",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    assert_eq!(body["error"], "VALIDATION_ERROR");
}
