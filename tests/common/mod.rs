//! Router harness shared by the integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use eventos::api::rest::{AppState, Role, create_router};
use eventos::config::Settings;
use eventos::domain::value_objects::{TenantId, UserId};
use serde_json::{Value, json};
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub tenant: TenantId,
}

impl TestApp {
    pub fn new() -> Self {
        let settings = Settings::default();
        let state = AppState::in_memory(&settings);
        Self {
            router: create_router(state.clone(), &settings.server),
            state,
            tenant: TenantId::new_v4(),
        }
    }

    pub fn token(&self, role: Role) -> String {
        self.token_for(self.tenant, role)
    }

    pub fn token_for(&self, tenant: TenantId, role: Role) -> String {
        self.state.auth.issue(UserId::new_v4(), tenant, role).unwrap()
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.raw(request).await
    }

    pub async fn raw(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    /// Creates and publishes an event starting in `days`.
    pub async fn published_event(&self, days: i64) -> String {
        let admin = self.token(Role::Admin);
        let starts_at = chrono::Utc::now() + chrono::Duration::days(days);
        let (status, event) = self
            .post(
                "/api/v1/events",
                &admin,
                json!({
                    "name": "Festival de Inverno",
                    "venue": "Centro de Convenções",
                    "starts_at": starts_at,
                    "ends_at": starts_at + chrono::Duration::hours(6),
                    "capacity": 100,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = event["id"].as_str().unwrap().to_string();
        let (status, _) = self
            .post(&format!("/api/v1/events/{id}/publish"), &admin, json!({}))
            .await;
        assert_eq!(status, StatusCode::OK);
        id
    }

    /// Registers a participant and returns its JSON.
    pub async fn participant(&self, event_id: &str, name: &str, cpf: Option<&str>) -> Value {
        let (status, body) = self
            .post(
                &format!("/api/v1/events/{event_id}/participants"),
                &self.token(Role::Operator),
                json!({
                    "name": name,
                    "email": format!("{}@example.com", name.to_lowercase()),
                    "cpf": cpf,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }
}
