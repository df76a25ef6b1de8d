//! # REST API
//!
//! JSON over HTTP with axum, versioned under `/api/v1`.
//!
//! Every route except `GET /health` and `POST /api/v1/webhooks/payments`
//! needs a bearer token; see [`auth`]. Errors share one body, see [`error`].
//!
//! # Usage
//!
//! ```ignore
//! use eventos::api::rest::{AppState, create_router};
//! use eventos::config::Settings;
//!
//! let settings = Settings::load()?;
//! let state = AppState::in_memory(&settings);
//! let router = create_router(state, &settings.server);
//!
//! let listener = tokio::net::TcpListener::bind(settings.server.socket_addr()?).await?;
//! axum::serve(listener, router).await?;
//! ```

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use auth::{AuthUser, Claims, JwtAuth, Role};
pub use error::{ApiError, ApiResult, ErrorBody};
pub use routes::{API_PREFIX, create_router};
pub use state::{AppState, Backends, Repositories};
