//! # Handlers
//!
//! One module per API area. Handlers authenticate with [`AuthUser`], check
//! the role they need, call one service and map the result.
//!
//! The extractors below wrap axum's so that malformed paths, queries and
//! bodies are answered with the same JSON error body as every other error.
//!
//! [`AuthUser`]: crate::api::rest::auth::AuthUser

pub mod attendance;
pub mod back_office;
pub mod events;
pub mod monitoring;
pub mod payments;
pub mod pdv;

use crate::api::rest::error::ApiError;
use crate::infrastructure::persistence::Page;
use axum::extract::{FromRequest, FromRequestParts};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

/// JSON body extractor and response.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Path parameters.
#[derive(Debug, Clone, Copy, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct Path<T>(pub T);

/// Query string.
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct Query<T>(pub T);

/// Default page size of list endpoints.
pub const DEFAULT_PER_PAGE: usize = 50;

/// `?page=&per_page=`, 1-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Page number, from 1.
    pub page: Option<usize>,
    /// Page size, at most [`Page::MAX_LIMIT`].
    pub per_page: Option<usize>,
}

impl Pagination {
    /// Converts to a repository page.
    #[must_use]
    pub fn page(&self) -> Page {
        Page::new(
            self.page.unwrap_or(1),
            self.per_page.unwrap_or(DEFAULT_PER_PAGE),
        )
    }
}

/// Builds a page from optional query values.
#[must_use]
pub(crate) fn page_of(page: Option<usize>, per_page: Option<usize>) -> Page {
    Pagination { page, per_page }.page()
}
