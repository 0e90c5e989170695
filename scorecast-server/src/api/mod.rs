//! HTTP request surface.
//!
//! # Endpoints
//!
//! - `POST /api/events/status`: mark an event live / not live
//! - `GET  /api/events/{event_id}/status`: current status of one event
//! - `GET  /api/events`: every known event
//!
//! When the mock score provider is enabled, `/events/...` additionally
//! serves stand-in scores (see [`mock`]).

pub mod events;
pub mod mock;

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// Error body returned by every API endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub status: u16,
    pub error: &'static str,
    pub message: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<BTreeMap<&'static str, String>>,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, error: &'static str, message: impl Into<String>, path: &str) -> Self {
        Self {
            timestamp: OffsetDateTime::now_utc(),
            status: status.as_u16(),
            error,
            message: message.into(),
            path: path.to_string(),
            validation_errors: None,
        }
    }

    pub fn with_validation_errors(mut self, errors: BTreeMap<&'static str, String>) -> Self {
        self.validation_errors = Some(errors);
        self
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
