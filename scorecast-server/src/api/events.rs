//! Event status handlers.

use axum::{
    Json, Router,
    extract::{OriginalUri, Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use kanau::processor::Processor;
use scorecast_core::domain::{Event, EventId, EventStatus};
use scorecast_core::processors::{GetEventStatus, LifecycleError, ListEvents, SetEventStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

use super::ErrorResponse;
use crate::state::AppState;

/// Build the event API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/events", get(list_events))
        .route("/api/events/status", post(update_event_status))
        .route("/api/events/{event_id}/status", get(get_event_status))
}

/// Body of `POST /api/events/status`.
///
/// Fields are optional here so that missing values are reported as
/// validation errors rather than generic parse failures.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStatusRequest {
    pub event_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStatusResponse {
    pub event_id: EventId,
    pub status: EventStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
    pub message: &'static str,
}

impl From<Event> for EventStatusResponse {
    fn from(event: Event) -> Self {
        let message = if event.is_live() {
            "Event is now live and being tracked"
        } else {
            "Event tracking stopped"
        };
        Self {
            event_id: event.event_id,
            status: event.status,
            last_updated: event.last_updated,
            message,
        }
    }
}

/// Check the request body and turn it into a lifecycle request.
fn validate(request: EventStatusRequest) -> Result<SetEventStatus, BTreeMap<&'static str, String>> {
    let mut errors = BTreeMap::new();

    // Identifiers are opaque: blank ones are rejected, others are kept verbatim.
    let event_id = request.event_id.filter(|id| !id.trim().is_empty());
    if event_id.is_none() {
        errors.insert("eventId", "Event ID is required".to_string());
    }

    let status = match request.status.as_deref() {
        None => {
            errors.insert("status", "Status is required".to_string());
            None
        }
        Some(raw) => match raw.parse::<EventStatus>() {
            Ok(status) => Some(status),
            Err(e) => {
                errors.insert("status", e.to_string());
                None
            }
        },
    };

    match (event_id, status) {
        (Some(event_id), Some(status)) if errors.is_empty() => Ok(SetEventStatus {
            event_id: EventId::from(event_id),
            status,
        }),
        _ => Err(errors),
    }
}

/// `POST /api/events/status`: mark an event live or not live.
///
/// Going live starts periodic score publishing for the event; going not
/// live stops it.
async fn update_event_status(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    payload: Result<Json<EventStatusRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let path = uri.path();

    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(%path, error = %rejection, "Invalid request body");
        ErrorResponse::new(StatusCode::BAD_REQUEST, "Bad Request", "Invalid request body", path)
    })?;

    let request = validate(request).map_err(|errors| {
        tracing::warn!(%path, ?errors, "Validation failed");
        ErrorResponse::new(
            StatusCode::BAD_REQUEST,
            "Validation Failed",
            "Invalid request parameters",
            path,
        )
        .with_validation_errors(errors)
    })?;

    tracing::info!(
        event_id = %request.event_id,
        status = %request.status,
        "Received status update request"
    );

    let event = state.lifecycle.process(request).await.map_err(|e| match e {
        LifecycleError::Schedule { .. } => {
            tracing::error!(error = %e, "Status update failed");
            ErrorResponse::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "Service Unavailable",
                e.to_string(),
                path,
            )
        }
    })?;

    Ok(Json(EventStatusResponse::from(event)))
}

/// `GET /api/events/{event_id}/status`: current status of one event.
async fn get_event_status(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    tracing::debug!(%event_id, "Fetching event status");

    let Ok(found) = state
        .lifecycle
        .process(GetEventStatus {
            event_id: EventId::from(event_id.as_str()),
        })
        .await;

    found
        .map(|event| Json(EventStatusResponse::from(event)))
        .ok_or_else(|| {
            ErrorResponse::new(
                StatusCode::NOT_FOUND,
                "Not Found",
                format!("event {event_id} not found"),
                uri.path(),
            )
        })
}

/// `GET /api/events`: every known event, ordered by identifier.
async fn list_events(State(state): State<AppState>) -> impl IntoResponse {
    let Ok(events) = state.lifecycle.process(ListEvents).await;
    Json(
        events
            .into_iter()
            .map(EventStatusResponse::from)
            .collect::<Vec<_>>(),
    )
}
