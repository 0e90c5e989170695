//! Stand-in score provider for local runs.
//!
//! Serves the same `/events/{event_id}/score` shape the real score API does,
//! with a random `home:away` score on every call. Point
//! `score_source.base_url` at this server to run without an upstream.

use axum::{
    Json, Router,
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use rand::Rng;
use serde::Serialize;

use crate::state::AppState;

/// Build the mock score router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events/health", get(health))
        .route("/events/{event_id}/score", get(score))
        .route("/events/{event_id}/score/error", get(simulate_error))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MockScoreResponse {
    event_id: String,
    current_score: String,
}

/// `GET /events/{event_id}/score`: random score, each side in `0..=5`.
async fn score(Path(event_id): Path<String>) -> impl IntoResponse {
    let (home, away) = {
        let mut rng = rand::rng();
        (rng.random_range(0..=5u8), rng.random_range(0..=5u8))
    };
    let current_score = format!("{home}:{away}");
    tracing::info!(%event_id, score = %current_score, "Mock score API returning score");

    Json(MockScoreResponse {
        event_id,
        current_score,
    })
}

/// `GET /events/{event_id}/score/error`: always fails with a server error.
async fn simulate_error(Path(event_id): Path<String>) -> impl IntoResponse {
    tracing::warn!(%event_id, "Mock score API simulating error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Simulated error from external API",
    )
}

async fn health() -> &'static str {
    "Mock External API is running"
}
