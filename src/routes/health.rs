// src/routes/health.rs
//! Liveness endpoint for the NOx monitor.
//!
//! `GET /health` answers as soon as the server is up. Models are loaded
//! before the listener binds, so a healthy answer also means both artifacts
//! are in memory; their names are echoed back for deployment checks.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;

#[derive(Serialize)]
struct ModelNames {
    baf: String,
    opsis: String,
}

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    models: ModelNames,
}

/// Handle `GET /health`. Touches no upload and no external service.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    // ---
    Json(HealthResponse {
        status: "ok",
        models: ModelNames {
            baf: state.models.baf.name().to_string(),
            opsis: state.models.opsis.name().to_string(),
        },
    })
}

/// Subrouter containing the `/health` route.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
