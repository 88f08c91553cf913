use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::warn;

use super::AppState;
use crate::satellite::fetch_image;

// ---

pub fn router() -> Router<AppState> {
    Router::new().route("/satellite", get(handler))
}

/// `GET /satellite`: proxy the configured satellite image. A failed fetch
/// degrades to a `503` carrying a warning; nothing else is affected.
async fn handler(State(state): State<AppState>) -> Response {
    // ---
    match fetch_image(&state.http, &state.config.satellite_image_url).await {
        Ok(image) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, image.content_type)],
            image.bytes,
        )
            .into_response(),
        Err(w) => {
            warn!("Unable to load satellite image: {}", w);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "warning": "Unable to load satellite image" })),
            )
                .into_response()
        }
    }
}
