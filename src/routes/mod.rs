use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;

use crate::{Config, ModelSet};

mod health;
mod predict;
mod satellite;

// ---

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    // ---
    pub models: Arc<ModelSet>,
    pub config: Config,
    pub http: reqwest::Client,
}

pub fn router(state: AppState) -> Router {
    // ---
    let body_limit = state.config.max_upload_bytes as usize;

    Router::new()
        .merge(predict::router())
        .merge(satellite::router())
        .merge(health::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
