use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::AppState;
use crate::export::{self, EXPORT_FILE_NAME};
use crate::pipeline;
use crate::report::{DateRange, Summary, Target};
use crate::{PipelineError, PredictionTable};

const RUN_ID_HEADER: HeaderName = HeaderName::from_static("x-run-id");

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/predict", post(predict_csv))
        .route("/predict/summary", post(predict_summary))
}

/// `POST /predict`: run the pipeline over the uploaded CSV and return the
/// augmented file.
async fn predict_csv(State(state): State<AppState>, body: Bytes) -> Response {
    // ---
    info!("POST /predict - Starting pipeline");

    let (run_id, result) = match run_upload(&state, body).await {
        Ok(Some(ran)) => ran,
        Ok(None) => return StatusCode::NO_CONTENT.into_response(),
        Err(response) => return response,
    };

    let csv = match export::to_csv(&result, &state.config.export_options()) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(%run_id, "Failed to export results: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json("Failed to export results"),
            )
                .into_response();
        }
    };

    debug!(%run_id, "POST /predict - Returning {} bytes", csv.len());
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
            ),
            (RUN_ID_HEADER, run_id.to_string()),
        ],
        csv,
    )
        .into_response()
}

/// Query parameters selecting what the summary shows.
#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    #[serde(default)]
    target: Target,
    /// First day shown, inclusive (`YYYY-MM-DD`). Defaults to the first day
    /// of the upload.
    start: Option<NaiveDate>,
    /// Last day shown, inclusive. Defaults to the last day of the upload.
    end: Option<NaiveDate>,
}

#[derive(Serialize)]
struct SummaryResponse {
    run_id: Uuid,
    #[serde(flatten)]
    summary: Summary,
}

/// `POST /predict/summary`: run the pipeline and return the dashboard views
/// as JSON.
async fn predict_summary(
    Query(params): Query<SummaryQuery>,
    State(state): State<AppState>,
    body: Bytes,
) -> Response {
    // ---
    info!("POST /predict/summary - {:?}", params);

    if let (Some(start), Some(end)) = (params.start, params.end) {
        if let Err(e) = DateRange::new(start, end) {
            return (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": e.to_string() })))
                .into_response();
        }
    }

    let (run_id, result) = match run_upload(&state, body).await {
        Ok(Some(ran)) => ran,
        Ok(None) => return StatusCode::NO_CONTENT.into_response(),
        Err(response) => return response,
    };

    let range = match DateRange::resolve(params.start, params.end, &result.table) {
        Ok(range) => range,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "run_id": run_id, "error": e.to_string() })),
            )
                .into_response();
        }
    };

    let summary = Summary::build(&result, params.target, range);
    info!(
        %run_id,
        "Summary ready: {} of {} rows in range",
        summary.filtered_rows,
        summary.total_rows
    );

    (StatusCode::OK, Json(SummaryResponse { run_id, summary })).into_response()
}

/// Run the pipeline for one upload on the blocking pool. An empty body is
/// the idle state and yields `Ok(None)`.
async fn run_upload(
    state: &AppState,
    body: Bytes,
) -> Result<Option<(Uuid, PredictionTable)>, Response> {
    // ---
    if body.is_empty() {
        info!("No upload received, waiting for a file");
        return Ok(None);
    }

    let run_id = Uuid::new_v4();
    let models = Arc::clone(&state.models);
    let csv = state.config.csv_options();

    let outcome =
        tokio::task::spawn_blocking(move || pipeline::run(run_id, &body, &models, &csv)).await;

    match outcome {
        Ok(Ok(result)) => Ok(Some((run_id, result))),
        Ok(Err(e)) => Err(pipeline_error(run_id, &e)),
        Err(e) => {
            error!(%run_id, "Pipeline task failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "run_id": run_id, "error": "pipeline task failed" })),
            )
                .into_response())
        }
    }
}

fn pipeline_error(run_id: Uuid, err: &PipelineError) -> Response {
    // ---
    let status = match err {
        PipelineError::Ingestion(_) => StatusCode::BAD_REQUEST,
        PipelineError::Features(_) | PipelineError::Model(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    warn!(%run_id, "Upload rejected: {}", err);

    (
        status,
        Json(serde_json::json!({ "run_id": run_id, "error": err.to_string() })),
    )
        .into_response()
}
