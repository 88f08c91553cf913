//! One full prediction run: ingest → assemble → predict → classify.

use uuid::Uuid;

use crate::error::{ModelError, PipelineError};
use crate::features;
use crate::ingest::{self, CsvOptions};
use crate::inference::{ModelSet, NoxModel};
use crate::models::{PredictionTable, RawTable, RowPrediction};
use crate::schema::NON_FEATURE_COLUMNS;

// ---

/// Run the pipeline over raw upload bytes.
///
/// Nothing is shared between runs except the read-only `models`. Any stage
/// failing aborts the run with no partial result.
pub fn run(
    run_id: Uuid,
    bytes: &[u8],
    models: &ModelSet,
    csv: &CsvOptions,
) -> Result<PredictionTable, PipelineError> {
    // ---
    tracing::info!(%run_id, "Pipeline step 1: ingesting {} bytes", bytes.len());
    let table = ingest::ingest(bytes, csv)?;

    tracing::info!(%run_id, "Pipeline steps 2-4: features, inference, alerts");
    let result = predict_table(table, models)?;

    tracing::info!(%run_id, "Pipeline complete, {} rows predicted", result.predictions.len());
    Ok(result)
}

/// Assemble features for an ingested table and augment it with predictions
/// and alert levels.
pub fn predict_table(table: RawTable, models: &ModelSet) -> Result<PredictionTable, PipelineError> {
    // ---
    let matrix = features::assemble(&table, &NON_FEATURE_COLUMNS)?;
    tracing::debug!(
        "Feature matrix: {} rows x {} columns",
        matrix.n_rows(),
        matrix.n_features()
    );

    let baf = predict_checked(models.baf.as_ref(), &matrix)?;
    let opsis = predict_checked(models.opsis.as_ref(), &matrix)?;

    let predictions = baf
        .into_iter()
        .zip(opsis)
        .map(|(b, o)| RowPrediction::from_predictions(b, o))
        .collect();

    Ok(PredictionTable { table, predictions })
}

fn predict_checked(
    model: &dyn NoxModel,
    matrix: &features::FeatureMatrix,
) -> Result<Vec<f64>, ModelError> {
    // ---
    let predictions = model.predict(matrix)?;
    if predictions.len() != matrix.n_rows() {
        return Err(ModelError::InvalidArtifact {
            model: model.name().to_string(),
            reason: format!(
                "returned {} predictions for {} rows",
                predictions.len(),
                matrix.n_rows()
            ),
        });
    }
    // NaN compares below every threshold and would classify as OK.
    if let Some(i) = predictions.iter().position(|p| !p.is_finite()) {
        return Err(ModelError::NonFinitePrediction {
            model: model.name().to_string(),
            row: i + 1,
        });
    }
    Ok(predictions)
}
