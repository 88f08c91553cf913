//! Error taxonomy for the prediction pipeline.
//!
//! Each stage owns one error enum. [`PipelineError`] wraps them so a request
//! handler can map any failure to a response in one place.

use std::path::PathBuf;

use thiserror::Error;

// ---

/// Upload could not be turned into a table. Fatal for the upload.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("malformed CSV: {0}")]
    Malformed(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("upload contains a header but no data rows")]
    NoRows,

    #[error("row {row}: timestamp '{value}' does not match DD.MM.YYYY HH:MM")]
    InvalidTimestamp { row: usize, value: String },
}

/// Feature matrix could not be assembled from an ingested table.
#[derive(Error, Debug, PartialEq)]
pub enum FeatureError {
    #[error("column '{0}' has no numeric value to impute from")]
    EmptyColumn(String),

    #[error("no feature columns left after excluding date and reference columns")]
    NoFeatures,
}

/// Model artifact could not be loaded, or does not fit the feature matrix.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("cannot read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode model artifact {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid model artifact '{model}': {reason}")]
    InvalidArtifact { model: String, reason: String },

    #[error("model '{model}' expects {expected} features, got {found}")]
    FeatureCountMismatch {
        model: String,
        expected: usize,
        found: usize,
    },

    #[error("model '{model}' needs feature '{feature}' which the upload does not provide")]
    MissingFeature { model: String, feature: String },

    #[error("model '{model}' was not fitted with feature '{feature}'")]
    UnexpectedFeature { model: String, feature: String },

    #[error("model '{model}' produced a non-finite prediction for row {row}")]
    NonFinitePrediction { model: String, row: usize },
}

/// Presentation request that cannot be served.
#[derive(Error, Debug, PartialEq)]
pub enum ReportError {
    #[error("start date {start} is after end date {end}")]
    InvertedRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
}

/// Any failure of a single pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    #[error(transparent)]
    Features(#[from] FeatureError),

    #[error(transparent)]
    Model(#[from] ModelError),
}
