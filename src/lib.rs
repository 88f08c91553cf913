//! NOx monitoring backend for cement-kiln sensor uploads.
//!
//! Pipeline, in dependency order:
//! - [`ingest`] – CSV upload → [`RawTable`]
//! - [`features`] – numeric projection and per-upload mean imputation
//! - [`inference`] – the two regression models behind the [`NoxModel`] trait
//! - [`alert`] – OK / ATTENTION / DANGER classification
//! - [`report`] and [`export`] – presentation views and CSV download
//!
//! [`pipeline::run`] chains the first four stages; [`routes`] exposes them
//! over HTTP.

pub mod alert;
pub mod config;
pub mod error;
pub mod export;
pub mod features;
pub mod inference;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod routes;
pub mod satellite;
pub mod schema;

pub use config::Config;

// Re-exported so routes/*.rs reach shared types through the crate root only.
pub use alert::AlertLevel;
pub use error::{FeatureError, IngestionError, ModelError, PipelineError};
pub use inference::{ModelSet, NoxModel};
pub use models::{PredictionTable, RawRecord, RawTable, RowPrediction};
