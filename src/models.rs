//! Data models for the NOx pipeline.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::alert::{self, AlertLevel, BAF_THRESHOLDS, OPSIS_THRESHOLDS};

// ---

/// One row of an uploaded dataset.
///
/// `cells` holds the raw text of every column in table order; missing
/// markers are stored as `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    // ---
    pub timestamp: NaiveDateTime,
    pub cells: Vec<Option<String>>,
}

/// An ingested upload: column names plus records, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    // ---
    pub columns: Vec<String>,
    pub records: Vec<RawRecord>,
}

impl RawTable {
    /// Position of `name` among the columns.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Numeric value of `column` in every record, `None` where absent or
    /// not a number.
    pub fn numeric_column(&self, name: &str) -> Vec<Option<f64>> {
        // ---
        let Some(idx) = self.column_index(name) else {
            return vec![None; self.records.len()];
        };

        self.records
            .iter()
            .map(|r| r.cells[idx].as_deref().and_then(parse_number))
            .collect()
    }

    /// Earliest and latest timestamps, `None` for an empty table.
    pub fn time_span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        // ---
        let first = self.records.iter().map(|r| r.timestamp).min()?;
        let last = self.records.iter().map(|r| r.timestamp).max()?;
        Some((first, last))
    }
}

/// Numeric coercion shared by feature assembly and reporting. NaN, infinities
/// and values overflowing `f64` count as missing.
pub fn parse_number(cell: &str) -> Option<f64> {
    // ---
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Model outputs and derived alerts for one record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RowPrediction {
    // ---
    pub nox_baf_pred: f64,
    pub nox_opsis_pred: f64,
    pub alert_baf: AlertLevel,
    pub alert_opsis: AlertLevel,
    pub alert: AlertLevel,
}

impl RowPrediction {
    /// Classify a pair of predictions with the fixed per-model thresholds.
    pub fn from_predictions(baf: f64, opsis: f64) -> Self {
        // ---
        let alert_baf = alert::classify(baf, &BAF_THRESHOLDS);
        let alert_opsis = alert::classify(opsis, &OPSIS_THRESHOLDS);

        RowPrediction {
            nox_baf_pred: baf,
            nox_opsis_pred: opsis,
            alert_baf,
            alert_opsis,
            alert: alert::combined(alert_baf, alert_opsis),
        }
    }
}

/// An upload augmented with one [`RowPrediction`] per record.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionTable {
    // ---
    pub table: RawTable,
    pub predictions: Vec<RowPrediction>,
}

impl PredictionTable {
    /// Records paired with their predictions, in file order.
    pub fn rows(&self) -> impl Iterator<Item = (&RawRecord, &RowPrediction)> {
        self.table.records.iter().zip(self.predictions.iter())
    }
}
