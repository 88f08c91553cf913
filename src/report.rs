//! Presentation views over a [`PredictionTable`].
//!
//! Everything here reads predictions and alerts; nothing rewrites them.
//! The views mirror what the operator dashboard showed: alert distribution
//! bars, a time series scatter coloured by alert, and a recap table.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::alert::{AlertLevel, Thresholds, BAF_THRESHOLDS, OPSIS_THRESHOLDS};
use crate::error::ReportError;
use crate::models::{PredictionTable, RawTable, RowPrediction};
use crate::schema::{NOX_BAF, NOX_OPSIS};

// ---

/// Analyzer lineage selected for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Target {
    #[default]
    Baf,
    Opsis,
}

impl Target {
    pub fn thresholds(self) -> Thresholds {
        match self {
            Target::Baf => BAF_THRESHOLDS,
            Target::Opsis => OPSIS_THRESHOLDS,
        }
    }

    /// Column holding the analyzer's observed NOx.
    pub fn reference_column(self) -> &'static str {
        match self {
            Target::Baf => NOX_BAF,
            Target::Opsis => NOX_OPSIS,
        }
    }

    pub fn predicted(self, p: &RowPrediction) -> f64 {
        match self {
            Target::Baf => p.nox_baf_pred,
            Target::Opsis => p.nox_opsis_pred,
        }
    }

    pub fn alert(self, p: &RowPrediction) -> AlertLevel {
        match self {
            Target::Baf => p.alert_baf,
            Target::Opsis => p.alert_opsis,
        }
    }
}

/// Calendar date range, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    // ---
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ReportError> {
        // ---
        if start > end {
            return Err(ReportError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Range covering every record of `table`.
    pub fn spanning(table: &RawTable) -> Option<Self> {
        let (first, last) = table.time_span()?;
        Some(Self {
            start: first.date(),
            end: last.date(),
        })
    }

    /// Fill whichever bound is absent from the span of `table`.
    pub fn resolve(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        table: &RawTable,
    ) -> Result<Option<Self>, ReportError> {
        // ---
        let Some(span) = Self::spanning(table) else {
            return Ok(None);
        };
        Self::new(start.unwrap_or(span.start), end.unwrap_or(span.end)).map(Some)
    }

    /// `true` when `ts` falls on any day of the range, end day included.
    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        let day = ts.date();
        day >= self.start && day <= self.end
    }
}

/// Number of rows at each alert level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlertDistribution {
    // ---
    #[serde(rename = "OK")]
    pub ok: usize,
    #[serde(rename = "ATTENTION")]
    pub attention: usize,
    #[serde(rename = "DANGER")]
    pub danger: usize,
}

impl AlertDistribution {
    pub fn from_levels(levels: impl IntoIterator<Item = AlertLevel>) -> Self {
        // ---
        let mut dist = Self::default();
        for level in levels {
            match level {
                AlertLevel::Ok => dist.ok += 1,
                AlertLevel::Attention => dist.attention += 1,
                AlertLevel::Danger => dist.danger += 1,
            }
        }
        dist
    }

    pub fn total(&self) -> usize {
        self.ok + self.attention + self.danger
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Distributions {
    pub baf: AlertDistribution,
    pub opsis: AlertDistribution,
    pub combined: AlertDistribution,
}

/// Descriptive statistics of the predictions in view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionStats {
    // ---
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl PredictionStats {
    /// `None` when `values` is empty.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        // ---
        if values.is_empty() {
            return None;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / values.len() as f64;

        Some(Self {
            count: values.len(),
            min,
            max,
            mean,
        })
    }
}

/// One point of the prediction time series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    // ---
    pub date: NaiveDateTime,
    pub observed: Option<f64>,
    pub predicted: f64,
    pub alert: AlertLevel,
}

/// Recap table row, keyed like the exported columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    // ---
    #[serde(rename = "date")]
    pub date: NaiveDateTime,
    #[serde(rename = "Nox opsis")]
    pub nox_opsis: Option<f64>,
    #[serde(rename = "Nox_opsis_pred")]
    pub nox_opsis_pred: f64,
    #[serde(rename = "Alerte_opsis")]
    pub alert_opsis: AlertLevel,
    #[serde(rename = "Nox_baf")]
    pub nox_baf: Option<f64>,
    #[serde(rename = "Nox_baf_pred")]
    pub nox_baf_pred: f64,
    #[serde(rename = "Alerte_baf")]
    pub alert_baf: AlertLevel,
    #[serde(rename = "Alerte")]
    pub alert: AlertLevel,
}

/// Everything the dashboard renders for one target and date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    // ---
    pub target: Target,
    pub thresholds: Thresholds,
    pub range: Option<DateRange>,
    pub total_rows: usize,
    pub filtered_rows: usize,
    pub distribution: Distributions,
    /// Predictions of the selected target.
    pub stats: Option<PredictionStats>,
    pub stats_baf: Option<PredictionStats>,
    pub stats_opsis: Option<PredictionStats>,
    pub series: Vec<SeriesPoint>,
    pub table: Vec<SummaryRow>,
}

impl Summary {
    /// Build the views for `target` over the rows inside `range`, or over
    /// every row when `range` is `None`.
    pub fn build(result: &PredictionTable, target: Target, range: Option<DateRange>) -> Self {
        // ---
        let baf_observed = result.table.numeric_column(NOX_BAF);
        let opsis_observed = result.table.numeric_column(NOX_OPSIS);

        let in_view: Vec<usize> = result
            .rows()
            .enumerate()
            .filter(|(_, (record, _))| range.map_or(true, |r| r.contains(record.timestamp)))
            .map(|(i, _)| i)
            .collect();

        let pred = |i: usize| result.predictions[i];
        let timestamp = |i: usize| result.table.records[i].timestamp;

        let distribution = Distributions {
            baf: AlertDistribution::from_levels(in_view.iter().map(|&i| pred(i).alert_baf)),
            opsis: AlertDistribution::from_levels(in_view.iter().map(|&i| pred(i).alert_opsis)),
            combined: AlertDistribution::from_levels(in_view.iter().map(|&i| pred(i).alert)),
        };

        let stats_for = |t: Target| {
            let values: Vec<f64> = in_view.iter().map(|&i| t.predicted(&pred(i))).collect();
            PredictionStats::from_values(&values)
        };

        let observed = result.table.numeric_column(target.reference_column());

        let series = in_view
            .iter()
            .map(|&i| SeriesPoint {
                date: timestamp(i),
                observed: observed[i],
                predicted: target.predicted(&pred(i)),
                alert: target.alert(&pred(i)),
            })
            .collect();

        let table = in_view
            .iter()
            .map(|&i| {
                let p = pred(i);
                SummaryRow {
                    date: timestamp(i),
                    nox_opsis: opsis_observed[i],
                    nox_opsis_pred: p.nox_opsis_pred,
                    alert_opsis: p.alert_opsis,
                    nox_baf: baf_observed[i],
                    nox_baf_pred: p.nox_baf_pred,
                    alert_baf: p.alert_baf,
                    alert: p.alert,
                }
            })
            .collect();

        tracing::debug!(
            "Summary for {:?}: {} of {} rows in range",
            target,
            in_view.len(),
            result.predictions.len()
        );

        Summary {
            target,
            thresholds: target.thresholds(),
            range,
            total_rows: result.predictions.len(),
            filtered_rows: in_view.len(),
            distribution,
            stats: stats_for(target),
            stats_baf: stats_for(Target::Baf),
            stats_opsis: stats_for(Target::Opsis),
            series,
            table,
        }
    }
}
