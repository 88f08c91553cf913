//! Feature assembly: numeric projection and mean imputation.

use crate::error::FeatureError;
use crate::models::{parse_number, RawTable};

// ---

/// Imputation applied to one feature column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnImputation {
    // ---
    pub column: String,
    /// Mean of the non-missing values of this upload.
    pub mean: f64,
    /// Number of cells replaced by `mean`.
    pub filled: usize,
}

/// Dense, row-major model input. Every value is finite.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    // ---
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub imputations: Vec<ColumnImputation>,
}

impl FeatureMatrix {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }
}

/// Build the feature matrix from every column of `table` not in `excluded`.
///
/// Cells that do not coerce to a number are replaced by the mean of their
/// column over this table. A column with no numeric value at all is an error.
pub fn assemble(table: &RawTable, excluded: &[&str]) -> Result<FeatureMatrix, FeatureError> {
    // ---
    let feature_idx: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .filter(|(_, name)| !excluded.contains(&name.as_str()))
        .map(|(i, _)| i)
        .collect();

    if feature_idx.is_empty() {
        return Err(FeatureError::NoFeatures);
    }

    let mut rows: Vec<Vec<f64>> = vec![Vec::with_capacity(feature_idx.len()); table.len()];
    let mut imputations = Vec::with_capacity(feature_idx.len());

    for &idx in &feature_idx {
        let name = &table.columns[idx];
        let values: Vec<Option<f64>> = table
            .records
            .iter()
            .map(|r| r.cells[idx].as_deref().and_then(parse_number))
            .collect();

        let present: Vec<f64> = values.iter().flatten().copied().collect();
        if present.is_empty() {
            return Err(FeatureError::EmptyColumn(name.clone()));
        }
        let mean = present.iter().sum::<f64>() / present.len() as f64;
        let filled = values.len() - present.len();

        if filled > 0 {
            tracing::debug!("Imputed {} cell(s) of '{}' with mean {}", filled, name, mean);
        }

        for (row, value) in rows.iter_mut().zip(values) {
            row.push(value.unwrap_or(mean));
        }

        imputations.push(ColumnImputation {
            column: name.clone(),
            mean,
            filled,
        });
    }

    Ok(FeatureMatrix {
        columns: feature_idx.iter().map(|&i| table.columns[i].clone()).collect(),
        rows,
        imputations,
    })
}
