//! CSV export of a [`PredictionTable`].

use csv::WriterBuilder;

use crate::ingest::CsvOptions;
use crate::models::PredictionTable;
use crate::schema::{
    ALERT_BAF, ALERT_COMBINED, ALERT_OPSIS, NOX_BAF_PRED, NOX_OPSIS_PRED,
};

/// Download file name offered to clients.
pub const EXPORT_FILE_NAME: &str = "nox_resultats.csv";

#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    // ---
    pub csv: CsvOptions,
    /// Append the combined `Alerte` column.
    pub include_combined: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            csv: CsvOptions::default(),
            include_combined: true,
        }
    }
}

/// Write the original columns followed by the derived ones.
///
/// Original cells are written verbatim (missing cells empty), so ingesting
/// the output again reproduces the uploaded records.
pub fn to_csv(result: &PredictionTable, options: &ExportOptions) -> Result<Vec<u8>, csv::Error> {
    // ---
    let mut writer = WriterBuilder::new()
        .delimiter(options.csv.delimiter)
        .from_writer(Vec::new());

    let mut header: Vec<&str> = result.table.columns.iter().map(String::as_str).collect();
    header.extend([NOX_BAF_PRED, NOX_OPSIS_PRED, ALERT_BAF, ALERT_OPSIS]);
    if options.include_combined {
        header.push(ALERT_COMBINED);
    }
    writer.write_record(&header)?;

    for (record, pred) in result.rows() {
        let mut row: Vec<String> = record
            .cells
            .iter()
            .map(|c| c.clone().unwrap_or_default())
            .collect();
        row.push(pred.nox_baf_pred.to_string());
        row.push(pred.nox_opsis_pred.to_string());
        row.push(pred.alert_baf.to_string());
        row.push(pred.alert_opsis.to_string());
        if options.include_combined {
            row.push(pred.alert.to_string());
        }
        writer.write_record(&row)?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}
