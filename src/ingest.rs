//! CSV ingestion of uploaded kiln datasets.
//!
//! Turns raw upload bytes into a [`RawTable`]. The whole upload is rejected
//! on the first fault; no row is ever skipped silently.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use csv::ReaderBuilder;

use crate::error::IngestionError;
use crate::models::{RawRecord, RawTable};
use crate::schema::{self, DATE_COLUMN, DATE_FORMAT, REQUIRED_COLUMNS};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// ---

/// Reader settings shared by ingestion and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// Parse an uploaded CSV into a [`RawTable`].
///
/// Columns left by a previous export are dropped. Missing markers become
/// `None`. Every `date` cell must parse as `DD.MM.YYYY HH:MM`.
pub fn ingest(bytes: &[u8], options: &CsvOptions) -> Result<RawTable, IngestionError> {
    // ---
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let mut reader = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader.byte_headers()?.iter().map(decode).collect();

    let mut seen = HashSet::new();
    for name in &headers {
        if !seen.insert(name.as_str()) {
            return Err(IngestionError::DuplicateColumn(name.clone()));
        }
    }

    for required in REQUIRED_COLUMNS {
        if !seen.contains(required) {
            return Err(IngestionError::MissingColumn(required.to_string()));
        }
    }

    // Positions in the file of the columns we keep.
    let kept: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, name)| !schema::is_derived(name))
        .map(|(i, _)| i)
        .collect();

    if kept.len() < headers.len() {
        tracing::debug!(
            "Dropping {} previously derived column(s) from upload",
            headers.len() - kept.len()
        );
    }

    let columns: Vec<String> = kept.iter().map(|&i| headers[i].clone()).collect();
    let date_pos = columns
        .iter()
        .position(|c| c == DATE_COLUMN)
        .ok_or_else(|| IngestionError::MissingColumn(DATE_COLUMN.to_string()))?;

    let mut records = Vec::new();
    for (i, result) in reader.byte_records().enumerate() {
        let record = result?;
        let row = i + 1;

        let cells: Vec<Option<String>> = kept
            .iter()
            .map(|&idx| {
                let text = record.get(idx).map(decode).unwrap_or_default();
                (!schema::is_missing(&text)).then_some(text)
            })
            .collect();

        let raw_date = cells[date_pos].as_deref().unwrap_or("");
        let timestamp = parse_timestamp(raw_date).ok_or_else(|| {
            IngestionError::InvalidTimestamp {
                row,
                value: raw_date.to_string(),
            }
        })?;

        records.push(RawRecord { timestamp, cells });
    }

    if records.is_empty() {
        return Err(IngestionError::NoRows);
    }

    tracing::info!(
        "Ingested {} rows with {} columns",
        records.len(),
        columns.len()
    );

    Ok(RawTable { columns, records })
}

/// Parse a `date` cell with the fixed `DD.MM.YYYY HH:MM` pattern. Surrounding
/// whitespace is not part of the pattern and is rejected.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, DATE_FORMAT).ok()
}

fn decode(field: &[u8]) -> String {
    String::from_utf8_lossy(field).into_owned()
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::{Datelike, Timelike};

    const SAMPLE: &str = "\
date,sensorA,sensorB,Nox_baf,Nox opsis
01.01.2024 10:00,100,50,,
01.01.2024 11:00,null,55,410,NA
02.01.2024 00:30,120,NA,390.5,330
";

    fn ingest_str(text: &str) -> Result<RawTable, IngestionError> {
        ingest(text.as_bytes(), &CsvOptions::default())
    }

    #[test]
    fn test_ingest_sample() {
        // ---
        let table = ingest_str(SAMPLE).unwrap();

        assert_eq!(
            table.columns,
            vec!["date", "sensorA", "sensorB", "Nox_baf", "Nox opsis"]
        );
        assert_eq!(table.len(), 3);

        let first = &table.records[0];
        assert_eq!(first.timestamp.day(), 1);
        assert_eq!(first.timestamp.hour(), 10);
        assert_eq!(first.cells[1].as_deref(), Some("100"));
        assert_eq!(first.cells[3], None);
        assert_eq!(first.cells[4], None);

        let second = &table.records[1];
        assert_eq!(second.cells[1], None);
        assert_eq!(second.cells[4], None);
        assert_eq!(second.cells[3].as_deref(), Some("410"));

        assert_eq!(table.records[2].timestamp.minute(), 30);
    }

    #[test]
    fn test_ingest_is_deterministic() {
        // ---
        assert_eq!(ingest_str(SAMPLE).unwrap(), ingest_str(SAMPLE).unwrap());
    }

    #[test]
    fn test_missing_date_column() {
        // ---
        let err = ingest_str("sensorA,Nox_baf,Nox opsis\n1,2,3\n").unwrap_err();
        assert!(matches!(err, IngestionError::MissingColumn(c) if c == "date"));
    }

    #[test]
    fn test_missing_reference_column() {
        // ---
        let err = ingest_str("date,sensorA,Nox_baf\n01.01.2024 10:00,1,2\n").unwrap_err();
        assert!(matches!(err, IngestionError::MissingColumn(c) if c == "Nox opsis"));
    }

    #[test]
    fn test_invalid_timestamp_names_row() {
        // ---
        let text = "date,sensorA,Nox_baf,Nox opsis\n\
                    01.01.2024 10:00,1,,\n\
                    2024-01-01 11:00,1,,\n";
        match ingest_str(text).unwrap_err() {
            IngestionError::InvalidTimestamp { row, value } => {
                assert_eq!(row, 2);
                assert_eq!(value, "2024-01-01 11:00");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_timestamp_is_rejected() {
        // ---
        let err = ingest_str("date,sensorA,Nox_baf,Nox opsis\n,1,,\n").unwrap_err();
        assert!(matches!(err, IngestionError::InvalidTimestamp { row: 1, .. }));
    }

    #[test]
    fn test_header_only_upload() {
        // ---
        let err = ingest_str("date,sensorA,Nox_baf,Nox opsis\n").unwrap_err();
        assert!(matches!(err, IngestionError::NoRows));
    }

    #[test]
    fn test_ragged_row_is_malformed() {
        // ---
        let err = ingest_str("date,sensorA,Nox_baf,Nox opsis\n01.01.2024 10:00,1,2\n").unwrap_err();
        assert!(matches!(err, IngestionError::Malformed(_)));
    }

    #[test]
    fn test_duplicate_column() {
        // ---
        let err = ingest_str("date,a,a,Nox_baf,Nox opsis\n01.01.2024 10:00,1,2,,\n").unwrap_err();
        assert!(matches!(err, IngestionError::DuplicateColumn(c) if c == "a"));
    }

    #[test]
    fn test_derived_columns_are_dropped() {
        // ---
        let text = "date,sensorA,Nox_baf,Nox opsis,Nox_baf_pred,Alerte\n\
                    01.01.2024 10:00,1,,,420,ATTENTION\n";
        let table = ingest_str(text).unwrap();
        assert_eq!(table.columns, vec!["date", "sensorA", "Nox_baf", "Nox opsis"]);
        assert_eq!(table.records[0].cells.len(), 4);
    }

    #[test]
    fn test_semicolon_delimiter_and_bom() {
        // ---
        let text = "\u{feff}date;sensorA;Nox_baf;Nox opsis\n01.01.2024 10:00;7;;\n";
        let table = ingest(text.as_bytes(), &CsvOptions { delimiter: b';' }).unwrap();
        assert_eq!(table.columns[0], "date");
        assert_eq!(table.records[0].cells[1].as_deref(), Some("7"));
    }

    #[test]
    fn test_parse_timestamp() {
        // ---
        assert!(parse_timestamp("31.12.2023 23:59").is_some());
        assert!(parse_timestamp("31/12/2023 23:59").is_none());
        assert!(parse_timestamp("32.12.2023 10:00").is_none());
        assert!(parse_timestamp(" 31.12.2023 23:59").is_none());
        assert!(parse_timestamp("31.12.2023 23:59 ").is_none());
    }

    #[test]
    fn test_padded_timestamp_is_rejected() {
        // ---
        let text = "date,sensorA,Nox_baf,Nox opsis\n 01.01.2024 10:00 ,1,,\n";
        match ingest_str(text).unwrap_err() {
            IngestionError::InvalidTimestamp { row, value } => {
                assert_eq!(row, 1);
                assert_eq!(value, " 01.01.2024 10:00 ");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
