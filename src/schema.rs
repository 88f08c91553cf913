//! Column schema for uploaded kiln datasets and exported results.
//!
//! Column names are part of the file contract with the plant's export tooling
//! and are kept exactly as they appear there, including the inconsistent
//! spacing of `Nox opsis`.

/// Timestamp column, formatted as [`DATE_FORMAT`].
pub const DATE_COLUMN: &str = "date";

/// `chrono` pattern for the timestamp column (`DD.MM.YYYY HH:MM`).
pub const DATE_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Observed NOx from the BAF analyzer.
pub const NOX_BAF: &str = "Nox_baf";

/// Observed NOx from the OPSIS analyzer.
pub const NOX_OPSIS: &str = "Nox opsis";

pub const NOX_BAF_PRED: &str = "Nox_baf_pred";
pub const NOX_OPSIS_PRED: &str = "Nox_opsis_pred";
pub const ALERT_BAF: &str = "Alerte_baf";
pub const ALERT_OPSIS: &str = "Alerte_opsis";
pub const ALERT_COMBINED: &str = "Alerte";

/// Cell values treated as missing, compared after trimming.
pub const MISSING_MARKERS: [&str; 3] = ["", "null", "NA"];

/// Columns every upload must carry.
pub const REQUIRED_COLUMNS: [&str; 3] = [DATE_COLUMN, NOX_BAF, NOX_OPSIS];

/// Columns never fed to the models: exactly the required ones, since every
/// other column of an upload is a sensor feature.
pub const NON_FEATURE_COLUMNS: [&str; 3] = REQUIRED_COLUMNS;

/// Columns appended by an export. Dropped again on ingestion so a
/// re-uploaded result file is recomputed from its raw columns.
pub const DERIVED_COLUMNS: [&str; 5] = [
    NOX_BAF_PRED,
    NOX_OPSIS_PRED,
    ALERT_BAF,
    ALERT_OPSIS,
    ALERT_COMBINED,
];

/// Returns `true` when `cell` is one of the [`MISSING_MARKERS`].
pub fn is_missing(cell: &str) -> bool {
    // ---
    MISSING_MARKERS.contains(&cell.trim())
}

pub fn is_derived(column: &str) -> bool {
    DERIVED_COLUMNS.contains(&column)
}
