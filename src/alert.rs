//! Alert classification of predicted NOx concentrations.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---

/// Severity of a predicted NOx value.
///
/// Variant order is the severity order, so `Ord` and `max` give the most
/// severe level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Ok,
    Attention,
    Danger,
}

impl AlertLevel {
    pub const ALL: [AlertLevel; 3] = [AlertLevel::Ok, AlertLevel::Attention, AlertLevel::Danger];

    /// Label written to exported files.
    pub fn as_str(self) -> &'static str {
        // ---
        match self {
            AlertLevel::Ok => "OK",
            AlertLevel::Attention => "ATTENTION",
            AlertLevel::Danger => "DANGER",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower bounds (inclusive) of the ATTENTION and DANGER levels, in mg/Nm³.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    // ---
    pub attention: f64,
    pub danger: f64,
}

/// Fixed thresholds for the BAF analyzer lineage.
pub const BAF_THRESHOLDS: Thresholds = Thresholds {
    attention: 400.0,
    danger: 500.0,
};

/// Fixed thresholds for the OPSIS analyzer lineage.
pub const OPSIS_THRESHOLDS: Thresholds = Thresholds {
    attention: 350.0,
    danger: 450.0,
};

/// Classify `value` against `thresholds`. Both bounds are inclusive.
pub fn classify(value: f64, thresholds: &Thresholds) -> AlertLevel {
    // ---
    if value >= thresholds.danger {
        AlertLevel::Danger
    } else if value >= thresholds.attention {
        AlertLevel::Attention
    } else {
        AlertLevel::Ok
    }
}

/// Most severe of the two per-model levels.
pub fn combined(baf: AlertLevel, opsis: AlertLevel) -> AlertLevel {
    baf.max(opsis)
}
