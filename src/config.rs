//! Configuration loader for the `nox-monitor` backend service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Model artifact locations live here rather than as
//! literals in the pipeline so the canonical files can be swapped per plant.
//!
use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};

use crate::export::ExportOptions;
use crate::ingest::CsvOptions;
use crate::satellite::DEFAULT_IMAGE_URL;

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read an optional string environment variable with a default value.
macro_rules! env_or {
    ($var_name:expr, $default:expr) => {
        env::var($var_name).unwrap_or_else(|_| $default.to_string())
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Artifact of the BAF-lineage model.
    pub baf_model_path: PathBuf,

    /// Artifact of the OPSIS-lineage model.
    pub opsis_model_path: PathBuf,

    /// TCP port the HTTP server binds on all interfaces.
    pub listen_port: u16,

    /// Largest accepted upload body.
    pub max_upload_bytes: u32,

    /// Field delimiter for uploaded and exported CSV.
    pub csv_delimiter: u8,

    /// Append the combined `Alerte` column to exports.
    pub export_combined_alert: bool,

    /// Satellite NOx image shown beside the predictions.
    pub satellite_image_url: String,

    /// Timeout for the satellite image request, in seconds.
    pub satellite_timeout_secs: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            baf_model_path: PathBuf::from("models/Nox1_modele.json"),
            opsis_model_path: PathBuf::from("models/Nox_opsis_linearregression.json"),
            listen_port: 8080,
            max_upload_bytes: 50 * 1024 * 1024,
            csv_delimiter: b',',
            export_combined_alert: true,
            satellite_image_url: DEFAULT_IMAGE_URL.to_string(),
            satellite_timeout_secs: 10,
        }
    }
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `NOX_BAF_MODEL` – BAF model artifact (default: `models/Nox1_modele.json`)
/// - `NOX_OPSIS_MODEL` – OPSIS model artifact
///   (default: `models/Nox_opsis_linearregression.json`)
/// - `LISTEN_PORT` – HTTP port (default: 8080)
/// - `MAX_UPLOAD_BYTES` – upload size limit (default: 50 MiB)
/// - `CSV_DELIMITER` – single ASCII character (default: `,`)
/// - `EXPORT_COMBINED_ALERT` – `true`/`false` (default: true)
/// - `SATELLITE_IMAGE_URL` – image URL (default: NASA OMI 2021 NOx map)
/// - `SATELLITE_TIMEOUT_SECS` – image request timeout (default: 10)
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let defaults = Config::default();

    let baf_model_path = env::var("NOX_BAF_MODEL")
        .map(PathBuf::from)
        .unwrap_or(defaults.baf_model_path);
    let opsis_model_path = env::var("NOX_OPSIS_MODEL")
        .map(PathBuf::from)
        .unwrap_or(defaults.opsis_model_path);

    let listen_port = parse_env_u32!("LISTEN_PORT", u32::from(defaults.listen_port));
    let listen_port =
        u16::try_from(listen_port).map_err(|_| anyhow!("Invalid LISTEN_PORT: {}", listen_port))?;

    let max_upload_bytes = parse_env_u32!("MAX_UPLOAD_BYTES", defaults.max_upload_bytes);
    let satellite_timeout_secs =
        parse_env_u32!("SATELLITE_TIMEOUT_SECS", defaults.satellite_timeout_secs);

    let csv_delimiter = parse_delimiter(&env_or!("CSV_DELIMITER", ","))?;
    let export_combined_alert = parse_bool(
        "EXPORT_COMBINED_ALERT",
        &env_or!("EXPORT_COMBINED_ALERT", "true"),
    )?;
    let satellite_image_url = env_or!("SATELLITE_IMAGE_URL", defaults.satellite_image_url);

    Ok(Config {
        baf_model_path,
        opsis_model_path,
        listen_port,
        max_upload_bytes,
        csv_delimiter,
        export_combined_alert,
        satellite_image_url,
        satellite_timeout_secs,
    })
}

fn parse_delimiter(value: &str) -> Result<u8> {
    // ---
    match value.as_bytes() {
        [b] if b.is_ascii() && !b.is_ascii_alphanumeric() && *b != b'"' => Ok(*b),
        _ => bail!("Invalid CSV_DELIMITER: {:?} (expected one ASCII punctuation or whitespace character)", value),
    }
}

fn parse_bool(var_name: &str, value: &str) -> Result<bool> {
    // ---
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => bail!("Invalid {}: {:?}", var_name, value),
    }
}

impl Config {
    /// Reader settings for uploads.
    pub fn csv_options(&self) -> CsvOptions {
        CsvOptions {
            delimiter: self.csv_delimiter,
        }
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            csv: self.csv_options(),
            include_combined: self.export_combined_alert,
        }
    }

    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  NOX_BAF_MODEL          : {}", self.baf_model_path.display());
        tracing::info!("  NOX_OPSIS_MODEL        : {}", self.opsis_model_path.display());
        tracing::info!("  LISTEN_PORT            : {}", self.listen_port);
        tracing::info!("  MAX_UPLOAD_BYTES       : {}", self.max_upload_bytes);
        tracing::info!("  CSV_DELIMITER          : {:?}", self.csv_delimiter as char);
        tracing::info!("  EXPORT_COMBINED_ALERT  : {}", self.export_combined_alert);
        tracing::info!("  SATELLITE_IMAGE_URL    : {}", self.satellite_image_url);
        tracing::info!("  SATELLITE_TIMEOUT_SECS : {}", self.satellite_timeout_secs);
    }
}
