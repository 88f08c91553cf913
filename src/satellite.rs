//! Satellite NOx imagery fetched for display next to the predictions.
//!
//! Failures here are warnings, never errors: the prediction pipeline does not
//! depend on the image.

use axum::body::Bytes;
use thiserror::Error;

// ---

/// Default image: global NOx pollution, NASA OMI, 2021.
pub const DEFAULT_IMAGE_URL: &str =
    "https://eoimages.gsfc.nasa.gov/images/imagerecords/144000/144348/pollution_nox_omi_2021_lrg.jpg";

#[derive(Error, Debug)]
pub enum NetworkWarning {
    #[error("satellite image request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("satellite image server answered {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Debug, Clone)]
pub struct SatelliteImage {
    // ---
    pub content_type: String,
    pub bytes: Bytes,
}

/// Download the image at `url`.
pub async fn fetch_image(client: &reqwest::Client, url: &str) -> Result<SatelliteImage, NetworkWarning> {
    // ---
    tracing::debug!("Fetching satellite image from {}", url);

    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(NetworkWarning::Status(response.status()));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("image/jpeg")
        .to_string();
    let bytes = response.bytes().await?;

    tracing::info!("Fetched satellite image ({} bytes)", bytes.len());
    Ok(SatelliteImage { content_type, bytes })
}
