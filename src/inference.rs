//! Regression models that turn a [`FeatureMatrix`] into NOx predictions.
//!
//! Models are trained elsewhere and shipped as JSON artifacts holding the
//! fitted linear form. Two artifact kinds are understood:
//!
//! ```json
//! { "kind": "linear_regression", "intercept": 12.0,
//!   "coefficients": [0.5, 1.2], "feature_names": ["o2", "kiln_speed"] }
//!
//! { "kind": "pls_regression", "y_mean": 380.0,
//!   "x_mean": [3.1, 4.0], "x_std": [0.4, 0.2],
//!   "coefficients": [25.0, -10.0], "feature_names": ["o2", "kiln_speed"] }
//! ```
//!
//! `feature_names` is optional. With names, upload columns are matched by
//! name; without, the upload must have exactly as many feature columns as
//! the model has coefficients, in the same order.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ModelError;
use crate::features::FeatureMatrix;

// ---

/// Capability shared by every loaded regression model.
pub trait NoxModel: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// One prediction per row of `features`. Fails as a whole if the matrix
    /// does not fit the model.
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>, ModelError>;
}

/// Ordinary least squares: `intercept + Σ coef·x`.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearRegression {
    // ---
    #[serde(skip)]
    pub name: String,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
}

/// Partial least squares in its fitted linear form on standardised inputs:
/// `y_mean + Σ coef·(x − x_mean)/x_std`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlsRegression {
    // ---
    #[serde(skip)]
    pub name: String,
    pub y_mean: f64,
    pub x_mean: Vec<f64>,
    pub x_std: Vec<f64>,
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ModelArtifact {
    LinearRegression(LinearRegression),
    PlsRegression(PlsRegression),
}

impl NoxModel for LinearRegression {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>, ModelError> {
        // ---
        let order = column_order(
            &self.name,
            self.feature_names.as_deref(),
            self.coefficients.len(),
            features,
        )?;

        Ok(features
            .rows
            .iter()
            .map(|row| {
                self.intercept
                    + order
                        .iter()
                        .zip(&self.coefficients)
                        .map(|(&i, c)| row[i] * c)
                        .sum::<f64>()
            })
            .collect())
    }
}

impl NoxModel for PlsRegression {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>, ModelError> {
        // ---
        let order = column_order(
            &self.name,
            self.feature_names.as_deref(),
            self.coefficients.len(),
            features,
        )?;

        Ok(features
            .rows
            .iter()
            .map(|row| {
                let mut y = self.y_mean;
                for (k, &i) in order.iter().enumerate() {
                    y += self.coefficients[k] * (row[i] - self.x_mean[k]) / self.x_std[k];
                }
                y
            })
            .collect())
    }
}

/// Index into each matrix row for every model coefficient, in coefficient
/// order.
fn column_order(
    model: &str,
    names: Option<&[String]>,
    n_coefficients: usize,
    features: &FeatureMatrix,
) -> Result<Vec<usize>, ModelError> {
    // ---
    let Some(names) = names else {
        if features.n_features() != n_coefficients {
            return Err(ModelError::FeatureCountMismatch {
                model: model.to_string(),
                expected: n_coefficients,
                found: features.n_features(),
            });
        }
        return Ok((0..n_coefficients).collect());
    };

    let mut order = Vec::with_capacity(names.len());
    for name in names {
        let idx = features
            .columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| ModelError::MissingFeature {
                model: model.to_string(),
                feature: name.clone(),
            })?;
        order.push(idx);
    }

    if let Some(extra) = features.columns.iter().find(|c| !names.contains(c)) {
        return Err(ModelError::UnexpectedFeature {
            model: model.to_string(),
            feature: extra.clone(),
        });
    }

    Ok(order)
}

fn invalid(model: &str, reason: impl Into<String>) -> ModelError {
    ModelError::InvalidArtifact {
        model: model.to_string(),
        reason: reason.into(),
    }
}

fn check_coefficients(
    model: &str,
    coefficients: &[f64],
    names: Option<&[String]>,
) -> Result<(), ModelError> {
    // ---
    if coefficients.is_empty() {
        return Err(invalid(model, "no coefficients"));
    }
    if coefficients.iter().any(|c| !c.is_finite()) {
        return Err(invalid(model, "non-finite coefficient"));
    }
    if let Some(names) = names {
        if names.len() != coefficients.len() {
            return Err(invalid(
                model,
                format!(
                    "{} feature names for {} coefficients",
                    names.len(),
                    coefficients.len()
                ),
            ));
        }
    }
    Ok(())
}

impl LinearRegression {
    fn validate(&self) -> Result<(), ModelError> {
        // ---
        check_coefficients(&self.name, &self.coefficients, self.feature_names.as_deref())?;
        if !self.intercept.is_finite() {
            return Err(invalid(&self.name, "non-finite intercept"));
        }
        Ok(())
    }
}

impl PlsRegression {
    fn validate(&self) -> Result<(), ModelError> {
        // ---
        check_coefficients(&self.name, &self.coefficients, self.feature_names.as_deref())?;

        let n = self.coefficients.len();
        if self.x_mean.len() != n || self.x_std.len() != n {
            return Err(invalid(
                &self.name,
                "x_mean and x_std must have one entry per coefficient",
            ));
        }
        if self.x_std.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return Err(invalid(&self.name, "x_std entries must be finite and non-zero"));
        }
        if !self.y_mean.is_finite() || self.x_mean.iter().any(|m| !m.is_finite()) {
            return Err(invalid(&self.name, "non-finite centering value"));
        }
        Ok(())
    }
}

/// Load and validate one model artifact. The model is named after the file
/// stem.
pub fn load_model(path: &Path) -> Result<Box<dyn NoxModel>, ModelError> {
    // ---
    let text = fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let artifact: ModelArtifact =
        serde_json::from_str(&text).map_err(|source| ModelError::Format {
            path: path.to_path_buf(),
            source,
        })?;

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let model: Box<dyn NoxModel> = match artifact {
        ModelArtifact::LinearRegression(mut m) => {
            m.name = name;
            m.validate()?;
            tracing::info!("Loaded linear regression '{}' ({} features)", m.name, m.coefficients.len());
            Box::new(m)
        }
        ModelArtifact::PlsRegression(mut m) => {
            m.name = name;
            m.validate()?;
            tracing::info!("Loaded PLS regression '{}' ({} features)", m.name, m.coefficients.len());
            Box::new(m)
        }
    };

    Ok(model)
}

/// The two models every prediction run applies. Built once at startup and
/// shared read-only between requests.
pub struct ModelSet {
    // ---
    pub baf: Box<dyn NoxModel>,
    pub opsis: Box<dyn NoxModel>,
}

impl ModelSet {
    pub fn new(baf: Box<dyn NoxModel>, opsis: Box<dyn NoxModel>) -> Self {
        Self { baf, opsis }
    }

    /// Load both artifacts. Either failing is fatal.
    pub fn load(baf_path: &Path, opsis_path: &Path) -> Result<Self, ModelError> {
        // ---
        Ok(Self {
            baf: load_model(baf_path)?,
            opsis: load_model(opsis_path)?,
        })
    }
}
