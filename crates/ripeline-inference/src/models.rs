// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Predictors
//!
//! Two independent capabilities: a classifier producing a score in
//! `[0, 100]` and a regressor producing a continuous brix value. Model files
//! are JSON documents:
//!
//! ```json
//! { "weights": [0.4, -1.2, 0.9], "intercept": 3.1 }
//! ```

use crate::error::PredictorError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Produces a classification score in `[0, 100]`
pub trait ScorePredictor: Send + Sync {
    fn classify(&self, normalized: &[f64]) -> Result<f64, PredictorError>;

    /// Short name for logs
    fn describe(&self) -> String;
}

/// Produces a continuous value (predicted brix)
pub trait ValuePredictor: Send + Sync {
    fn regress(&self, normalized: &[f64]) -> Result<f64, PredictorError>;

    /// Short name for logs
    fn describe(&self) -> String;
}

/// Weights and intercept shared by the linear model family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearWeights {
    pub weights: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
}

impl LinearWeights {
    fn load(path: &Path) -> Result<Self, PredictorError> {
        let load_error = |reason: String| PredictorError::Load {
            path: path.display().to_string(),
            reason,
        };
        let contents = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        let weights: LinearWeights =
            serde_json::from_str(&contents).map_err(|e| load_error(e.to_string()))?;
        if weights.weights.is_empty() {
            return Err(load_error("model has no weights".to_string()));
        }
        Ok(weights)
    }

    fn dot(&self, input: &[f64]) -> Result<f64, PredictorError> {
        if input.len() != self.weights.len() {
            return Err(PredictorError::DimensionMismatch {
                expected: self.weights.len(),
                found: input.len(),
            });
        }
        let sum: f64 = self.weights.iter().zip(input).map(|(w, x)| w * x).sum();
        Ok(sum + self.intercept)
    }
}

/// Linear regression: `w · x + b`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    name: String,
    params: LinearWeights,
}

impl LinearModel {
    pub fn new(name: impl Into<String>, weights: Vec<f64>, intercept: f64) -> Self {
        Self {
            name: name.into(),
            params: LinearWeights { weights, intercept },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, PredictorError> {
        Ok(Self {
            name: model_name(path),
            params: LinearWeights::load(path)?,
        })
    }
}

impl ValuePredictor for LinearModel {
    fn regress(&self, normalized: &[f64]) -> Result<f64, PredictorError> {
        let value = self.params.dot(normalized)?;
        if !value.is_finite() {
            return Err(PredictorError::OutOfRange(value));
        }
        Ok(value)
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// Logistic classifier: `100 · sigmoid(w · x + b)`
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticModel {
    name: String,
    params: LinearWeights,
}

impl LogisticModel {
    pub fn new(name: impl Into<String>, weights: Vec<f64>, intercept: f64) -> Self {
        Self {
            name: name.into(),
            params: LinearWeights { weights, intercept },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, PredictorError> {
        Ok(Self {
            name: model_name(path),
            params: LinearWeights::load(path)?,
        })
    }
}

impl ScorePredictor for LogisticModel {
    fn classify(&self, normalized: &[f64]) -> Result<f64, PredictorError> {
        let z = self.params.dot(normalized)?;
        if z.is_nan() {
            return Err(PredictorError::OutOfRange(z));
        }
        Ok(100.0 / (1.0 + (-z).exp()))
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// Stand-in when no model file could be loaded; always fails
#[derive(Debug, Clone, PartialEq)]
pub struct UnavailableModel {
    what: String,
}

impl UnavailableModel {
    pub fn new(what: impl Into<String>) -> Self {
        Self { what: what.into() }
    }
}

impl ScorePredictor for UnavailableModel {
    fn classify(&self, _normalized: &[f64]) -> Result<f64, PredictorError> {
        Err(PredictorError::Unavailable(self.what.clone()))
    }

    fn describe(&self) -> String {
        format!("unavailable({})", self.what)
    }
}

impl ValuePredictor for UnavailableModel {
    fn regress(&self, _normalized: &[f64]) -> Result<f64, PredictorError> {
        Err(PredictorError::Unavailable(self.what.clone()))
    }

    fn describe(&self) -> String {
        format!("unavailable({})", self.what)
    }
}

fn model_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_linear_regress() {
        let model = LinearModel::new("brix", vec![2.0, 1.0], 0.5);
        assert_eq!(model.regress(&[3.0, 4.0]), Ok(10.5));
    }

    #[test]
    fn test_dimension_mismatch() {
        let model = LinearModel::new("brix", vec![1.0, 1.0], 0.0);
        assert_eq!(
            model.regress(&[1.0]),
            Err(PredictorError::DimensionMismatch {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_logistic_score_range() {
        let model = LogisticModel::new("clf", vec![1.0], 0.0);
        assert_eq!(model.classify(&[0.0]), Ok(50.0));
        let high = model.classify(&[50.0]).unwrap();
        let low = model.classify(&[-50.0]).unwrap();
        assert!(high <= 100.0 && high > 99.0);
        assert!(low >= 0.0 && low < 1.0);
    }

    #[test]
    fn test_unavailable_always_fails() {
        let model = UnavailableModel::new("default_brix.json");
        assert!(model.regress(&[1.0]).is_err());
        assert!(model.classify(&[1.0]).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"weights": [1.0, 2.0], "intercept": 1.0}}"#).unwrap();

        let model = LinearModel::from_file(file.path()).unwrap();
        assert_eq!(model.regress(&[1.0, 1.0]), Ok(4.0));
    }

    #[test]
    fn test_load_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            LogisticModel::from_file(file.path()),
            Err(PredictorError::Load { .. })
        ));
    }
}
