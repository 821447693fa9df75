// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Model registry
//!
//! Loaded once at start-up. For every `(fruit, variety)` known to the device
//! directory it loads `BRIX_{fruit}_{variety}.json` and
//! `CLF_{fruit}_{variety}.json` from the model directory. Each file falls back
//! independently to the default model, and a missing default becomes an
//! [`UnavailableModel`]. Resolution therefore never comes back empty.

use crate::models::{LinearModel, LogisticModel, ScorePredictor, UnavailableModel, ValuePredictor};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Predictors resolved for one fruit variety
#[derive(Clone)]
pub struct ModelPair {
    pub classifier: Arc<dyn ScorePredictor>,
    pub regressor: Arc<dyn ValuePredictor>,
}

impl std::fmt::Debug for ModelPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelPair")
            .field("classifier", &self.classifier.describe())
            .field("regressor", &self.regressor.describe())
            .finish()
    }
}

/// Where model files live and what the defaults are called
#[derive(Debug, Clone)]
pub struct ModelRegistryConfig {
    pub model_dir: PathBuf,
    pub default_brix_model: String,
    pub default_classifier_model: String,
}

impl Default for ModelRegistryConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            default_brix_model: "default_brix.json".to_string(),
            default_classifier_model: "default_clf.json".to_string(),
        }
    }
}

/// `(fruit, variety) -> predictors`, with a guaranteed default
pub struct ModelRegistry {
    default: ModelPair,
    varieties: HashMap<(String, String), ModelPair>,
}

impl ModelRegistry {
    /// Registry that only has the given default pair
    pub fn with_default(default: ModelPair) -> Self {
        Self {
            default,
            varieties: HashMap::new(),
        }
    }

    /// Register models for one variety
    pub fn insert(&mut self, fruit: impl Into<String>, variety: impl Into<String>, models: ModelPair) {
        self.varieties.insert((fruit.into(), variety.into()), models);
    }

    /// Load defaults and per-variety models from disk
    pub fn load<I>(config: &ModelRegistryConfig, varieties: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let default = ModelPair {
            classifier: load_classifier(&config.model_dir.join(&config.default_classifier_model))
                .unwrap_or_else(|| {
                    error!(
                        "Default classifier {} unavailable; status will be reported as -1",
                        config.default_classifier_model
                    );
                    Arc::new(UnavailableModel::new(config.default_classifier_model.clone()))
                }),
            regressor: load_regressor(&config.model_dir.join(&config.default_brix_model))
                .unwrap_or_else(|| {
                    error!(
                        "Default brix model {} unavailable; brix will be reported as -1",
                        config.default_brix_model
                    );
                    Arc::new(UnavailableModel::new(config.default_brix_model.clone()))
                }),
        };

        let mut registry = Self::with_default(default);

        for (fruit, variety) in varieties {
            let brix_path = config.model_dir.join(format!("BRIX_{}_{}.json", fruit, variety));
            let clf_path = config.model_dir.join(format!("CLF_{}_{}.json", fruit, variety));

            let regressor = load_regressor(&brix_path).unwrap_or_else(|| {
                warn!("Using default brix model for {}/{}", fruit, variety);
                Arc::clone(&registry.default.regressor)
            });
            let classifier = load_classifier(&clf_path).unwrap_or_else(|| {
                warn!("Using default classifier for {}/{}", fruit, variety);
                Arc::clone(&registry.default.classifier)
            });

            registry.insert(fruit, variety, ModelPair { classifier, regressor });
        }

        info!("Model registry ready ({} variety model set(s))", registry.varieties.len());
        registry
    }

    /// Predictors for a variety; unknown varieties get the defaults
    pub fn resolve(&self, fruit: &str, variety: &str) -> ModelPair {
        self.varieties
            .get(&(fruit.to_string(), variety.to_string()))
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }

    pub fn default_models(&self) -> &ModelPair {
        &self.default
    }

    pub fn variety_count(&self) -> usize {
        self.varieties.len()
    }
}

fn load_regressor(path: &Path) -> Option<Arc<dyn ValuePredictor>> {
    match LinearModel::from_file(path) {
        Ok(model) => {
            info!("Loaded brix model {}", path.display());
            Some(Arc::new(model))
        }
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}

fn load_classifier(path: &Path) -> Option<Arc<dyn ScorePredictor>> {
    match LogisticModel::from_file(path) {
        Ok(model) => {
            info!("Loaded classifier {}", path.display());
            Some(Arc::new(model))
        }
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}
