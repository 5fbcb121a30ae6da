//! The persisted over/under classifier: feature schema, scaler and forest, and the derived
//! first-five-innings total.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::features::{FeatureMismatch, FeatureSchema};
use crate::file;
use crate::forest::RandomForest;
use crate::scaler::StandardScaler;

pub const DEFAULT_LINE: f64 = 4.5;

/// Multiplier taking the probability of the over to a nominal first-five run total.
pub const TOTAL_SCALE: f64 = 6.;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{0}")]
    FeatureMismatch(#[from] FeatureMismatch),

    #[error("model artifact {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Everything the classifier says about one feature vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assessment {
    pub over: bool,
    /// Probability of the predicted class.
    pub confidence: f64,
    pub model_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverModel {
    pub schema: FeatureSchema,
    pub scaler: StandardScaler,
    pub forest: RandomForest,
    pub line: f64,
    pub total_scale: f64,
}
impl OverModel {
    pub fn new(scaler: StandardScaler, forest: RandomForest, line: f64) -> Self {
        Self {
            schema: FeatureSchema::current(),
            scaler,
            forest,
            line,
            total_scale: TOTAL_SCALE,
        }
    }

    /// Checks that the artifact was fitted on the features this build produces.
    pub fn validate(&self) -> Result<(), FeatureMismatch> {
        FeatureSchema::current().check(&self.schema)?;
        self.schema.check_len(self.scaler.cols())?;
        self.schema.check_len(self.forest.features())
    }

    fn proba(&self, features: &[f64]) -> Result<[f64; 2], FeatureMismatch> {
        self.schema.check_len(features.len())?;
        let scaled = self.scaler.transform(features)?;
        Ok(self.forest.predict_proba(&scaled))
    }

    pub fn predict(&self, features: &[f64]) -> Result<bool, FeatureMismatch> {
        Ok(self.assess(features)?.over)
    }

    pub fn predict_confidence(&self, features: &[f64]) -> Result<f64, FeatureMismatch> {
        Ok(self.assess(features)?.confidence)
    }

    pub fn predict_total(&self, features: &[f64]) -> Result<f64, FeatureMismatch> {
        Ok(self.assess(features)?.model_total)
    }

    pub fn assess(&self, features: &[f64]) -> Result<Assessment, FeatureMismatch> {
        let [p_under, p_over] = self.proba(features)?;
        let over = p_over > p_under;
        Ok(Assessment {
            over,
            confidence: if over { p_over } else { p_under },
            model_total: p_over * self.total_scale,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        file::write_json(path, self).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("saved model to {}", path.display());
        Ok(())
    }

    /// Loads an artifact, refusing one whose feature schema differs from the current one.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let model: Self = file::read_json(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        model.validate()?;
        debug!(
            "loaded model from {}: {} trees, line {}",
            path.display(),
            model.forest.trees().len(),
            model.line
        );
        Ok(model)
    }
}
