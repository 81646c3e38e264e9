//! Serialized model artifact

use crate::error::{PredictorError, Result};
use crate::training::LinearRegression;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// File extension recognized for serialized models
pub const MODEL_FILE_EXTENSION: &str = ".pkl";

/// Whether a file name ends in the serialized-model extension (exact, case-sensitive)
pub fn has_model_extension(file_name: &str) -> bool {
    file_name.ends_with(MODEL_FILE_EXTENSION)
}

/// A fitted regression together with the layout of the features it expects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfitModel {
    pub name: String,
    /// Design matrix column names, in inference order
    pub feature_names: Vec<String>,
    /// Column that was one-hot encoded at fit time
    pub categorical_column: String,
    pub categories: Vec<String>,
    pub trained_at: String,
    pub regression: LinearRegression,
}

impl ProfitModel {
    pub fn new(
        name: String,
        feature_names: Vec<String>,
        categorical_column: String,
        categories: Vec<String>,
        regression: LinearRegression,
    ) -> Self {
        Self {
            name,
            feature_names,
            categorical_column,
            categories,
            trained_at: chrono::Utc::now().to_rfc3339(),
            regression,
        }
    }

    /// Number of features a sample must have
    pub fn n_features(&self) -> usize {
        self.regression.n_features().unwrap_or(self.feature_names.len())
    }

    /// Single-sample inference
    pub fn predict_one(&self, features: &[f64]) -> Result<f64> {
        self.regression
            .predict_one(features)
            .map_err(|e| PredictorError::InferenceError(e.to_string()))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Stream the bincode encoding into a writer
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        bincode::serialize_into(writer, self)?;
        Ok(())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let model: Self = bincode::deserialize(bytes)?;
        if !model.regression.is_fitted {
            return Err(PredictorError::ModelNotFitted);
        }
        Ok(model)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}
