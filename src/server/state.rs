//! Application state management

use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::inference::ProfitModel;

use super::error::{Result, ServerError};
use super::ServerConfig;

/// Application state shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    /// Model used when a prediction request carries no model file
    default_model: RwLock<Option<Arc<ProfitModel>>>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Build state, loading the default model from the configured path.
    ///
    /// A missing or unreadable default model is not fatal here; prediction
    /// requests without a model file retry the load and fail if it still
    /// cannot be read.
    pub fn new(config: ServerConfig) -> Self {
        let default_model = match ProfitModel::load(&config.default_model_path) {
            Ok(model) => {
                info!(
                    path = %config.default_model_path.display(),
                    model_name = %model.name,
                    n_features = model.n_features(),
                    "Default model loaded"
                );
                Some(Arc::new(model))
            }
            Err(e) => {
                warn!(
                    path = %config.default_model_path.display(),
                    error = %e,
                    "Default model unavailable, predictions without a model file will fail until it is provisioned"
                );
                None
            }
        };

        Self::with_default_model(config, default_model)
    }

    /// Build state around an already loaded default model
    pub fn with_default_model(config: ServerConfig, default_model: Option<Arc<ProfitModel>>) -> Self {
        Self {
            config,
            default_model: RwLock::new(default_model),
            started_at: chrono::Utc::now(),
        }
    }

    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()[..8].to_string()
    }

    pub async fn has_default_model(&self) -> bool {
        self.default_model.read().await.is_some()
    }

    /// The default model, loading it from disk if it is not held yet
    pub async fn default_model(&self) -> Result<Arc<ProfitModel>> {
        if let Some(model) = self.default_model.read().await.as_ref() {
            return Ok(Arc::clone(model));
        }
        self.reload_default_model().await
    }

    /// Re-read the default model from the configured path and swap it in
    pub async fn reload_default_model(&self) -> Result<Arc<ProfitModel>> {
        let path = self.config.default_model_path.clone();
        let model = Arc::new(load_model_file(&path).await?);

        *self.default_model.write().await = Some(Arc::clone(&model));
        info!(path = %path.display(), model_name = %model.name, "Default model reloaded");
        Ok(model)
    }
}

async fn load_model_file(path: &Path) -> Result<ProfitModel> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        ServerError::ModelLoadFailure(format!("{}: {}", path.display(), e))
    })?;
    ProfitModel::from_bytes(&bytes)
        .map_err(|e| ServerError::ModelLoadFailure(format!("{}: {}", path.display(), e)))
}
