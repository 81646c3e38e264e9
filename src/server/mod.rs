//! Profit predictor server module
//!
//! Exposes the prediction and training endpoints over HTTP.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::{
    ServerError, INFERENCE_FAILED, MISSING_TRAINING_INPUT, MODEL_LOAD_FAILED, TRAINING_FAILED,
    UNSUPPORTED_DATASET_FORMAT, UNSUPPORTED_MODEL_FORMAT,
};
pub use handlers::sanitize_model_name;
pub use state::AppState;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::preprocessing::CategoryPolicy;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Model used by predictions that do not upload one
    pub default_model_path: PathBuf,
    /// Directory for the transient artifacts written during training
    pub temp_dir: PathBuf,
    pub max_upload_size: usize,
    pub category_policy: CategoryPolicy,
    /// Allowed CORS origin, any origin when `None`
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            default_model_path: std::env::var("DEFAULT_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./model/linear_regression_model.pkl")),
            temp_dir: std::env::var("TRAIN_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir()),
            max_upload_size: std::env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100 * 1024 * 1024), // 100MB
            category_policy: CategoryPolicy::from_strict_flag(
                std::env::var("STRICT_CATEGORIES")
                    .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                    .unwrap_or(false),
            ),
            cors_origin: std::env::var("CORS_ORIGIN").ok(),
        }
    }
}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();

    std::fs::create_dir_all(&config.temp_dir)?;

    let state = Arc::new(AppState::new(config.clone()));
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        address = %addr,
        default_model = %config.default_model_path.display(),
        temp_dir = %config.temp_dir.display(),
        max_upload_size_mb = config.max_upload_size / 1024 / 1024,
        category_policy = ?config.category_policy,
        started_at = %start_time.to_rfc3339(),
        "Profit predictor server starting"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install ctrl+c handler");
            std::future::pending::<()>().await;
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(uptime_secs = uptime.num_seconds(), "Shutdown signal received, stopping server gracefully");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.max_upload_size, 100 * 1024 * 1024);
        assert!(config.default_model_path.to_string_lossy().ends_with(".pkl"));
    }
}
