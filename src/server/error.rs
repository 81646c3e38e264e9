//! Error types for the server
//!
//! Every handler returns [`ServerError`], so all endpoints share one mapping
//! from failure kind to status code and `{"error": "..."}` body. Causes of
//! 5xx failures are logged and never sent to the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub const UNSUPPORTED_MODEL_FORMAT: &str = "Unsupported model file format. Use .pkl.";
pub const MISSING_TRAINING_INPUT: &str = "Model name or file is missing";
pub const UNSUPPORTED_DATASET_FORMAT: &str = "Unsupported file format. Use CSV or JSON.";
pub const TRAINING_FAILED: &str = "An error occurred while training the model.";
pub const MODEL_LOAD_FAILED: &str = "Failed to load model.";
pub const INFERENCE_FAILED: &str = "An error occurred while making the prediction.";

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Model load failure: {0}")]
    ModelLoadFailure(String),

    #[error("Inference failure: {0}")]
    InferenceFailure(String),

    #[error("Training failure: {0}")]
    TrainingFailure(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidInput(_)
            | ServerError::MissingInput(_)
            | ServerError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
            ServerError::ModelLoadFailure(_)
            | ServerError::InferenceFailure(_)
            | ServerError::TrainingFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let message = match &self {
            ServerError::InvalidInput(msg)
            | ServerError::MissingInput(msg)
            | ServerError::UnsupportedFormat(msg) => msg.clone(),
            ServerError::ModelLoadFailure(detail) => {
                tracing::error!(detail = %detail, "Model load failed");
                MODEL_LOAD_FAILED.to_string()
            }
            ServerError::InferenceFailure(detail) => {
                tracing::error!(detail = %detail, "Inference failed");
                INFERENCE_FAILED.to_string()
            }
            ServerError::TrainingFailure(detail) => {
                tracing::error!(detail = %detail, "Training failed");
                TRAINING_FAILED.to_string()
            }
        };

        (self.status(), Json(json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_client_errors_expose_message() {
        let response = ServerError::UnsupportedFormat(UNSUPPORTED_MODEL_FORMAT.to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({ "error": UNSUPPORTED_MODEL_FORMAT }));
    }

    #[tokio::test]
    async fn test_server_errors_hide_detail() {
        let response = ServerError::TrainingFailure("polars exploded at row 7".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!({ "error": TRAINING_FAILED }));

        let response = ServerError::ModelLoadFailure("bad magic".to_string()).into_response();
        assert_eq!(body_json(response).await, json!({ "error": MODEL_LOAD_FAILED }));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ServerError::MissingInput(String::new()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ServerError::InvalidInput(String::new()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServerError::InferenceFailure(String::new()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
