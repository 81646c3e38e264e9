//! HTTP request handlers

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::PredictorError;
use crate::inference::{
    has_model_extension, PredictionInput, ProfitModel, FEATURE_VECTOR_WIDTH, MODEL_FILE_EXTENSION,
};
use crate::training::{TrainEngine, TrainingConfig};
use crate::utils::{DataLoader, DatasetFormat};

use super::error::{
    Result, ServerError, MISSING_TRAINING_INPUT, UNSUPPORTED_DATASET_FORMAT,
    UNSUPPORTED_MODEL_FORMAT,
};
use super::state::AppState;

const MODEL_FILE_FIELD: &str = "model-file";
const MODEL_NAME_FIELD: &str = "modelName";
const DATASET_FILE_FIELD: &str = "file";

/// A file part from a multipart upload
struct UploadedFile {
    file_name: String,
    data: Bytes,
}

fn invalid_input(err: PredictorError) -> ServerError {
    match err {
        PredictorError::InvalidInput(msg) => ServerError::InvalidInput(msg),
        other => ServerError::InvalidInput(other.to_string()),
    }
}

// ============================================================================
// Prediction
// ============================================================================

/// Raw prediction request: text fields plus an optional model upload
struct PredictRequest {
    fields: HashMap<String, String>,
    model_file: Option<UploadedFile>,
}

impl PredictRequest {
    /// Accepts multipart, url-encoded and JSON bodies
    async fn extract(request: Request) -> Result<Self> {
        let content_type = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(request, &())
                .await
                .map_err(|e| ServerError::InvalidInput(e.body_text()))?;
            Self::from_multipart(multipart).await
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(request, &())
                .await
                .map_err(|e| ServerError::InvalidInput(e.body_text()))?;
            Ok(Self { fields, model_file: None })
        } else {
            let Json(body) = Json::<HashMap<String, Value>>::from_request(request, &())
                .await
                .map_err(|e| ServerError::InvalidInput(e.body_text()))?;
            let fields = body
                .into_iter()
                .filter_map(|(key, value)| match value {
                    Value::String(s) => Some((key, s)),
                    Value::Number(n) => Some((key, n.to_string())),
                    _ => None,
                })
                .collect();
            Ok(Self { fields, model_file: None })
        }
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self> {
        let mut fields = HashMap::new();
        let mut model_file = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ServerError::InvalidInput(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == MODEL_FILE_FIELD {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::InvalidInput(e.body_text()))?;
                // Browsers send an empty part when no file was chosen
                if !(file_name.is_empty() && data.is_empty()) {
                    model_file = Some(UploadedFile { file_name, data });
                }
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServerError::InvalidInput(e.body_text()))?;
                fields.insert(name, text);
            }
        }

        Ok(Self { fields, model_file })
    }
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Value>> {
    let request = PredictRequest::extract(request).await?;

    let (model, source) = match request.model_file {
        Some(upload) => {
            if !has_model_extension(&upload.file_name) {
                return Err(ServerError::UnsupportedFormat(UNSUPPORTED_MODEL_FORMAT.to_string()));
            }
            let model = ProfitModel::from_bytes(&upload.data).map_err(|e| {
                ServerError::ModelLoadFailure(format!("{}: {}", upload.file_name, e))
            })?;
            (Arc::new(model), upload.file_name)
        }
        None => (state.default_model().await?, "default".to_string()),
    };

    if model.n_features() != FEATURE_VECTOR_WIDTH {
        return Err(ServerError::ModelLoadFailure(format!(
            "Model '{}' from {} expects {} features, prediction requests provide {}",
            model.name,
            source,
            model.n_features(),
            FEATURE_VECTOR_WIDTH
        )));
    }

    let input = PredictionInput::from_fields(&request.fields).map_err(invalid_input)?;
    let features = input
        .feature_vector(state.config.category_policy)
        .map_err(invalid_input)?;

    let prediction = model
        .predict_one(&features)
        .map_err(|e| ServerError::InferenceFailure(e.to_string()))?;
    if !prediction.is_finite() {
        return Err(ServerError::InferenceFailure(format!(
            "Model '{}' produced a non-finite prediction",
            model.name
        )));
    }

    info!(model = %source, state = %input.state, prediction, "Prediction served");

    Ok(Json(serde_json::json!({ "prediction": prediction })))
}

// ============================================================================
// Training
// ============================================================================

/// Keep a model name safe for file names and headers
pub fn sanitize_model_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(64)
        .collect();

    if cleaned.is_empty() {
        "model".to_string()
    } else {
        cleaned
    }
}

pub async fn train(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response> {
    // A body that is not multipart carries neither field
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|_| ServerError::MissingInput(MISSING_TRAINING_INPUT.to_string()))?;

    let mut model_name: Option<String> = None;
    let mut dataset: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::InvalidInput(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            MODEL_NAME_FIELD => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServerError::InvalidInput(e.body_text()))?;
                if !text.trim().is_empty() {
                    model_name = Some(text);
                }
            }
            DATASET_FILE_FIELD => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::InvalidInput(e.body_text()))?;
                if !file_name.is_empty() {
                    dataset = Some(UploadedFile { file_name, data });
                }
            }
            _ => {}
        }
    }

    let (Some(model_name), Some(dataset)) = (model_name, dataset) else {
        return Err(ServerError::MissingInput(MISSING_TRAINING_INPUT.to_string()));
    };
    let format = DatasetFormat::from_file_name(&dataset.file_name)
        .ok_or_else(|| ServerError::UnsupportedFormat(UNSUPPORTED_DATASET_FORMAT.to_string()))?;

    let safe_name = sanitize_model_name(&model_name);
    info!(
        model_name = %safe_name,
        file_name = %dataset.file_name,
        bytes = dataset.data.len(),
        "Training requested"
    );

    let temp_dir = state.config.temp_dir.clone();
    let artifact_name = safe_name.clone();
    let artifact = tokio::task::spawn_blocking(move || {
        train_artifact(format, &dataset.data, &model_name, &artifact_name, &temp_dir)
    })
    .await
    .map_err(|e| ServerError::TrainingFailure(format!("Training task aborted: {}", e)))?
    .map_err(|e| ServerError::TrainingFailure(e.to_string()))?;

    info!(model_name = %safe_name, bytes = artifact.len(), "Model trained");

    let disposition = format!("attachment; filename=\"{}{}\"", safe_name, MODEL_FILE_EXTENSION);
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| ServerError::TrainingFailure(format!("Invalid header: {}", e)))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact,
    )
        .into_response())
}

/// Parse, fit and serialize through a temporary file, returning its bytes.
fn train_artifact(
    format: DatasetFormat,
    data: &[u8],
    model_name: &str,
    file_stem: &str,
    temp_dir: &Path,
) -> crate::Result<Vec<u8>> {
    let df = DataLoader::new().load_bytes(format, data)?;

    let mut engine = TrainEngine::new(TrainingConfig::new(model_name));
    engine.fit(&df)?;
    let model = engine.into_model()?;

    spool_through_temp_file(file_stem, temp_dir, |file| model.write_to(file))
}

/// Write an artifact into a fresh temporary file and read it back.
///
/// The file is removed when it goes out of scope, on success and on every
/// error path, including a failed `write`.
fn spool_through_temp_file<F>(file_stem: &str, temp_dir: &Path, write: F) -> crate::Result<Vec<u8>>
where
    F: FnOnce(&mut NamedTempFile) -> crate::Result<()>,
{
    let mut temp_file = tempfile::Builder::new()
        .prefix(&format!("{}_{}_", file_stem, AppState::generate_id()))
        .suffix(MODEL_FILE_EXTENSION)
        .tempfile_in(temp_dir)?;

    write(&mut temp_file)?;
    temp_file.flush()?;

    Ok(std::fs::read(temp_file.path())?)
}

// ============================================================================
// System
// ============================================================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let uptime = chrono::Utc::now().signed_duration_since(state.started_at);
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "default_model_loaded": state.has_default_model().await,
        "uptime_secs": uptime.num_seconds(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_model_name() {
        assert_eq!(sanitize_model_name("demo"), "demo");
        assert_eq!(sanitize_model_name(" my model.v2 "), "my_model_v2");
        assert_eq!(sanitize_model_name("../../etc/passwd"), "______etc_passwd");
        assert_eq!(sanitize_model_name("   "), "model");
        assert_eq!(sanitize_model_name(&"x".repeat(200)).len(), 64);
    }

    #[test]
    fn test_train_artifact_cleans_up_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = train_artifact(DatasetFormat::Csv, b"only_one_column\n1\n2\n", "bad", "bad", dir.path());
        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_spool_cleans_up_when_write_fails_midway() {
        let dir = tempfile::tempdir().unwrap();
        let result = spool_through_temp_file("partial", dir.path(), |file| {
            file.write_all(b"half an artifact")?;
            assert!(file.path().exists());
            assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
            Err(PredictorError::SerializationError("disk full".to_string()))
        });

        assert!(matches!(result, Err(PredictorError::SerializationError(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_spool_names_file_after_stem() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = spool_through_temp_file("demo", dir.path(), |file| {
            let name = file.path().file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with("demo_"));
            assert!(name.ends_with(MODEL_FILE_EXTENSION));
            file.write_all(b"artifact")?;
            Ok(())
        })
        .unwrap();

        assert_eq!(bytes, b"artifact");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_train_artifact_cleans_up_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let csv = b"RnD,State,Profit\n1.0,a,2.0\n2.0,b,5.0\n3.0,a,6.0\n";
        let bytes = train_artifact(DatasetFormat::Csv, csv, "ok", "ok", dir.path()).unwrap();

        assert!(!bytes.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(ProfitModel::from_bytes(&bytes).unwrap().name, "ok");
    }
}
