//! Training engine implementation

use crate::error::{PredictorError, Result};
use crate::inference::ProfitModel;
use crate::preprocessing::OneHotEncoder;
use super::linear_models::LinearRegression;
use ndarray::{concatenate, Array1, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Name stored in the model artifact
    pub model_name: String,
    pub fit_intercept: bool,
    /// L2 regularization, 0.0 for ordinary least squares
    pub alpha: f64,
}

impl TrainingConfig {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            fit_intercept: true,
            alpha: 0.0,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }
}

/// Metrics computed on the training data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub mse: f64,
    pub mae: f64,
    pub r2: f64,
    pub training_time_secs: f64,
    pub n_features: usize,
    pub n_samples: usize,
}

impl ModelMetrics {
    fn compute_regression(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let n = y_true.len().max(1) as f64;
        let residuals = y_pred - y_true;
        let mse = residuals.mapv(|v| v * v).sum() / n;
        let mae = residuals.mapv(f64::abs).sum() / n;

        let y_mean = y_true.mean().unwrap_or(0.0);
        let ss_tot = y_true.mapv(|v| (v - y_mean) * (v - y_mean)).sum();
        let r2 = if ss_tot == 0.0 { 1.0 } else { 1.0 - mse * n / ss_tot };

        Self {
            mse,
            mae,
            r2,
            ..Default::default()
        }
    }
}

/// Fits a linear regression on a table whose last column is the target and
/// whose last feature column is categorical.
///
/// The design matrix is `[one-hot(last feature) | remaining features]`.
pub struct TrainEngine {
    config: TrainingConfig,
    encoder: OneHotEncoder,
    categorical_column: String,
    feature_names: Vec<String>,
    model: Option<LinearRegression>,
    metrics: Option<ModelMetrics>,
}

impl TrainEngine {
    /// Create a new training engine
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            encoder: OneHotEncoder::new(),
            categorical_column: String::new(),
            feature_names: Vec::new(),
            model: None,
            metrics: None,
        }
    }

    /// Fit the model to the data
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let start = Instant::now();

        let (x, y) = self.prepare_data(df)?;

        let mut model = LinearRegression::new()
            .with_fit_intercept(self.config.fit_intercept)
            .with_alpha(self.config.alpha);
        model.fit(&x, &y)?;

        let y_pred = model.predict(&x)?;
        let mut metrics = ModelMetrics::compute_regression(&y, &y_pred);
        metrics.training_time_secs = start.elapsed().as_secs_f64();
        metrics.n_features = x.ncols();
        metrics.n_samples = x.nrows();

        debug!(
            model_name = %self.config.model_name,
            n_samples = metrics.n_samples,
            n_features = metrics.n_features,
            r2 = metrics.r2,
            "Linear regression fitted"
        );

        self.metrics = Some(metrics);
        self.model = Some(model);
        Ok(self)
    }

    /// Get training metrics
    pub fn metrics(&self) -> Option<&ModelMetrics> {
        self.metrics.as_ref()
    }

    /// Names of the design matrix columns, in order
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Package the fitted regression into a serializable artifact
    pub fn into_model(self) -> Result<ProfitModel> {
        let regression = self.model.ok_or(PredictorError::ModelNotFitted)?;
        Ok(ProfitModel::new(
            self.config.model_name,
            self.feature_names,
            self.categorical_column,
            self.encoder.categories().to_vec(),
            regression,
        ))
    }

    fn prepare_data(&mut self, df: &DataFrame) -> Result<(Array2<f64>, Array1<f64>)> {
        if df.width() < 2 {
            return Err(PredictorError::DataError(format!(
                "Dataset needs at least one feature column and a target column, got {} column(s)",
                df.width()
            )));
        }
        if df.height() == 0 {
            return Err(PredictorError::DataError("Dataset has no rows".to_string()));
        }

        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let (target_column, feature_columns) = names
            .split_last()
            .ok_or_else(|| PredictorError::DataError("Dataset has no columns".to_string()))?;
        let (categorical_column, passthrough_columns) = feature_columns
            .split_last()
            .ok_or_else(|| PredictorError::DataError("Dataset has no feature columns".to_string()))?;

        let categorical = df
            .column(categorical_column)
            .map_err(|_| PredictorError::FeatureNotFound(categorical_column.clone()))?
            .cast(&DataType::String)?;
        let encoded = self.encoder.fit_transform(&categorical)?;
        let numeric = Self::columns_to_array2(df, passthrough_columns)?;

        let x = concatenate(Axis(1), &[encoded.view(), numeric.view()])?;
        let y = Self::column_to_array1(df, target_column)?;

        self.categorical_column = categorical_column.clone();
        self.feature_names = self
            .encoder
            .feature_names()
            .into_iter()
            .chain(passthrough_columns.iter().cloned())
            .collect();

        Ok((x, y))
    }

    fn column_to_array1(df: &DataFrame, col_name: &str) -> Result<Array1<f64>> {
        let column = df
            .column(col_name)
            .map_err(|_| PredictorError::FeatureNotFound(col_name.to_string()))?;
        let column_f64 = column.cast(&DataType::Float64)?;

        // Non-numeric strings become nulls on cast
        if column_f64.null_count() > 0 {
            return Err(PredictorError::DataError(format!(
                "Column '{}' contains missing or non-numeric values",
                col_name
            )));
        }

        Ok(column_f64.f64()?.into_no_null_iter().collect())
    }

    /// Extract named columns into a row-major Array2<f64>.
    fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
        let col_data: Vec<Array1<f64>> = col_names
            .iter()
            .map(|name| Self::column_to_array1(df, name))
            .collect::<Result<_>>()?;

        Ok(Array2::from_shape_fn((df.height(), col_data.len()), |(r, c)| col_data[c][r]))
    }
}
