//! Model training module
//!
//! Fits ordinary least squares linear regression on tabular data whose last
//! feature column is categorical and one-hot encoded before fitting.

mod engine;
pub mod linear_models;

pub use engine::{ModelMetrics, TrainEngine, TrainingConfig};
pub use linear_models::LinearRegression;
