//! Profit Predictor - linear regression training and prediction service
//!
//! # Modules
//!
//! - [`preprocessing`] - Region one-hot encoding and fitted categorical encoding
//! - [`training`] - Linear regression and the training pipeline
//! - [`inference`] - Model artifact and feature vector assembly
//! - [`utils`] - CSV/JSON dataset loading
//! - [`server`] - HTTP API
//! - [`cli`] - Command-line interface

pub mod error;

pub mod preprocessing;
pub mod training;
pub mod inference;
pub mod utils;

pub mod server;
pub mod cli;

pub use error::{PredictorError, Result};
