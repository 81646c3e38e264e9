//! Inference module
//!
//! Provides the serialized model artifact and the assembly of the fixed
//! six-wide feature vector used for single predictions.

mod features;
mod model;

pub use features::{
    PredictionInput, ADMINISTRATION_FIELD, FEATURE_VECTOR_WIDTH, MARKETING_SPEND_FIELD,
    RND_SPEND_FIELD, STATE_FIELD,
};
pub use model::{has_model_extension, ProfitModel, MODEL_FILE_EXTENSION};
