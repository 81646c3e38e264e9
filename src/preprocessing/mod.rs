//! Data preprocessing module
//!
//! Provides the categorical encodings used by the service:
//! - Fixed region one-hot encoding for single predictions
//! - Fitted one-hot encoding of the last feature column for training

mod encoder;

pub use encoder::{encode_region, CategoryPolicy, OneHotEncoder, Region, REGION_WIDTH};
