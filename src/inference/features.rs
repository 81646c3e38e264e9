//! Feature vector assembly for single predictions

use crate::error::{PredictorError, Result};
use crate::preprocessing::{encode_region, CategoryPolicy, REGION_WIDTH};
use std::collections::HashMap;

pub const RND_SPEND_FIELD: &str = "RnD_Spend";
pub const ADMINISTRATION_FIELD: &str = "Administration";
pub const MARKETING_SPEND_FIELD: &str = "Marketing_Spend";
pub const STATE_FIELD: &str = "State";

/// Width of the assembled feature vector: region indicators then three spends
pub const FEATURE_VECTOR_WIDTH: usize = REGION_WIDTH + 3;

/// Typed prediction request
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionInput {
    pub rnd_spend: f64,
    pub administration: f64,
    pub marketing_spend: f64,
    pub state: String,
}

impl PredictionInput {
    /// Coerce raw string fields into a typed input
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self> {
        Ok(Self {
            rnd_spend: parse_number(fields, RND_SPEND_FIELD)?,
            administration: parse_number(fields, ADMINISTRATION_FIELD)?,
            marketing_spend: parse_number(fields, MARKETING_SPEND_FIELD)?,
            state: required(fields, STATE_FIELD)?.to_string(),
        })
    }

    /// `[california, florida, new-york, RnD_Spend, Administration, Marketing_Spend]`
    pub fn feature_vector(&self, policy: CategoryPolicy) -> Result<[f64; FEATURE_VECTOR_WIDTH]> {
        let region = encode_region(&self.state, policy)?;

        let mut features = [0.0; FEATURE_VECTOR_WIDTH];
        features[..REGION_WIDTH].copy_from_slice(&region);
        features[REGION_WIDTH] = self.rnd_spend;
        features[REGION_WIDTH + 1] = self.administration;
        features[REGION_WIDTH + 2] = self.marketing_spend;
        Ok(features)
    }
}

fn required<'a>(fields: &'a HashMap<String, String>, name: &str) -> Result<&'a str> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| PredictorError::InvalidInput(format!("Missing field: {}", name)))
}

fn parse_number(fields: &HashMap<String, String>, name: &str) -> Result<f64> {
    let raw = required(fields, name)?;
    let value: f64 = raw.trim().parse().map_err(|_| {
        PredictorError::InvalidInput(format!("Field {} must be a number, got '{}'", name, raw))
    })?;
    if !value.is_finite() {
        return Err(PredictorError::InvalidInput(format!(
            "Field {} must be a finite number",
            name
        )));
    }
    Ok(value)
}
