//! Categorical encoding implementations

use crate::error::{PredictorError, Result};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

/// Width of the fixed region encoding used by the prediction endpoint
pub const REGION_WIDTH: usize = 3;

/// Regions recognized by the prediction endpoint, in encoding order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    California,
    Florida,
    NewYork,
}

impl Region {
    pub const ALL: [Region; REGION_WIDTH] = [Region::California, Region::Florida, Region::NewYork];

    /// Exact, case-sensitive match on the wire value
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "california" => Some(Region::California),
            "florida" => Some(Region::Florida),
            "new-york" => Some(Region::NewYork),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::California => "california",
            Region::Florida => "florida",
            Region::NewYork => "new-york",
        }
    }

    /// Position of this region's indicator in the one-hot vector
    pub fn index(&self) -> usize {
        match self {
            Region::California => 0,
            Region::Florida => 1,
            Region::NewYork => 2,
        }
    }

    pub fn one_hot(&self) -> [f64; REGION_WIDTH] {
        let mut encoded = [0.0; REGION_WIDTH];
        encoded[self.index()] = 1.0;
        encoded
    }
}

/// What to do with a region value outside the recognized set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CategoryPolicy {
    /// Encode as all zeros
    #[default]
    ZeroFill,
    /// Refuse the value
    Reject,
}

impl CategoryPolicy {
    pub fn from_strict_flag(strict: bool) -> Self {
        if strict {
            CategoryPolicy::Reject
        } else {
            CategoryPolicy::ZeroFill
        }
    }
}

/// Encode a raw region value into its 3-wide indicator vector
pub fn encode_region(value: &str, policy: CategoryPolicy) -> Result<[f64; REGION_WIDTH]> {
    match Region::parse(value) {
        Some(region) => Ok(region.one_hot()),
        None => match policy {
            CategoryPolicy::ZeroFill => {
                warn!(state = %value, "Unrecognized state, encoding as all zeros");
                Ok([0.0; REGION_WIDTH])
            }
            CategoryPolicy::Reject => Err(PredictorError::InvalidInput(format!(
                "Unrecognized State: {}",
                value
            ))),
        },
    }
}

/// One-hot encoder fitted on a single categorical column.
///
/// Categories are the distinct non-null values sorted lexicographically, so
/// the output column order is independent of row order. Values unseen during
/// fitting, and nulls, encode as an all-zero row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    column: String,
    categories: Vec<String>,
    is_fitted: bool,
}

impl Default for OneHotEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self {
            column: String::new(),
            categories: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fit the encoder to a column
    pub fn fit(&mut self, column: &Column) -> Result<&mut Self> {
        let values = Self::as_strings(column)?;

        let categories: BTreeSet<String> = values
            .into_iter()
            .flatten()
            .map(|v| v.to_string())
            .collect();

        if categories.is_empty() {
            return Err(PredictorError::PreprocessingError(format!(
                "Column '{}' has no non-null values to encode",
                column.name()
            )));
        }

        self.column = column.name().to_string();
        self.categories = categories.into_iter().collect();
        self.is_fitted = true;
        Ok(self)
    }

    /// Transform a column into an (n_rows, n_categories) indicator matrix
    pub fn transform(&self, column: &Column) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PredictorError::ModelNotFitted);
        }

        let values = Self::as_strings(column)?;
        let mut encoded = Array2::zeros((values.len(), self.categories.len()));

        for (row, value) in values.into_iter().enumerate() {
            if let Some(v) = value {
                if let Ok(idx) = self.categories.binary_search_by(|c| c.as_str().cmp(v)) {
                    encoded[[row, idx]] = 1.0;
                }
            }
        }

        Ok(encoded)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, column: &Column) -> Result<Array2<f64>> {
        self.fit(column)?;
        self.transform(column)
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Output column names, `<column>_<category>`
    pub fn feature_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("{}_{}", self.column, c))
            .collect()
    }

    fn as_strings(column: &Column) -> Result<Vec<Option<&str>>> {
        let series = column.as_materialized_series();
        if series.dtype() != &DataType::String {
            return Err(PredictorError::PreprocessingError(format!(
                "Column '{}' must be cast to string before encoding",
                column.name()
            )));
        }
        let ca = series
            .str()
            .map_err(|e| PredictorError::PreprocessingError(e.to_string()))?;
        Ok(ca.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_column(values: &[Option<&str>]) -> Column {
        Column::new("State".into(), values)
    }

    #[test]
    fn test_recognized_regions_are_one_hot() {
        let policy = CategoryPolicy::ZeroFill;
        assert_eq!(encode_region("california", policy).unwrap(), [1.0, 0.0, 0.0]);
        assert_eq!(encode_region("florida", policy).unwrap(), [0.0, 1.0, 0.0]);
        assert_eq!(encode_region("new-york", policy).unwrap(), [0.0, 0.0, 1.0]);

        for region in Region::ALL {
            let encoded = encode_region(region.as_str(), policy).unwrap();
            assert_eq!(encoded.iter().filter(|v| **v == 1.0).count(), 1);
        }
    }

    #[test]
    fn test_unknown_region_zero_fills() {
        // Known quirk: anything outside the three values silently becomes [0, 0, 0]
        for value in ["texas", "California", "", "new york"] {
            assert_eq!(encode_region(value, CategoryPolicy::ZeroFill).unwrap(), [0.0; 3]);
        }
    }

    #[test]
    fn test_unknown_region_rejected_when_strict() {
        let err = encode_region("texas", CategoryPolicy::Reject).unwrap_err();
        assert!(matches!(err, PredictorError::InvalidInput(_)));
        assert!(encode_region("florida", CategoryPolicy::Reject).is_ok());
    }

    #[test]
    fn test_onehot_sorted_categories() {
        let col = state_column(&[Some("New York"), Some("California"), Some("Florida"), Some("California")]);
        let mut encoder = OneHotEncoder::new();
        let encoded = encoder.fit_transform(&col).unwrap();

        assert_eq!(encoder.categories(), &["California", "Florida", "New York"]);
        assert_eq!(
            encoder.feature_names(),
            vec!["State_California", "State_Florida", "State_New York"]
        );
        assert_eq!(encoded.shape(), &[4, 3]);
        assert_eq!(encoded.row(0).to_vec(), vec![0.0, 0.0, 1.0]);
        assert_eq!(encoded.row(1).to_vec(), vec![1.0, 0.0, 0.0]);
        assert_eq!(encoded.row(2).to_vec(), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_onehot_null_and_unseen_are_zero_rows() {
        let mut encoder = OneHotEncoder::new();
        encoder.fit(&state_column(&[Some("a"), Some("b")])).unwrap();

        let encoded = encoder
            .transform(&state_column(&[None, Some("c"), Some("b")]))
            .unwrap();
        assert_eq!(encoded.row(0).sum(), 0.0);
        assert_eq!(encoded.row(1).sum(), 0.0);
        assert_eq!(encoded.row(2).to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let encoder = OneHotEncoder::new();
        let result = encoder.transform(&state_column(&[Some("a")]));
        assert!(matches!(result, Err(PredictorError::ModelNotFitted)));
    }

    #[test]
    fn test_fit_rejects_all_null_column() {
        let mut encoder = OneHotEncoder::new();
        assert!(encoder.fit(&state_column(&[None, None])).is_err());
    }
}
