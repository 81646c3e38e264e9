//! Linear model implementations

use crate::error::{PredictorError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Smallest pivot accepted by the Cholesky factorization of a unit-diagonal system
const PIVOT_TOLERANCE: f64 = 1e-10;

/// Ridge added to the unit-diagonal system when it is rank deficient
const RIDGE_FALLBACK: f64 = 1e-8;

/// Solve symmetric positive-definite system Ax = b using Cholesky decomposition.
/// Returns `None` if a pivot falls below tolerance.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    // A = L * L^T
    let mut l = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let diag = a[[i, i]] - sum;
                if diag.is_nan() || diag <= PIVOT_TOLERANCE {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // Forward substitution: L * y = b
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L^T * x = y
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Matrix inversion using Gauss-Jordan elimination with partial pivoting (fallback)
fn matrix_inverse(m: &Array2<f64>) -> Option<Array2<f64>> {
    let n = m.nrows();
    if n != m.ncols() {
        return None;
    }

    // Augmented matrix [M | I]
    let mut aug = Array2::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = m[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    for col in 0..n {
        let mut max_row = col;
        for row in col + 1..n {
            if aug[[row, col]].abs() > aug[[max_row, col]].abs() {
                max_row = row;
            }
        }

        if max_row != col {
            for j in 0..2 * n {
                aug.swap([col, j], [max_row, j]);
            }
        }

        if aug[[col, col]].abs() < 1e-10 {
            return None;
        }

        let pivot = aug[[col, col]];
        for j in 0..2 * n {
            aug[[col, j]] /= pivot;
        }

        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                for j in 0..2 * n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    let mut inv = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            inv[[i, j]] = aug[[i, n + j]];
        }
    }

    Some(inv)
}

/// Solve the normal equations (X^T X + alpha*I) w = X^T y.
///
/// The system is rescaled to a unit diagonal first so one tolerance fits
/// features of any magnitude. When the scaled system is rank deficient
/// (collinear dummies, fewer rows than features) a small ridge is added,
/// which picks the near-minimum-norm solution.
fn solve_normal_equations(x: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> Result<Array1<f64>> {
    let n = x.ncols();
    let mut xtx = x.t().dot(x);
    for i in 0..n {
        xtx[[i, i]] += alpha;
    }
    let xty = x.t().dot(y);

    let scale: Array1<f64> = xtx
        .diag()
        .mapv(|d| if d > 0.0 { 1.0 / d.sqrt() } else { 1.0 });
    let scaled = Array2::from_shape_fn((n, n), |(i, j)| xtx[[i, j]] * scale[i] * scale[j]);
    let rhs = &xty * &scale;

    let solution = cholesky_solve(&scaled, &rhs)
        .or_else(|| {
            let mut regularized = scaled.clone();
            for i in 0..n {
                regularized[[i, i]] += RIDGE_FALLBACK;
            }
            cholesky_solve(&regularized, &rhs)
                .or_else(|| matrix_inverse(&regularized).map(|inv| inv.dot(&rhs)))
        })
        .ok_or_else(|| {
            PredictorError::ComputationError(
                "Matrix is singular, cannot solve least squares".to_string(),
            )
        })?;

    Ok(solution * &scale)
}

/// Linear regression model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Fitted coefficients (weights)
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept (bias)
    pub intercept: Option<f64>,
    /// Whether to fit intercept
    pub fit_intercept: bool,
    /// Regularization strength (L2)
    pub alpha: f64,
    /// Whether model is fitted
    pub is_fitted: bool,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    /// Create a new linear regression model
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            fit_intercept: true,
            alpha: 0.0,
            is_fitted: false,
        }
    }

    /// Enable/disable fitting intercept
    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    /// Set regularization strength (Ridge regression)
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Number of input features the fitted model expects
    pub fn n_features(&self) -> Option<usize> {
        self.coefficients.as_ref().map(|c| c.len())
    }

    /// Fit the model to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();

        if n_samples != y.len() {
            return Err(PredictorError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 || x.ncols() == 0 {
            return Err(PredictorError::TrainingError(
                "Cannot fit on an empty feature matrix".to_string(),
            ));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(PredictorError::TrainingError(
                "Training data contains non-finite values".to_string(),
            ));
        }

        let (coefficients, intercept) = if self.fit_intercept {
            let x_mean = x.mean_axis(Axis(0)).ok_or_else(|| {
                PredictorError::TrainingError("Cannot center an empty feature matrix".to_string())
            })?;
            let y_mean = y.mean().unwrap_or(0.0);

            let x_centered = x - &x_mean.view().insert_axis(Axis(0));
            let y_centered = y - y_mean;

            let coefficients = solve_normal_equations(&x_centered, &y_centered, self.alpha)?;
            let intercept = y_mean - coefficients.dot(&x_mean);
            (coefficients, intercept)
        } else {
            (solve_normal_equations(x, y, self.alpha)?, 0.0)
        };

        self.coefficients = Some(coefficients);
        self.intercept = Some(intercept);
        self.is_fitted = true;

        Ok(self)
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.fitted_coefficients()?;
        if x.ncols() != coefficients.len() {
            return Err(PredictorError::ShapeError {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x.dot(coefficients) + self.intercept.unwrap_or(0.0))
    }

    /// Predict a single sample
    pub fn predict_one(&self, features: &[f64]) -> Result<f64> {
        let coefficients = self.fitted_coefficients()?;
        if features.len() != coefficients.len() {
            return Err(PredictorError::ShapeError {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", features.len()),
            });
        }

        Ok(ArrayView1::from(features).dot(coefficients) + self.intercept.unwrap_or(0.0))
    }

    /// Get R² score
    pub fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let y_pred = self.predict(x)?;

        let y_mean = y.mean().unwrap_or(0.0);
        let ss_res = (&y_pred - y).mapv(|v| v * v).sum();
        let ss_tot = y.mapv(|v| (v - y_mean) * (v - y_mean)).sum();

        if ss_tot == 0.0 {
            return Ok(1.0);
        }

        Ok(1.0 - ss_res / ss_tot)
    }

    fn fitted_coefficients(&self) -> Result<&Array1<f64>> {
        if !self.is_fitted {
            return Err(PredictorError::ModelNotFitted);
        }
        self.coefficients.as_ref().ok_or(PredictorError::ModelNotFitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_linear_regression_simple() {
        let x = array![
            [1.0, 1.0],
            [2.0, 1.0],
            [1.0, 2.0],
            [2.0, 2.0],
            [3.0, 1.0],
        ];
        // y = 2*x1 + 3*x2 + 1
        let y = array![6.0, 8.0, 9.0, 11.0, 10.0];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        assert!(model.is_fitted);
        let coef = model.coefficients.as_ref().unwrap();
        assert!((coef[0] - 2.0).abs() < 1e-6);
        assert!((coef[1] - 3.0).abs() < 1e-6);
        assert!((model.intercept.unwrap() - 1.0).abs() < 1e-6);

        let r2 = model.score(&x, &y).unwrap();
        assert!(r2 > 0.99, "R² should be close to 1, got {}", r2);
    }

    #[test]
    fn test_ridge_regression() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        let y = array![2.0, 4.0, 6.0];

        let mut model = LinearRegression::new().with_alpha(0.1);
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        assert_eq!(predictions.len(), 3);
    }

    #[test]
    fn test_collinear_dummies_still_fit() {
        // Full one-hot block plus intercept: X^T X is singular
        let x = array![
            [1.0, 0.0, 0.0, 10.0],
            [0.0, 1.0, 0.0, 20.0],
            [0.0, 0.0, 1.0, 30.0],
            [1.0, 0.0, 0.0, 40.0],
            [0.0, 1.0, 0.0, 50.0],
            [0.0, 0.0, 1.0, 60.0],
        ];
        let y = array![15.0, 27.0, 39.0, 45.0, 57.0, 69.0];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        for (p, t) in predictions.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-3, "prediction {} too far from {}", p, t);
        }
    }

    #[test]
    fn test_fewer_rows_than_features() {
        let x = array![[1.0, 0.0, 165349.2, 136897.8, 471784.1], [0.0, 1.0, 162597.7, 151377.59, 443898.53]];
        let y = array![192261.83, 191792.06];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let p = model.predict_one(&[0.0, 1.0, 1000.0, 500.0, 200.0]).unwrap();
        assert!(p.is_finite());
    }

    #[test]
    fn test_predict_one_matches_predict() {
        let x = array![[1.0, 2.0], [2.0, 1.0], [3.0, 5.0], [4.0, 3.0]];
        let y = array![5.0, 4.0, 13.0, 10.0];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let batch = model.predict(&x).unwrap();
        let single = model.predict_one(&[3.0, 5.0]).unwrap();
        assert!((batch[2] - single).abs() < 1e-9);
        // Repeated inference is bit-identical
        assert_eq!(single, model.predict_one(&[3.0, 5.0]).unwrap());
    }

    #[test]
    fn test_predict_wrong_width() {
        let mut model = LinearRegression::new();
        model.fit(&array![[1.0], [2.0], [3.0]], &array![1.0, 2.0, 3.0]).unwrap();

        let err = model.predict_one(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, PredictorError::ShapeError { .. }));
    }

    #[test]
    fn test_unfitted_predict_fails() {
        let model = LinearRegression::new();
        assert!(matches!(model.predict_one(&[1.0]), Err(PredictorError::ModelNotFitted)));
    }

    #[test]
    fn test_fit_rejects_mismatched_target() {
        let mut model = LinearRegression::new();
        let result = model.fit(&array![[1.0], [2.0]], &array![1.0]);
        assert!(matches!(result, Err(PredictorError::ShapeError { .. })));
    }

    #[test]
    fn test_fit_rejects_nan() {
        let mut model = LinearRegression::new();
        let result = model.fit(&array![[1.0], [f64::NAN]], &array![1.0, 2.0]);
        assert!(result.is_err());
    }
}
