//! Ordinary least squares for small dense regressions.
//!
//! Used for the Dickey-Fuller regression and for initial estimates of the
//! intercept and exogenous coefficient of a regression-with-ARIMA-errors
//! model. Design matrices here are tall and narrow (a handful of columns), so
//! the solve goes through an SVD, which tolerates near-collinear columns.

use crate::error::{ForecastError, Result};
use nalgebra::{DMatrix, DVector};

/// OLS coefficients with their standard errors.
#[derive(Debug, Clone)]
pub struct OLSResult {
    /// One coefficient per design column.
    pub coefficients: Vec<f64>,
    /// Standard error per coefficient (NaN when not identifiable).
    pub std_errors: Vec<f64>,
    /// Residual sum of squares.
    pub rss: f64,
    /// Residual degrees of freedom.
    pub df: usize,
}

impl OLSResult {
    /// t statistic of coefficient `i`.
    pub fn t_stat(&self, i: usize) -> f64 {
        self.coefficients[i] / self.std_errors[i]
    }
}

/// Fit `y = X b` where `rows[t]` is row `t` of `X`.
pub fn ols_fit(rows: &[Vec<f64>], y: &[f64]) -> Result<OLSResult> {
    let n = y.len();
    if rows.len() != n {
        return Err(ForecastError::DimensionMismatch {
            expected: n,
            got: rows.len(),
        });
    }
    let k = rows.first().map(|r| r.len()).unwrap_or(0);
    if k == 0 || n <= k {
        return Err(ForecastError::InsufficientData {
            needed: k + 1,
            got: n,
        });
    }
    if let Some(bad) = rows.iter().find(|r| r.len() != k) {
        return Err(ForecastError::DimensionMismatch {
            expected: k,
            got: bad.len(),
        });
    }

    let x = DMatrix::from_fn(n, k, |i, j| rows[i][j]);
    let yv = DVector::from_column_slice(y);

    let beta = solve_least_squares(&x, &yv).ok_or_else(|| {
        ForecastError::InvalidParameter("least squares system is singular".to_string())
    })?;

    let residuals = &yv - &x * &beta;
    let rss = residuals.dot(&residuals);
    let df = n - k;
    let sigma2 = rss / df as f64;

    let std_errors = match (x.transpose() * &x).try_inverse() {
        Some(xtx_inv) => (0..k)
            .map(|j| (sigma2 * xtx_inv[(j, j)]).max(0.0).sqrt())
            .collect(),
        None => vec![f64::NAN; k],
    };

    Ok(OLSResult {
        coefficients: beta.iter().copied().collect(),
        std_errors,
        rss,
        df,
    })
}

/// SVD least squares; `None` if no finite solution is found.
fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }
    None
}
