//! Penalized least squares used to fit additive component models.
//!
//! The design matrix is stored column-wise. Every column carries its own ridge
//! penalty, so trend slopes can stay unpenalized while changepoint deltas and
//! Fourier terms are shrunk toward zero.

use crate::error::{ForecastError, Result};

/// Coefficients of a fitted linear model.
#[derive(Debug, Clone, PartialEq)]
pub struct OLSResult {
    /// One coefficient per design column.
    pub coefficients: Vec<f64>,
}

impl OLSResult {
    /// Predict values for a column-wise design matrix.
    pub fn predict(&self, columns: &[Vec<f64>]) -> Result<Vec<f64>> {
        if columns.len() != self.coefficients.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.coefficients.len(),
                got: columns.len(),
            });
        }
        let n = columns.first().map(|c| c.len()).unwrap_or(0);
        let mut predictions = vec![0.0; n];
        for (coef, column) in self.coefficients.iter().zip(columns) {
            if column.len() != n {
                return Err(ForecastError::DimensionMismatch {
                    expected: n,
                    got: column.len(),
                });
            }
            for (pred, x) in predictions.iter_mut().zip(column) {
                *pred += coef * x;
            }
        }
        Ok(predictions)
    }
}

/// Fit `y = X @ beta` minimizing `|y - X beta|^2 + sum(penalty_j * beta_j^2)`.
///
/// # Arguments
/// * `y` - Target values (length n)
/// * `columns` - Design columns (each length n)
/// * `penalties` - Ridge penalty per column
pub fn ridge_fit(y: &[f64], columns: &[Vec<f64>], penalties: &[f64]) -> Result<OLSResult> {
    let n = y.len();
    let k = columns.len();

    if n == 0 {
        return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
    }
    if k == 0 {
        return Err(ForecastError::InvalidParameter(
            "design matrix has no columns".into(),
        ));
    }
    if penalties.len() != k {
        return Err(ForecastError::DimensionMismatch {
            expected: k,
            got: penalties.len(),
        });
    }
    for column in columns {
        if column.len() != n {
            return Err(ForecastError::DimensionMismatch {
                expected: n,
                got: column.len(),
            });
        }
    }

    let mut xtx = vec![vec![0.0; k]; k];
    for i in 0..k {
        for j in 0..=i {
            let dot: f64 = columns[i]
                .iter()
                .zip(columns[j].iter())
                .map(|(a, b)| a * b)
                .sum();
            xtx[i][j] = dot;
            xtx[j][i] = dot;
        }
    }

    let xty: Vec<f64> = columns
        .iter()
        .map(|col| col.iter().zip(y.iter()).map(|(a, b)| a * b).sum())
        .collect();

    // Small floor keeps unpenalized collinear columns solvable.
    for i in 0..k {
        xtx[i][i] += penalties[i].max(0.0) + 1e-8;
    }

    let coefficients = solve_symmetric(&xtx, &xty).ok_or_else(|| {
        ForecastError::ComputationError(
            "least squares failed: matrix not positive definite".into(),
        )
    })?;

    Ok(OLSResult { coefficients })
}

/// Solve symmetric positive definite system using Cholesky decomposition.
///
/// Solves A @ x = b where A is symmetric positive definite.
fn solve_symmetric(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    // Cholesky decomposition A = L @ L'
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }

            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // Forward substitution: L @ y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    // Backward substitution: L' @ x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    Some(x)
}
