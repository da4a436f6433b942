//! Correlation matrix validation and Cholesky factorisation
//!
//! Correlated shocks are generated as W = L * Z where L is the lower-triangular
//! Cholesky factor of the correlation matrix C = L * L^T and Z holds independent
//! standard normals.

use crate::error::PortfolioError;

const SYMMETRY_TOLERANCE: f64 = 1e-9;
const DIAGONAL_TOLERANCE: f64 = 1e-9;

/// Lower-triangular Cholesky factor of a validated correlation matrix
#[derive(Debug, Clone, PartialEq)]
pub struct CholeskyFactor {
    lower: Vec<Vec<f64>>,
}

impl CholeskyFactor {
    /// Validate `matrix` as a correlation matrix and factorise it
    pub fn from_correlation(matrix: &[Vec<f64>]) -> Result<Self, PortfolioError> {
        validate_correlation(matrix)?;
        Ok(Self { lower: cholesky_lower(matrix)? })
    }

    pub fn lower(&self) -> &[Vec<f64>] {
        &self.lower
    }

    /// Left-multiply a `[assets, steps]` matrix of independent draws by L.
    ///
    /// Row `i` of the result is `sum_{k <= i} L[i][k] * independent[k]`.
    pub fn correlate(&self, independent: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let n_steps = independent.first().map_or(0, Vec::len);

        self.lower
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let mut out = vec![0.0; n_steps];
                for (k, &l_ik) in row.iter().enumerate().take(i + 1) {
                    if l_ik == 0.0 {
                        continue;
                    }
                    for (o, z) in out.iter_mut().zip(&independent[k]) {
                        *o += l_ik * z;
                    }
                }
                out
            })
            .collect()
    }
}

fn validate_correlation(matrix: &[Vec<f64>]) -> Result<(), PortfolioError> {
    let n = matrix.len();
    for row in matrix {
        if row.len() != n {
            return Err(PortfolioError::CorrelationShape { expected: n, rows: n, cols: row.len() });
        }
    }

    for (i, row) in matrix.iter().enumerate() {
        if let Some(j) = row.iter().position(|v| !v.is_finite()) {
            return Err(PortfolioError::CorrelationNotFinite { i, j });
        }
    }

    for i in 0..n {
        let diag = matrix[i][i];
        if (diag - 1.0).abs() > DIAGONAL_TOLERANCE {
            return Err(PortfolioError::CorrelationDiagonal { index: i, value: diag });
        }
        for j in (i + 1)..n {
            if (matrix[i][j] - matrix[j][i]).abs() > SYMMETRY_TOLERANCE {
                return Err(PortfolioError::CorrelationNotSymmetric { i, j });
            }
        }
    }

    Ok(())
}

/// Cholesky-Banachiewicz factorisation; fails unless the matrix is positive definite
fn cholesky_lower(matrix: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, PortfolioError> {
    let n = matrix.len();
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[i][k] * l[j][k]).sum();

            if i == j {
                let pivot = matrix[i][i] - sum;
                if !(pivot > 0.0) {
                    return Err(PortfolioError::NotPositiveDefinite);
                }
                l[i][j] = pivot.sqrt();
            } else {
                l[i][j] = (matrix[i][j] - sum) / l[j][j];
            }
        }
    }

    Ok(l)
}
