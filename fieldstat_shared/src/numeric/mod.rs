//! Dense matrix primitives used by the analysis engine.
//!
//! Everything here operates on `f64` [`Array2`] matrices. The functions are
//! deliberately small: Kronecker products assemble contrast matrices, `rank`
//! supplies effect degrees of freedom, and `covariance` feeds the sphericity
//! estimators.

use std::fmt;

use ndarray::{Array1, Array2};

pub mod dist;

/// Result type alias for numeric operations
pub type NumericResult<T> = Result<T, NumericError>;

/// Error type for numeric primitives and distribution functions
#[derive(Debug, Clone, PartialEq)]
pub enum NumericError {
    /// A matrix required to be positive semidefinite is not, within tolerance
    Singular { context: String },

    /// A computation produced a non-finite value
    NonFinite { what: String },

    /// A parameter is outside its admissible domain
    InvalidArgument { parameter: String, value: f64 },
}

impl fmt::Display for NumericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericError::Singular { context } => {
                write!(f, "Singular matrix in {}", context)
            }
            NumericError::NonFinite { what } => {
                write!(f, "Non-finite value computing {}", what)
            }
            NumericError::InvalidArgument { parameter, value } => {
                write!(f, "Invalid argument {} = {}", parameter, value)
            }
        }
    }
}

impl std::error::Error for NumericError {}

impl NumericError {
    pub fn singular(context: impl Into<String>) -> Self {
        NumericError::Singular {
            context: context.into(),
        }
    }

    pub fn non_finite(what: impl Into<String>) -> Self {
        NumericError::NonFinite { what: what.into() }
    }

    pub fn invalid_argument(parameter: impl Into<String>, value: f64) -> Self {
        NumericError::InvalidArgument {
            parameter: parameter.into(),
            value,
        }
    }
}

/// Kronecker product of two dense matrices.
pub fn kron(a: &Array2<f64>, b: &Array2<f64>) -> Array2<f64> {
    ndarray::linalg::kron(a, b)
}

/// Numerical rank by Gaussian elimination with partial pivoting.
///
/// The tolerance is relative to the largest absolute entry, so contrast
/// matrices built from centered identities report their true rank even
/// though they carry an exact linear dependency.
pub fn rank(m: &Array2<f64>, tol: f64) -> usize {
    let (rows, cols) = m.dim();
    if rows == 0 || cols == 0 {
        return 0;
    }

    let mut a = m.clone();
    let scale = a.iter().fold(0.0f64, |acc, &v| acc.max(v.abs()));
    if scale == 0.0 {
        return 0;
    }
    let threshold = tol * scale;

    let mut rank = 0;
    let mut pivot_row = 0;
    for col in 0..cols {
        // find the largest remaining entry in this column
        let mut best = pivot_row;
        for r in pivot_row..rows {
            if a[[r, col]].abs() > a[[best, col]].abs() {
                best = r;
            }
        }
        if a[[best, col]].abs() <= threshold {
            continue;
        }
        if best != pivot_row {
            for c in 0..cols {
                a.swap([best, c], [pivot_row, c]);
            }
        }
        for r in (pivot_row + 1)..rows {
            let factor = a[[r, col]] / a[[pivot_row, col]];
            for c in col..cols {
                a[[r, c]] -= factor * a[[pivot_row, c]];
            }
        }
        rank += 1;
        pivot_row += 1;
        if pivot_row == rows {
            break;
        }
    }
    rank
}

/// Sample covariance of the columns of `y` across its rows.
///
/// Rows are observations (subjects), columns are variables, so the result
/// is `cols x cols` with divisor `rows - 1`.
pub fn covariance(y: &Array2<f64>) -> NumericResult<Array2<f64>> {
    let (rows, cols) = y.dim();
    if rows < 2 {
        return Err(NumericError::invalid_argument("rows", rows as f64));
    }

    let means: Array1<f64> = y.mean_axis(ndarray::Axis(0)).expect("rows >= 2");
    let mut v = Array2::<f64>::zeros((cols, cols));
    for i in 0..cols {
        for j in i..cols {
            let mut acc = 0.0;
            for r in 0..rows {
                acc += (y[[r, i]] - means[i]) * (y[[r, j]] - means[j]);
            }
            let c = acc / (rows as f64 - 1.0);
            v[[i, j]] = c;
            v[[j, i]] = c;
        }
    }

    if v.iter().any(|x| !x.is_finite()) {
        return Err(NumericError::non_finite("covariance"));
    }
    Ok(v)
}

/// Trace of a square matrix.
pub fn trace(m: &Array2<f64>) -> f64 {
    m.diag().sum()
}

/// Arithmetic mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population-style variance (divisor `n`) about the sample mean.
pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// Sum of squared deviations about a given center.
pub fn sum_sq_dev(values: &[f64], center: f64) -> f64 {
    values.iter().map(|v| (v - center) * (v - center)).sum()
}
