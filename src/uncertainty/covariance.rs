//! # Covariance Matrix Calculations

use log::warn;
use nalgebra::DMatrix;
use ndarray::Array2;

use crate::utils::matrix_convert::{nalgebra_to_ndarray, ndarray_to_nalgebra};

/// Inverse of a symmetric matrix: Cholesky when positive definite, LU
/// otherwise. `None` if singular or the result is not finite.
pub fn invert_symmetric(mat: &DMatrix<f64>) -> Option<Array2<f64>> {
    if mat.nrows() != mat.ncols() {
        return None;
    }
    if mat.nrows() == 0 {
        return Some(Array2::zeros((0, 0)));
    }

    let inverse = match mat.clone().cholesky() {
        Some(chol) => chol.inverse(),
        None => mat.clone().try_inverse()?,
    };

    if inverse.iter().all(|v| v.is_finite()) {
        Some(nalgebra_to_ndarray(&inverse))
    } else {
        None
    }
}

/// Inverse of a square ndarray matrix.
pub fn invert(mat: &Array2<f64>) -> Option<Array2<f64>> {
    invert_symmetric(&ndarray_to_nalgebra(mat))
}

/// `inv(JᵀJ)`, or `None` when it is singular.
pub fn normal_matrix_inverse(jacobian: &Array2<f64>) -> Option<Array2<f64>> {
    let j = ndarray_to_nalgebra(jacobian);
    let jtj = j.transpose() * &j;
    invert_symmetric(&jtj)
}

/// Least-squares covariance `cov_x * ss_res / (n - p)`, `cov_x = inv(JᵀJ)`.
///
/// `n` is the number of residuals and `p` the number of free parameters.
/// Returns `None` when `n <= p` or `cov_x` is missing.
pub fn least_squares_covariance(
    cov_x: Option<&Array2<f64>>,
    n: usize,
    ss_res: f64,
) -> Option<Array2<f64>> {
    let Some(cov_x) = cov_x else {
        warn!("JᵀJ is singular; no covariance estimate");
        return None;
    };
    let p = cov_x.nrows();
    if n <= p {
        warn!(
            "Covariance is undefined with {} data points and {} free parameters",
            n, p
        );
        return None;
    }
    Some(cov_x * (ss_res / (n - p) as f64))
}

/// `sqrt` of each diagonal entry that is finite and non-negative.
pub fn standard_errors(covar: &Array2<f64>) -> Vec<Option<f64>> {
    covar
        .diag()
        .iter()
        .map(|&v| (v.is_finite() && v >= 0.0).then(|| v.sqrt()))
        .collect()
}

/// Correlation matrix `covar[i,j] / sqrt(covar[i,i] * covar[j,j])`.
///
/// Entries whose variances are not positive are reported as 0, except
/// the unit diagonal.
pub fn correlation(covar: &Array2<f64>) -> Array2<f64> {
    let n = covar.nrows();
    Array2::from_shape_fn((n, n), |(i, j)| {
        if i == j {
            return 1.0;
        }
        let denom = (covar[[i, i]] * covar[[j, j]]).sqrt();
        if denom > 0.0 && denom.is_finite() {
            covar[[i, j]] / denom
        } else {
            0.0
        }
    })
}
