// src/processors/spatial/covariance.rs

use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::processors::basics::validation::check_samples;
use crate::scalar::Real;

/// Minimum number of observations for a covariance estimate
pub const MIN_OBSERVATIONS: usize = 2;

/// Compute covariance matrix from mean-centered data
///
/// cov = data @ data.T / n_observations, with `data` shaped
/// [dimensions x observations]. Rows are not centered here.
pub fn compute_covariance<T: Real>(data: ArrayView2<'_, T>) -> Result<Array2<T>> {
    check_samples(&data, MIN_OBSERVATIONS)?;

    let (n_dims, n_obs) = data.dim();
    let norm = T::of_usize(n_obs);
    debug!(dimensions = n_dims, observations = n_obs, "computing covariance");

    let mut cov_matrix = Array2::<T>::zeros((n_dims, n_dims));

    for i in 0..n_dims {
        for j in 0..=i {
            // Exploit symmetry
            let value = data.row(i).dot(&data.row(j)) / norm;
            cov_matrix[[i, j]] = value;
            cov_matrix[[j, i]] = value;
        }
    }

    Ok(cov_matrix)
}

/// Compute covariance matrix from mean-centered data with parallel processing
///
/// Same contract as [`compute_covariance`]; rows of the lower triangle are
/// computed on the rayon pool.
pub fn compute_covariance_parallel<T: Real>(data: ArrayView2<'_, T>) -> Result<Array2<T>> {
    check_samples(&data, MIN_OBSERVATIONS)?;

    let (n_dims, n_obs) = data.dim();
    let norm = T::of_usize(n_obs);
    debug!(dimensions = n_dims, observations = n_obs, "computing covariance in parallel");

    // For each dimension, its covariance with all dimensions up to i
    let row_results: Vec<(usize, Vec<T>)> = (0..n_dims)
        .into_par_iter()
        .map(|i| {
            let row_i = data.row(i);
            let row_output: Vec<T> = (0..=i)
                .map(|j| row_i.dot(&data.row(j)) / norm)
                .collect();
            (i, row_output)
        })
        .collect();

    let mut cov_matrix = Array2::<T>::zeros((n_dims, n_dims));
    for (i, row_data) in row_results {
        for (j, value) in row_data.into_iter().enumerate() {
            cov_matrix[[i, j]] = value;
            cov_matrix[[j, i]] = value;
        }
    }

    Ok(cov_matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WhiteningError;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_known_covariance() {
        // row variances 4 and 9, zero cross term
        let data = array![[2.0, -2.0, 2.0, -2.0], [3.0, 3.0, -3.0, -3.0]];
        let cov = compute_covariance(data.view()).unwrap();
        assert_abs_diff_eq!(cov[[0, 0]], 4.0);
        assert_abs_diff_eq!(cov[[1, 1]], 9.0);
        assert_abs_diff_eq!(cov[[0, 1]], 0.0);
        assert_abs_diff_eq!(cov[[1, 0]], 0.0);
    }

    #[test]
    fn test_divides_by_n_not_n_minus_one() {
        let data = array![[1.0, -1.0]];
        let cov = compute_covariance(data.view()).unwrap();
        assert_abs_diff_eq!(cov[[0, 0]], 1.0);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let data = array![
            [0.5, -1.0, 2.0, 0.25, -1.75],
            [1.0, 0.0, -1.0, 2.0, -2.0],
            [-0.3, 0.2, 0.4, -0.1, -0.2]
        ];
        let serial = compute_covariance(data.view()).unwrap();
        let parallel = compute_covariance_parallel(data.view()).unwrap();
        for (a, b) in serial.iter().zip(parallel.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-15);
        }
        // exactly symmetric
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(parallel[[i, j]], parallel[[j, i]]);
            }
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let empty = Array2::<f64>::zeros((0, 0));
        assert!(matches!(
            compute_covariance(empty.view()),
            Err(WhiteningError::InvalidInput { .. })
        ));

        let one_obs = array![[1.0], [2.0]];
        assert!(compute_covariance(one_obs.view()).is_err());

        let inf = array![[1.0, f64::NEG_INFINITY], [0.0, 1.0]];
        assert!(compute_covariance_parallel(inf.view()).is_err());
    }
}
