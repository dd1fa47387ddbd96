// src/processors/basics/validation.rs

use ndarray::ArrayView2;

use crate::error::{Result, WhiteningError};
use crate::scalar::Real;

/// Check that a sample matrix has at least one dimension, at least
/// `min_observations` columns, and only finite entries.
pub fn check_samples<T: Real>(data: &ArrayView2<'_, T>, min_observations: usize) -> Result<()> {
    let (n_dims, n_obs) = data.dim();
    if n_dims == 0 || n_obs == 0 {
        return Err(WhiteningError::invalid(format!(
            "sample matrix must be non-empty, got shape [{} x {}]",
            n_dims, n_obs
        )));
    }
    if n_obs < min_observations {
        return Err(WhiteningError::invalid(format!(
            "need at least {} observations, got {}",
            min_observations, n_obs
        )));
    }
    check_finite(data, "sample matrix")
}

/// Check that every entry of `data` is finite.
pub fn check_finite<T: Real>(data: &ArrayView2<'_, T>, what: &str) -> Result<()> {
    if let Some(((i, j), value)) = data.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(WhiteningError::invalid(format!(
            "{} contains non-finite value {} at [{}, {}]",
            what, value, i, j
        )));
    }
    Ok(())
}

/// Check that `data` is a non-empty square matrix.
pub fn check_square<T: Real>(data: &ArrayView2<'_, T>, what: &str) -> Result<usize> {
    let (rows, cols) = data.dim();
    if rows == 0 || rows != cols {
        return Err(WhiteningError::invalid(format!(
            "{} must be a non-empty square matrix, got shape [{} x {}]",
            what, rows, cols
        )));
    }
    Ok(rows)
}
