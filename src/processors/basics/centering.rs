// src/processors/basics/centering.rs

use ndarray::{Array1, Array2, ArrayView2, Axis};

use super::validation::check_samples;
use crate::error::Result;
use crate::scalar::Real;

/// Compute the mean of every row (dimension) across observations
///
/// mean[k] = sum_j data[k, j] / n_observations
pub fn row_means<T: Real>(data: ArrayView2<'_, T>) -> Result<Array1<T>> {
    check_samples(&data, 1)?;
    let n_obs = T::of_usize(data.ncols());
    Ok(data.map_axis(Axis(1), |row| row.sum() / n_obs))
}

/// Subtract each row's mean, returning the centered copy and the means
///
/// The input is left untouched.
pub fn center_rows<T: Real>(data: ArrayView2<'_, T>) -> Result<(Array2<T>, Array1<T>)> {
    let means = row_means(data)?;
    let mut centered = data.to_owned();
    for (mut row, &mean) in centered.axis_iter_mut(Axis(0)).zip(means.iter()) {
        row.mapv_inplace(|x| x - mean);
    }
    Ok((centered, means))
}
