// src/processors/spatial/whitening.rs

use std::str::FromStr;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::covariance::{compute_covariance, compute_covariance_parallel};
use super::eigen::{eigen_decompose, EigenDecomposition, JacobiSolver, SymmetricEigenSolver};
use crate::config::{Regularization, WhiteningConfig};
use crate::error::{Result, WhiteningError};
use crate::processors::basics::centering::center_rows;
use crate::processors::basics::validation::{check_finite, check_samples, check_square};
use crate::scalar::Real;

/// Which linear operator to build from the eigen-decomposition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    /// Wd = E^T; result covariance is diag(D)
    Decorrelate,
    /// Ww = diag((D + eps)^(-1/2)) E^T (PCA whitening); result covariance is I
    Whiten,
    /// Wz = E diag((D + eps)^(-1/2)) E^T (ZCA whitening); result covariance is I
    /// and the data stays as close as possible to the original axes
    Zca,
}

impl FromStr for TransformKind {
    type Err = WhiteningError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "decorrelate" | "pca_rotate" => Ok(TransformKind::Decorrelate),
            "whiten" | "pca" => Ok(TransformKind::Whiten),
            "zca" => Ok(TransformKind::Zca),
            other => Err(WhiteningError::invalid(format!(
                "unknown transform kind '{}', expected decorrelate, whiten or zca",
                other
            ))),
        }
    }
}

/// Compute the decorrelation matrix Wd = E^T
pub fn decorrelation_matrix<T: Real>(vectors: ArrayView2<'_, T>) -> Result<Array2<T>> {
    check_square(&vectors, "eigenvector matrix")?;
    check_finite(&vectors, "eigenvector matrix")?;
    Ok(vectors.t().to_owned())
}

/// Compute the whitening matrix Ww = diag((D + eps)^(-1/2)) E^T
///
/// With `regularization.epsilon == 0` any eigenvalue at or below
/// `singular_tolerance * max(D)` fails with
/// [`WhiteningError::SingularCovariance`]; a positive epsilon trades that
/// failure for a regularized, finite approximation.
pub fn whitening_matrix<T: Real>(
    vectors: ArrayView2<'_, T>,
    values: ArrayView1<'_, T>,
    regularization: &Regularization<T>,
) -> Result<Array2<T>> {
    let scales = inverse_sqrt_scales(&vectors, &values, regularization)?;

    let mut whitening = vectors.t().to_owned();
    for (mut row, &scale) in whitening.axis_iter_mut(Axis(0)).zip(scales.iter()) {
        row.mapv_inplace(|x| x * scale);
    }
    Ok(whitening)
}

/// Compute the ZCA whitening matrix Wz = E diag((D + eps)^(-1/2)) E^T
///
/// Same singularity rules as [`whitening_matrix`].
pub fn zca_matrix<T: Real>(
    vectors: ArrayView2<'_, T>,
    values: ArrayView1<'_, T>,
    regularization: &Regularization<T>,
) -> Result<Array2<T>> {
    let whitening = whitening_matrix(vectors, values, regularization)?;
    Ok(vectors.dot(&whitening))
}

fn inverse_sqrt_scales<T: Real>(
    vectors: &ArrayView2<'_, T>,
    values: &ArrayView1<'_, T>,
    regularization: &Regularization<T>,
) -> Result<Array1<T>> {
    regularization.validate()?;
    let n = check_square(vectors, "eigenvector matrix")?;
    check_finite(vectors, "eigenvector matrix")?;
    if values.len() != n {
        return Err(WhiteningError::invalid(format!(
            "eigenvalue vector has length {} but eigenvector matrix is {}x{}",
            values.len(),
            n,
            n
        )));
    }
    if let Some(value) = values.iter().find(|v| !v.is_finite()) {
        return Err(WhiteningError::invalid(format!(
            "eigenvalue vector contains non-finite value {}",
            value
        )));
    }

    let epsilon = regularization.epsilon;
    let largest = values.iter().fold(T::zero(), |acc, &x| acc.max(x));
    let threshold = if epsilon > T::zero() {
        T::zero()
    } else {
        regularization.singular_tolerance * largest
    };

    let mut scales = Array1::<T>::zeros(n);
    for (i, &value) in values.iter().enumerate() {
        if value < T::zero() {
            return Err(WhiteningError::unstable(format!(
                "eigenvalue {} at index {} is negative (covariance is not positive semi-definite)",
                value, i
            )));
        }
        let shifted = value + epsilon;
        let scale = T::one() / shifted.sqrt();
        if shifted <= threshold || !scale.is_finite() {
            return Err(WhiteningError::SingularCovariance {
                index: i,
                value: shifted.as_f64(),
                threshold: threshold.as_f64(),
            });
        }
        scales[i] = scale;
    }
    Ok(scales)
}

/// Apply a transform matrix to a data matrix
///
/// result = transform @ data, with `data` shaped [dimensions x observations].
pub fn apply<T: Real>(transform: ArrayView2<'_, T>, data: ArrayView2<'_, T>) -> Result<Array2<T>> {
    check_apply(&transform, &data)?;
    Ok(transform.dot(&data))
}

/// Apply a transform matrix to a data matrix with parallel processing
///
/// Output rows are computed on the rayon pool; same contract as [`apply`].
pub fn apply_parallel<T: Real>(
    transform: ArrayView2<'_, T>,
    data: ArrayView2<'_, T>,
) -> Result<Array2<T>> {
    check_apply(&transform, &data)?;

    let n_out = transform.nrows();
    let n_obs = data.ncols();

    // Process each output row in parallel
    let row_results: Vec<(usize, Array1<T>)> = (0..n_out)
        .into_par_iter()
        .map(|i| (i, transform.row(i).dot(&data)))
        .collect();

    let mut result = Array2::<T>::zeros((n_out, n_obs));
    for (i, row_data) in row_results {
        result.row_mut(i).assign(&row_data);
    }
    Ok(result)
}

fn check_apply<T: Real>(transform: &ArrayView2<'_, T>, data: &ArrayView2<'_, T>) -> Result<()> {
    let (rows, cols) = transform.dim();
    if rows == 0 || cols == 0 {
        return Err(WhiteningError::invalid("transform matrix is empty"));
    }
    check_finite(transform, "transform matrix")?;
    check_samples(data, 1)?;
    if cols != data.nrows() {
        return Err(WhiteningError::invalid(format!(
            "transform expects {} dimensions but data has {}",
            cols,
            data.nrows()
        )));
    }
    Ok(())
}

/// A fitted decorrelation / whitening operator
///
/// Owns the transform matrix together with the eigen-decomposition it was
/// built from and, when fitted with centering, the row means that are
/// subtracted before the matrix is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct WhiteningTransform<T> {
    kind: TransformKind,
    matrix: Array2<T>,
    eigen: EigenDecomposition<T>,
    mean: Option<Array1<T>>,
    parallel: bool,
}

impl<T: Real> WhiteningTransform<T> {
    /// Estimate covariance from `data` and build the requested operator
    #[instrument(
        level = "debug",
        skip_all,
        fields(kind = ?kind, dimensions = data.nrows(), observations = data.ncols())
    )]
    pub fn fit<S>(
        data: ArrayView2<'_, T>,
        kind: TransformKind,
        config: &WhiteningConfig<T>,
        solver: &S,
    ) -> Result<Self>
    where
        S: SymmetricEigenSolver<T> + ?Sized,
    {
        config.validate()?;

        let (centered, mean) = if config.center {
            let (centered, mean) = center_rows(data)?;
            (Some(centered), Some(mean))
        } else {
            (None, None)
        };
        let samples = match &centered {
            Some(c) => c.view(),
            None => data.view(),
        };

        let cov = if config.parallel {
            compute_covariance_parallel(samples)?
        } else {
            compute_covariance(samples)?
        };
        let eigen = eigen_decompose(cov.view(), solver, config)?;

        let regularization = config.regularization();
        let matrix = match kind {
            TransformKind::Decorrelate => decorrelation_matrix(eigen.vectors())?,
            TransformKind::Whiten => whitening_matrix(eigen.vectors(), eigen.values(), &regularization)?,
            TransformKind::Zca => zca_matrix(eigen.vectors(), eigen.values(), &regularization)?,
        };

        debug!(
            epsilon = config.epsilon.as_f64(),
            centered = mean.is_some(),
            "fitted transform"
        );

        Ok(Self {
            kind,
            matrix,
            eigen,
            mean,
            parallel: config.parallel,
        })
    }

    /// Transform data of matching dimensionality
    ///
    /// Subtracts the fitted row means first when the transform was fitted
    /// with centering.
    pub fn apply(&self, data: ArrayView2<'_, T>) -> Result<Array2<T>> {
        let centered = match &self.mean {
            Some(mean) => {
                check_samples(&data, 1)?;
                if data.nrows() != mean.len() {
                    return Err(WhiteningError::invalid(format!(
                        "transform expects {} dimensions but data has {}",
                        mean.len(),
                        data.nrows()
                    )));
                }
                Some(&data - &mean.view().insert_axis(Axis(1)))
            }
            None => None,
        };
        let samples = match &centered {
            Some(c) => c.view(),
            None => data.view(),
        };

        if self.parallel {
            apply_parallel(self.matrix.view(), samples)
        } else {
            apply(self.matrix.view(), samples)
        }
    }

    pub fn kind(&self) -> TransformKind {
        self.kind
    }

    /// The K x K transform matrix.
    pub fn matrix(&self) -> ArrayView2<'_, T> {
        self.matrix.view()
    }

    pub fn eigen(&self) -> &EigenDecomposition<T> {
        &self.eigen
    }

    pub fn eigenvalues(&self) -> ArrayView1<'_, T> {
        self.eigen.values()
    }

    /// Row means removed before applying, if fitted with centering.
    pub fn mean(&self) -> Option<ArrayView1<'_, T>> {
        self.mean.as_ref().map(|m| m.view())
    }

    pub fn dim(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn into_matrix(self) -> Array2<T> {
        self.matrix
    }
}

/// Fits whitening transforms with an explicitly supplied solver and config
///
/// ```rust
/// use ndarray::array;
/// use whiten_rs::{TransformKind, Whitener, WhiteningConfig};
///
/// let data = array![[2.0f64, -2.0, 2.0, -2.0], [3.0, 3.0, -3.0, -3.0]];
/// let whitener = Whitener::new(WhiteningConfig::default());
/// let transform = whitener.fit(data.view(), TransformKind::Whiten).unwrap();
/// assert!((transform.matrix()[[0, 0]] - 0.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct Whitener<T, S = JacobiSolver<T>> {
    solver: S,
    config: WhiteningConfig<T>,
}

impl<T: Real> Whitener<T, JacobiSolver<T>> {
    /// Whitener backed by the default Jacobi solver.
    pub fn new(config: WhiteningConfig<T>) -> Self {
        Self {
            solver: JacobiSolver::default(),
            config,
        }
    }
}

impl<T: Real> Default for Whitener<T, JacobiSolver<T>> {
    fn default() -> Self {
        Self::new(WhiteningConfig::default())
    }
}

impl<T, S> Whitener<T, S>
where
    T: Real,
    S: SymmetricEigenSolver<T>,
{
    pub fn with_solver(solver: S, config: WhiteningConfig<T>) -> Self {
        Self { solver, config }
    }

    pub fn config(&self) -> &WhiteningConfig<T> {
        &self.config
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Eigen-decomposition of the covariance of `data` (centered first if configured).
    pub fn decompose(&self, data: ArrayView2<'_, T>) -> Result<EigenDecomposition<T>> {
        let transform = self.fit(data, TransformKind::Decorrelate)?;
        Ok(transform.eigen)
    }

    pub fn fit(&self, data: ArrayView2<'_, T>, kind: TransformKind) -> Result<WhiteningTransform<T>> {
        WhiteningTransform::fit(data, kind, &self.config, &self.solver)
    }

    /// Fit on `data` and return the transform together with the transformed data.
    pub fn fit_transform(
        &self,
        data: ArrayView2<'_, T>,
        kind: TransformKind,
    ) -> Result<(WhiteningTransform<T>, Array2<T>)> {
        let transform = self.fit(data, kind)?;
        let transformed = transform.apply(data)?;
        Ok((transform, transformed))
    }
}
