// src/processors/spatial/eigen.rs

use std::cmp::Ordering;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use tracing::{trace, warn};

use crate::config::{EigenOrder, WhiteningConfig};
use crate::error::{Result, WhiteningError};
use crate::processors::basics::validation::{check_finite, check_square};
use crate::scalar::Real;

/// Eigensolver for real symmetric matrices
///
/// Implementations return `(eigenvalues, eigenvectors)` with eigenvectors as
/// orthonormal columns, in any order. Ordering, sign normalization and the
/// positive semi-definite checks are applied by [`eigen_decompose`].
pub trait SymmetricEigenSolver<T: Real> {
    fn solve(&self, matrix: ArrayView2<'_, T>) -> Result<(Array1<T>, Array2<T>)>;
}

/// Eigenvectors (columns of `vectors`) and matching eigenvalues of a covariance matrix
///
/// Eigenvectors are unique only up to sign, and within a repeated eigenvalue
/// only up to a rotation of the eigenspace. This crate flips each column so
/// its largest-magnitude entry is positive, but other solvers or versions may
/// return a different basis. Compare derived quantities (e.g. the covariance
/// of transformed data), not the vectors themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct EigenDecomposition<T> {
    vectors: Array2<T>,
    values: Array1<T>,
    order: EigenOrder,
}

impl<T: Real> EigenDecomposition<T> {
    /// Eigenvector matrix E; column `i` pairs with `values()[i]`.
    pub fn vectors(&self) -> ArrayView2<'_, T> {
        self.vectors.view()
    }

    /// Eigenvalue vector D, never negative.
    pub fn values(&self) -> ArrayView1<'_, T> {
        self.values.view()
    }

    pub fn order(&self) -> EigenOrder {
        self.order
    }

    /// Number of dimensions K.
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    pub fn into_parts(self) -> (Array2<T>, Array1<T>) {
        (self.vectors, self.values)
    }

    /// E diag(D) E^T, i.e. the covariance this decomposition came from.
    pub fn reconstruct(&self) -> Array2<T> {
        let scaled = &self.vectors * &self.values.view().insert_axis(Axis(0));
        scaled.dot(&self.vectors.t())
    }
}

/// Pure Rust cyclic Jacobi eigensolver
///
/// Each sweep visits every off-diagonal pair (p, q) and applies the plane
/// rotation that zeroes it, accumulating the rotations into the eigenvector
/// matrix. Stops once every off-diagonal entry is below
/// `tolerance * ||A||_F`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JacobiSolver<T> {
    pub max_sweeps: usize,
    pub tolerance: T,
}

impl<T: Real> Default for JacobiSolver<T> {
    fn default() -> Self {
        Self {
            max_sweeps: 100,
            tolerance: T::epsilon(),
        }
    }
}

impl<T: Real> JacobiSolver<T> {
    pub fn new(max_sweeps: usize, tolerance: T) -> Self {
        Self {
            max_sweeps,
            tolerance,
        }
    }
}

impl<T: Real> SymmetricEigenSolver<T> for JacobiSolver<T> {
    fn solve(&self, matrix: ArrayView2<'_, T>) -> Result<(Array1<T>, Array2<T>)> {
        let n = check_square(&matrix, "matrix")?;
        let mut a = matrix.to_owned();
        let mut v = Array2::<T>::eye(n);

        let threshold = self.tolerance * frobenius_norm(&a);

        for sweep in 0..=self.max_sweeps {
            let largest = max_off_diagonal(&a);
            if largest <= threshold {
                trace!(sweeps = sweep, dimensions = n, "jacobi converged");
                return Ok((a.diag().to_owned(), v));
            }
            if sweep == self.max_sweeps {
                break;
            }

            for p in 0..n {
                for q in (p + 1)..n {
                    let apq = a[[p, q]];
                    if apq.abs() <= threshold {
                        continue;
                    }
                    let app = a[[p, p]];
                    let aqq = a[[q, q]];

                    // smaller root of t^2 + 2 theta t - 1 = 0
                    let theta = (aqq - app) / (T::of(2.0) * apq);
                    let sign = if theta >= T::zero() { T::one() } else { -T::one() };
                    let t = sign / (theta.abs() + theta.hypot(T::one()));
                    let c = T::one() / t.hypot(T::one());
                    let s = t * c;

                    // A <- A J
                    for k in 0..n {
                        let akp = a[[k, p]];
                        let akq = a[[k, q]];
                        a[[k, p]] = c * akp - s * akq;
                        a[[k, q]] = s * akp + c * akq;
                    }
                    // A <- J^T A
                    for k in 0..n {
                        let apk = a[[p, k]];
                        let aqk = a[[q, k]];
                        a[[p, k]] = c * apk - s * aqk;
                        a[[q, k]] = s * apk + c * aqk;
                    }
                    a[[p, q]] = T::zero();
                    a[[q, p]] = T::zero();

                    // V <- V J
                    for k in 0..n {
                        let vkp = v[[k, p]];
                        let vkq = v[[k, q]];
                        v[[k, p]] = c * vkp - s * vkq;
                        v[[k, q]] = s * vkp + c * vkq;
                    }
                }
            }
        }

        Err(WhiteningError::unstable(format!(
            "Jacobi eigensolver did not converge after {} sweeps (largest off-diagonal {})",
            self.max_sweeps,
            max_off_diagonal(&a)
        )))
    }
}

/// Frobenius norm, scaled by the largest entry so the squares cannot overflow
fn frobenius_norm<T: Real>(a: &Array2<T>) -> T {
    let largest = a.iter().fold(T::zero(), |acc, &x| acc.max(x.abs()));
    if largest == T::zero() {
        return largest;
    }
    let sum = a
        .iter()
        .map(|&x| {
            let r = x / largest;
            r * r
        })
        .sum::<T>();
    largest * sum.sqrt()
}

fn max_off_diagonal<T: Real>(a: &Array2<T>) -> T {
    a.indexed_iter()
        .filter(|((i, j), _)| i != j)
        .fold(T::zero(), |acc, (_, &x)| acc.max(x.abs()))
}

/// LAPACK `syevd`-backed solver via `ndarray-linalg`
#[cfg(feature = "lapack")]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LapackSolver;

#[cfg(feature = "lapack")]
macro_rules! impl_lapack_solver {
    ($t:ty) => {
        impl SymmetricEigenSolver<$t> for LapackSolver {
            fn solve(&self, matrix: ArrayView2<'_, $t>) -> Result<(Array1<$t>, Array2<$t>)> {
                use ndarray_linalg::{Eigh, UPLO};

                check_square(&matrix, "matrix")?;
                matrix
                    .eigh(UPLO::Upper)
                    .map_err(|e| WhiteningError::unstable(format!("LAPACK eigh failed: {}", e)))
            }
        }
    };
}

#[cfg(feature = "lapack")]
impl_lapack_solver!(f32);
#[cfg(feature = "lapack")]
impl_lapack_solver!(f64);

/// Eigen-decompose a symmetric, positive semi-definite covariance matrix
///
/// Eigenpairs are sorted by `config.order`. Eigenvalues below
/// `-config.psd_tolerance * max|eigenvalue|` fail with
/// [`WhiteningError::NumericalInstability`]; small negatives inside that band
/// are floating-point noise and are clamped to zero.
pub fn eigen_decompose<T, S>(
    cov: ArrayView2<'_, T>,
    solver: &S,
    config: &WhiteningConfig<T>,
) -> Result<EigenDecomposition<T>>
where
    T: Real,
    S: SymmetricEigenSolver<T> + ?Sized,
{
    config.validate()?;
    let n = check_square(&cov, "covariance matrix")?;
    check_finite(&cov, "covariance matrix")?;
    check_symmetric(&cov, config.psd_tolerance)?;

    let (values, vectors) = solver.solve(cov)?;
    if values.len() != n || vectors.dim() != (n, n) {
        return Err(WhiteningError::unstable(format!(
            "eigensolver returned {} values and a {:?} vector matrix for a {}x{} input",
            values.len(),
            vectors.dim(),
            n,
            n
        )));
    }
    if values.iter().chain(vectors.iter()).any(|x| !x.is_finite()) {
        return Err(WhiteningError::unstable(
            "eigensolver produced non-finite values",
        ));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&i, &j| values[i].partial_cmp(&values[j]).unwrap_or(Ordering::Equal));
    if config.order == EigenOrder::Descending {
        indices.reverse();
    }
    let mut values: Array1<T> = indices.iter().map(|&i| values[i]).collect();
    let mut vectors = vectors.select(Axis(1), &indices);

    let scale = values.iter().fold(T::zero(), |acc, &x| acc.max(x.abs()));
    let floor = config.psd_tolerance * scale;
    for (i, value) in values.iter_mut().enumerate() {
        if *value < -floor {
            return Err(WhiteningError::unstable(format!(
                "eigenvalue {} at index {} is below -{} (matrix is not positive semi-definite)",
                value, i, floor
            )));
        }
        if *value < T::zero() {
            warn!(index = i, value = value.as_f64(), "clamping negative eigenvalue to zero");
            *value = T::zero();
        }
    }

    for mut column in vectors.axis_iter_mut(Axis(1)) {
        let pivot = column
            .iter()
            .fold(T::zero(), |acc, &x| if x.abs() > acc.abs() { x } else { acc });
        if pivot < T::zero() {
            column.mapv_inplace(|x| -x);
        }
    }

    Ok(EigenDecomposition {
        vectors,
        values,
        order: config.order,
    })
}

fn check_symmetric<T: Real>(matrix: &ArrayView2<'_, T>, tolerance: T) -> Result<()> {
    let scale = matrix.iter().fold(T::zero(), |acc, &x| acc.max(x.abs()));
    let limit = tolerance * scale;
    let n = matrix.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            if (matrix[[i, j]] - matrix[[j, i]]).abs() > limit {
                return Err(WhiteningError::invalid(format!(
                    "covariance matrix is not symmetric at [{}, {}]",
                    i, j
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn decompose(cov: &Array2<f64>, order: EigenOrder) -> EigenDecomposition<f64> {
        let config = WhiteningConfig::default().with_order(order);
        eigen_decompose(cov.view(), &JacobiSolver::default(), &config).unwrap()
    }

    #[test]
    fn test_known_2x2() {
        // [[2, 1], [1, 2]] has eigenvalues 1 and 3
        let cov = array![[2.0, 1.0], [1.0, 2.0]];
        let eig = decompose(&cov, EigenOrder::Ascending);
        assert_abs_diff_eq!(eig.values()[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eig.values()[1], 3.0, epsilon = 1e-12);

        let h = std::f64::consts::FRAC_1_SQRT_2;
        // eigenvector for 3 is (1, 1)/sqrt(2), positive after sign canonicalization
        assert_abs_diff_eq!(eig.vectors()[[0, 1]], h, epsilon = 1e-12);
        assert_abs_diff_eq!(eig.vectors()[[1, 1]], h, epsilon = 1e-12);
    }

    #[test]
    fn test_descending_order_pairs_columns() {
        let cov = array![[4.0, 0.0, 0.0], [0.0, 9.0, 0.0], [0.0, 0.0, 1.0]];
        let eig = decompose(&cov, EigenOrder::Descending);
        assert_eq!(eig.order(), EigenOrder::Descending);
        assert_eq!(eig.values().to_vec(), vec![9.0, 4.0, 1.0]);
        // column 0 is the unit vector along dimension 1
        assert_abs_diff_eq!(eig.vectors()[[1, 0]], 1.0);
        assert_abs_diff_eq!(eig.vectors()[[2, 2]], 1.0);
    }

    #[test]
    fn test_orthonormal_and_reconstructs() {
        let cov = array![
            [5.0, 2.0, 1.0, 0.5],
            [2.0, 3.0, 0.5, 0.25],
            [1.0, 0.5, 1.0, 0.1],
            [0.5, 0.25, 0.1, 2.0]
        ];
        let eig = decompose(&cov, EigenOrder::Ascending);

        let gram = eig.vectors().t().dot(&eig.vectors());
        for i in 0..4 {
            for j in 0..4 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(gram[[i, j]], expected, epsilon = 1e-12);
            }
        }

        let rebuilt = eig.reconstruct();
        for (a, b) in rebuilt.iter().zip(cov.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }

        let trace: f64 = eig.values().sum();
        assert_abs_diff_eq!(trace, 11.0, epsilon = 1e-12);
        for w in eig.values().to_vec().windows(2) {
            assert!(w[0] <= w[1]);
        }
    }

    #[test]
    fn test_rank_deficient_has_zero_eigenvalue() {
        let cov = array![[1.0, 2.0], [2.0, 4.0]];
        let eig = decompose(&cov, EigenOrder::Ascending);
        assert_abs_diff_eq!(eig.values()[0], 0.0, epsilon = 1e-12);
        assert!(eig.values()[0] >= 0.0);
        assert_abs_diff_eq!(eig.values()[1], 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_indefinite_matrix_is_unstable() {
        // eigenvalues -1 and 3
        let cov = array![[1.0, 2.0], [2.0, 1.0]];
        let err = eigen_decompose(cov.view(), &JacobiSolver::default(), &WhiteningConfig::default())
            .unwrap_err();
        assert!(matches!(err, WhiteningError::NumericalInstability { .. }));
    }

    #[test]
    fn test_asymmetric_rejected() {
        let cov = array![[1.0, 0.5], [0.0, 1.0]];
        let err = eigen_decompose(cov.view(), &JacobiSolver::default(), &WhiteningConfig::default())
            .unwrap_err();
        assert!(matches!(err, WhiteningError::InvalidInput { .. }));
    }

    #[test]
    fn test_non_square_rejected() {
        let cov = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        assert!(JacobiSolver::default().solve(cov.view()).is_err());
    }

    #[test]
    fn test_sweep_limit_reports_instability() {
        let cov = array![[2.0, 1.0], [1.0, 2.0]];
        let solver = JacobiSolver::new(0, f64::EPSILON);
        let err = solver.solve(cov.view()).unwrap_err();
        assert!(err.to_string().contains("did not converge"));
    }

    #[test]
    fn test_single_dimension() {
        let cov = array![[7.0]];
        let eig = decompose(&cov, EigenOrder::Ascending);
        assert_eq!(eig.dim(), 1);
        assert_eq!(eig.values()[0], 7.0);
        assert_eq!(eig.vectors()[[0, 0]], 1.0);
    }

    #[test]
    fn test_large_f32_entries_still_rotate() {
        // squared entries exceed f32::MAX
        let cov = array![[2.5e20f32, -7.5e19], [-7.5e19, 6.25e19]];
        let eig = eigen_decompose(cov.view(), &JacobiSolver::default(), &WhiteningConfig::default())
            .unwrap();
        assert!(eig.vectors()[[0, 0]].abs() > 0.1 && eig.vectors()[[1, 0]].abs() > 0.1);

        let rebuilt = eig.reconstruct();
        for (a, b) in rebuilt.iter().zip(cov.iter()) {
            assert!(((a - b) / 2.5e20).abs() < 1e-5, "{a} vs {b}");
        }
        assert!(((eig.values().sum() - 3.125e20) / 3.125e20).abs() < 1e-5);
    }

    #[test]
    fn test_large_f64_entries_still_rotate() {
        let cov = array![[2.5e160f64, -7.5e159], [-7.5e159, 6.25e159]];
        let eig = eigen_decompose(cov.view(), &JacobiSolver::default(), &WhiteningConfig::default())
            .unwrap();
        let rebuilt = eig.reconstruct();
        assert_abs_diff_eq!(rebuilt[[0, 1]] / -7.5e159, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rebuilt[[1, 1]] / 6.25e159, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_frobenius_norm_does_not_overflow() {
        let a = array![[3.0e200f64, 0.0], [0.0, 4.0e200]];
        assert_abs_diff_eq!(frobenius_norm(&a) / 5.0e200, 1.0, epsilon = 1e-15);
        assert_eq!(frobenius_norm(&Array2::<f64>::zeros((2, 2))), 0.0);
    }

    #[test]
    fn test_f32_decomposition() {
        let cov = array![[2.0f32, 1.0], [1.0, 2.0]];
        let eig = eigen_decompose(cov.view(), &JacobiSolver::default(), &WhiteningConfig::default())
            .unwrap();
        assert_abs_diff_eq!(eig.values()[0], 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(eig.values()[1], 3.0, epsilon = 1e-5);
    }
}
