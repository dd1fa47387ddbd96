// src/lib.rs

//! Decorrelation and whitening of dense sample matrices.
//!
//! Data is laid out as `[dimensions x observations]`. From mean-centered
//! samples the crate estimates the covariance `X X^T / n`, eigen-decomposes it
//! with a symmetric solver, and builds one of three operators:
//!
//! - decorrelation `E^T` (result covariance is `diag(D)`),
//! - PCA whitening `diag((D + eps)^(-1/2)) E^T` (result covariance is `I`),
//! - ZCA whitening `E diag((D + eps)^(-1/2)) E^T`.
//!
//! Singular covariance is reported as [`WhiteningError::SingularCovariance`]
//! unless a positive `epsilon` is supplied. The solver and all tolerances are
//! passed in explicitly through [`Whitener`] / [`WhiteningConfig`].
//!
//! ```rust
//! use ndarray::array;
//! use whiten_rs::{compute_covariance, TransformKind, Whitener, WhiteningConfig};
//!
//! let data = array![[1.0f64, -1.0, 2.0, -2.0], [0.5, -0.5, -1.0, 1.0]];
//! let whitener = Whitener::new(WhiteningConfig::default());
//! let (_transform, white) = whitener.fit_transform(data.view(), TransformKind::Whiten)?;
//!
//! let cov = compute_covariance(white.view())?;
//! assert!((cov[[0, 0]] - 1.0).abs() < 1e-12);
//! assert!(cov[[0, 1]].abs() < 1e-12);
//! # Ok::<(), whiten_rs::WhiteningError>(())
//! ```

pub mod config;
pub mod error;
pub mod processors;
pub mod scalar;

#[cfg(feature = "python")]
mod python;

pub use config::{EigenOrder, Regularization, WhiteningConfig};
pub use error::{Result, WhiteningError};
pub use scalar::Real;

pub use processors::basics::{center_rows, row_means};

pub use processors::spatial::{
    apply,
    apply_parallel,
    compute_covariance,
    compute_covariance_parallel,
    decorrelation_matrix,
    eigen_decompose,
    whitening_matrix,
    zca_matrix,
    EigenDecomposition,
    JacobiSolver,
    SymmetricEigenSolver,
    TransformKind,
    Whitener,
    WhiteningTransform,
};
#[cfg(feature = "lapack")]
pub use processors::spatial::LapackSolver;

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Python module entry point
#[cfg(feature = "python")]
#[pymodule]
fn _rs(py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    // covariance and eigen-decomposition
    m.add_function(wrap_pyfunction!(python::compute_covariance, py)?)?;
    m.add_function(wrap_pyfunction!(python::compute_eigen, py)?)?;
    m.add_function(wrap_pyfunction!(python::center_rows, py)?)?;

    // transform matrices
    m.add_function(wrap_pyfunction!(python::compute_decorrelation_matrix, py)?)?;
    m.add_function(wrap_pyfunction!(python::compute_whitening_matrix, py)?)?;
    m.add_function(wrap_pyfunction!(python::compute_zca_matrix, py)?)?;

    // application
    m.add_function(wrap_pyfunction!(python::apply_transform, py)?)?;
    m.add_function(wrap_pyfunction!(python::whiten_data, py)?)?;

    Ok(())
}
