// src/python.rs

use ndarray::Array2;
use numpy::{IntoPyArray, PyArray1, PyArray2, PyReadonlyArray1, PyReadonlyArray2};
use pyo3::exceptions::{PyArithmeticError, PyValueError};
use pyo3::prelude::*;

use crate::config::{EigenOrder, Regularization, WhiteningConfig};
use crate::error::WhiteningError;
use crate::processors::basics::centering;
use crate::processors::spatial::{
    covariance, eigen, whitening, JacobiSolver, TransformKind, Whitener,
};

impl From<WhiteningError> for PyErr {
    fn from(err: WhiteningError) -> PyErr {
        match err {
            WhiteningError::InvalidInput { .. } => PyValueError::new_err(err.to_string()),
            _ => PyArithmeticError::new_err(err.to_string()),
        }
    }
}

/// Compute covariance matrix from mean-centered data
///
/// data is [dimensions x observations]; cov = data @ data.T / n_observations
#[pyfunction]
#[pyo3(signature = (data, parallel=false))]
pub fn compute_covariance(
    py: Python<'_>,
    data: PyReadonlyArray2<f64>,
    parallel: bool,
) -> PyResult<Py<PyArray2<f64>>> {
    let data_array = data.as_array().to_owned();

    // Allow Python threads to run during computation
    let cov = Python::allow_threads(py, || {
        if parallel {
            covariance::compute_covariance_parallel(data_array.view())
        } else {
            covariance::compute_covariance(data_array.view())
        }
    })?;

    Ok(cov.into_pyarray(py).into())
}

/// Eigen-decompose a covariance matrix
///
/// Returns (eigenvalues, eigenvectors as columns)
#[pyfunction]
#[pyo3(signature = (cov, order="ascending"))]
pub fn compute_eigen(
    py: Python<'_>,
    cov: PyReadonlyArray2<f64>,
    order: &str,
) -> PyResult<(Py<PyArray1<f64>>, Py<PyArray2<f64>>)> {
    let cov_array = cov.as_array().to_owned();
    let config = WhiteningConfig::default().with_order(order.parse::<EigenOrder>()?);

    let decomposition = Python::allow_threads(py, || {
        eigen::eigen_decompose(cov_array.view(), &JacobiSolver::default(), &config)
    })?;
    let (vectors, values) = decomposition.into_parts();

    Ok((values.into_pyarray(py).into(), vectors.into_pyarray(py).into()))
}

/// Compute the decorrelation matrix E^T
#[pyfunction]
pub fn compute_decorrelation_matrix(
    py: Python<'_>,
    vectors: PyReadonlyArray2<f64>,
) -> PyResult<Py<PyArray2<f64>>> {
    let result = whitening::decorrelation_matrix(vectors.as_array())?;
    Ok(result.into_pyarray(py).into())
}

/// Compute the whitening matrix diag(1/sqrt(D + eps)) E^T
#[pyfunction]
#[pyo3(signature = (vectors, values, eps=0.0))]
pub fn compute_whitening_matrix(
    py: Python<'_>,
    vectors: PyReadonlyArray2<f64>,
    values: PyReadonlyArray1<f64>,
    eps: f64,
) -> PyResult<Py<PyArray2<f64>>> {
    let result = whitening::whitening_matrix(
        vectors.as_array(),
        values.as_array(),
        &Regularization::epsilon(eps),
    )?;
    Ok(result.into_pyarray(py).into())
}

/// Compute the ZCA whitening matrix E diag(1/sqrt(D + eps)) E^T
#[pyfunction]
#[pyo3(signature = (vectors, values, eps=0.0))]
pub fn compute_zca_matrix(
    py: Python<'_>,
    vectors: PyReadonlyArray2<f64>,
    values: PyReadonlyArray1<f64>,
    eps: f64,
) -> PyResult<Py<PyArray2<f64>>> {
    let result = whitening::zca_matrix(
        vectors.as_array(),
        values.as_array(),
        &Regularization::epsilon(eps),
    )?;
    Ok(result.into_pyarray(py).into())
}

/// Apply a transform matrix: result = transform @ data
#[pyfunction]
#[pyo3(signature = (transform, data, parallel=false))]
pub fn apply_transform(
    py: Python<'_>,
    transform: PyReadonlyArray2<f64>,
    data: PyReadonlyArray2<f64>,
    parallel: bool,
) -> PyResult<Py<PyArray2<f64>>> {
    let transform_array = transform.as_array().to_owned();
    let data_array = data.as_array().to_owned();

    let result = Python::allow_threads(py, || {
        if parallel {
            whitening::apply_parallel(transform_array.view(), data_array.view())
        } else {
            whitening::apply(transform_array.view(), data_array.view())
        }
    })?;

    Ok(result.into_pyarray(py).into())
}

/// Subtract row means; returns (centered, means)
#[pyfunction]
pub fn center_rows(
    py: Python<'_>,
    data: PyReadonlyArray2<f64>,
) -> PyResult<(Py<PyArray2<f64>>, Py<PyArray1<f64>>)> {
    let (centered, means) = centering::center_rows(data.as_array())?;
    Ok((centered.into_pyarray(py).into(), means.into_pyarray(py).into()))
}

/// Fit and apply a transform in one call
///
/// Returns (transformed data, transform matrix)
#[pyfunction]
#[pyo3(signature = (data, eps=0.0, kind="whiten", center=true, parallel=false))]
pub fn whiten_data(
    py: Python<'_>,
    data: PyReadonlyArray2<f64>,
    eps: f64,
    kind: &str,
    center: bool,
    parallel: bool,
) -> PyResult<(Py<PyArray2<f64>>, Py<PyArray2<f64>>)> {
    let data_array = data.as_array().to_owned();
    let kind = kind.parse::<TransformKind>()?;
    let config = WhiteningConfig::default()
        .with_epsilon(eps)
        .with_center(center)
        .with_parallel(parallel);

    let (whitened, matrix): (Array2<f64>, Array2<f64>) = Python::allow_threads(py, || {
        let (transform, whitened) = Whitener::new(config).fit_transform(data_array.view(), kind)?;
        Ok::<_, WhiteningError>((whitened, transform.into_matrix()))
    })?;

    Ok((whitened.into_pyarray(py).into(), matrix.into_pyarray(py).into()))
}
