// src/config.rs

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WhiteningError};
use crate::scalar::Real;

/// Ordering of eigenpairs in an [`EigenDecomposition`](crate::EigenDecomposition).
///
/// Eigenvalues and eigenvector columns always share the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EigenOrder {
    /// Smallest eigenvalue first (LAPACK `syevd` convention)
    #[default]
    Ascending,
    /// Largest eigenvalue first (PCA convention)
    Descending,
}

impl FromStr for EigenOrder {
    type Err = WhiteningError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ascending" | "asc" => Ok(EigenOrder::Ascending),
            "descending" | "desc" => Ok(EigenOrder::Descending),
            other => Err(WhiteningError::invalid(format!(
                "unknown eigen order '{}', expected ascending or descending",
                other
            ))),
        }
    }
}

/// How near-zero eigenvalues are treated when scaling by `(D + epsilon)^(-1/2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regularization<T> {
    /// Added to every eigenvalue before the inverse square root.
    pub epsilon: T,
    /// Relative threshold (fraction of the largest eigenvalue) at or below
    /// which an eigenvalue counts as zero when `epsilon` is zero.
    pub singular_tolerance: T,
}

impl<T: Real> Regularization<T> {
    /// Exact whitening: no epsilon, singular covariance is an error.
    pub fn exact() -> Self {
        Self {
            epsilon: T::zero(),
            singular_tolerance: default_singular_tolerance(),
        }
    }

    /// Regularized whitening with the given epsilon.
    pub fn epsilon(epsilon: T) -> Self {
        Self {
            epsilon,
            singular_tolerance: default_singular_tolerance(),
        }
    }

    pub fn with_singular_tolerance(mut self, tolerance: T) -> Self {
        self.singular_tolerance = tolerance;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_non_negative("epsilon", self.epsilon)?;
        check_non_negative("singular_tolerance", self.singular_tolerance)
    }
}

impl<T: Real> Default for Regularization<T> {
    fn default() -> Self {
        Self::exact()
    }
}

/// Settings for fitting a whitening transform.
///
/// Nothing here is global: the config travels with each [`Whitener`](crate::Whitener)
/// or is passed to the free functions directly.
///
/// ```rust
/// use whiten_rs::{EigenOrder, WhiteningConfig};
///
/// let config = WhiteningConfig::<f64>::default()
///     .with_epsilon(1e-5)
///     .with_order(EigenOrder::Descending)
///     .with_center(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "T: Real + Deserialize<'de>"))]
pub struct WhiteningConfig<T> {
    /// Regularization added to every eigenvalue (0 reproduces exact whitening).
    pub epsilon: T,
    /// Eigenvalues below `-psd_tolerance * max|eigenvalue|` are rejected.
    pub psd_tolerance: T,
    /// With `epsilon == 0`, eigenvalues at or below
    /// `singular_tolerance * max eigenvalue` are treated as zero.
    pub singular_tolerance: T,
    /// Eigenpair ordering.
    pub order: EigenOrder,
    /// Subtract row means before estimating covariance, and remember them.
    pub center: bool,
    /// Use rayon for covariance estimation and application.
    pub parallel: bool,
}

impl<T: Real> Default for WhiteningConfig<T> {
    fn default() -> Self {
        Self {
            epsilon: T::zero(),
            psd_tolerance: T::epsilon().sqrt(),
            singular_tolerance: default_singular_tolerance(),
            order: EigenOrder::Ascending,
            center: false,
            parallel: false,
        }
    }
}

impl<T: Real> WhiteningConfig<T> {
    pub fn with_epsilon(mut self, epsilon: T) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_psd_tolerance(mut self, tolerance: T) -> Self {
        self.psd_tolerance = tolerance;
        self
    }

    pub fn with_singular_tolerance(mut self, tolerance: T) -> Self {
        self.singular_tolerance = tolerance;
        self
    }

    pub fn with_order(mut self, order: EigenOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_center(mut self, center: bool) -> Self {
        self.center = center;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Regularization settings derived from this config.
    pub fn regularization(&self) -> Regularization<T> {
        Regularization {
            epsilon: self.epsilon,
            singular_tolerance: self.singular_tolerance,
        }
    }

    /// Reject negative or non-finite tolerances and epsilon.
    pub fn validate(&self) -> Result<()> {
        check_non_negative("epsilon", self.epsilon)?;
        check_non_negative("psd_tolerance", self.psd_tolerance)?;
        check_non_negative("singular_tolerance", self.singular_tolerance)
    }
}

fn default_singular_tolerance<T: Real>() -> T {
    T::epsilon() * T::of(100.0)
}

fn check_non_negative<T: Real>(name: &str, value: T) -> Result<()> {
    if !value.is_finite() || value < T::zero() {
        return Err(WhiteningError::invalid(format!(
            "{} must be finite and non-negative, got {}",
            name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_exact_and_valid() {
        let config = WhiteningConfig::<f64>::default();
        assert_eq!(config.epsilon, 0.0);
        assert_eq!(config.order, EigenOrder::Ascending);
        assert!(!config.center);
        assert!(config.psd_tolerance > 0.0 && config.psd_tolerance < 1e-6);
        assert!(config.validate().is_ok());
        assert_eq!(config.regularization(), Regularization::exact());
    }

    #[test]
    fn test_negative_epsilon_rejected() {
        let config = WhiteningConfig::<f64>::default().with_epsilon(-1e-3);
        assert!(matches!(
            config.validate(),
            Err(WhiteningError::InvalidInput { .. })
        ));

        let reg = Regularization::<f32>::epsilon(f32::NAN);
        assert!(reg.validate().is_err());
    }

    #[test]
    fn test_order_from_str() {
        assert_eq!("Descending".parse::<EigenOrder>().unwrap(), EigenOrder::Descending);
        assert_eq!("asc".parse::<EigenOrder>().unwrap(), EigenOrder::Ascending);
        assert!("sideways".parse::<EigenOrder>().is_err());
    }

    #[test]
    fn test_f32_tolerances_are_looser() {
        let single = WhiteningConfig::<f32>::default();
        let double = WhiteningConfig::<f64>::default();
        assert!(single.psd_tolerance as f64 > double.psd_tolerance);
        assert!(single.singular_tolerance as f64 > double.singular_tolerance);
    }
}
