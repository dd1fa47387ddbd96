// src/error.rs

use thiserror::Error;

/// Errors raised while estimating or applying a whitening transform.
///
/// All operations are deterministic, so none of these are retryable: the
/// caller has to fix the input or opt into regularization.
///
/// # Examples
///
/// ```rust
/// use whiten_rs::WhiteningError;
///
/// let error = WhiteningError::SingularCovariance {
///     index: 0,
///     value: 0.0,
///     threshold: 1e-14,
/// };
/// assert!(error.to_string().contains("epsilon"));
/// ```
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WhiteningError {
    /// Malformed shape, mismatched dimensions or non-finite values.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// What was wrong with the input
        reason: String,
    },

    /// The eigensolver failed, did not converge, or produced eigenvalues
    /// that violate positive semi-definiteness beyond tolerance.
    #[error("Numerical instability: {reason}")]
    NumericalInstability {
        /// Description of the failed check
        reason: String,
    },

    /// An eigenvalue is too small to invert while whitening without
    /// regularization.
    #[error(
        "Singular covariance: eigenvalue {value:e} at index {index} is not above {threshold:e}; \
         supply a positive regularization epsilon or use decorrelation only"
    )]
    SingularCovariance {
        /// Position of the offending eigenvalue in the decomposition
        index: usize,
        /// The eigenvalue (plus epsilon) that failed the check
        value: f64,
        /// Threshold it had to exceed
        threshold: f64,
    },
}

impl WhiteningError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        WhiteningError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub(crate) fn unstable(reason: impl Into<String>) -> Self {
        WhiteningError::NumericalInstability {
            reason: reason.into(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, WhiteningError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_failure() {
        let err = WhiteningError::invalid("matrix has zero rows");
        assert_eq!(err.to_string(), "Invalid input: matrix has zero rows");

        let err = WhiteningError::unstable("eigenvalue -3 below tolerance");
        assert!(err.to_string().starts_with("Numerical instability"));

        let err = WhiteningError::SingularCovariance {
            index: 1,
            value: 0.0,
            threshold: 2.5e-14,
        };
        let msg = err.to_string();
        assert!(msg.contains("index 1"));
        assert!(msg.contains("2.5e-14"));
    }
}
