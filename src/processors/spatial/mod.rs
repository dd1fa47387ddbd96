// src/processors/spatial/mod.rs
pub mod covariance;
pub mod eigen;
pub mod whitening;

// Re-export covariance functions
pub use covariance::{compute_covariance, compute_covariance_parallel, MIN_OBSERVATIONS};

// Re-export eigensolvers
pub use eigen::{eigen_decompose, EigenDecomposition, JacobiSolver, SymmetricEigenSolver};
#[cfg(feature = "lapack")]
pub use eigen::LapackSolver;

// Re-export whitening functions
pub use whitening::{
    apply,
    apply_parallel,
    decorrelation_matrix,
    whitening_matrix,
    zca_matrix,
    TransformKind,
    Whitener,
    WhiteningTransform,
};
