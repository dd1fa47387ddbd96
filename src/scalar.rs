// src/scalar.rs

use std::fmt::{Debug, Display};
use std::iter::Sum;

use ndarray::{LinalgScalar, ScalarOperand};
use num_traits::Float;

/// Floating point element type accepted by every processor in this crate.
///
/// Implemented for `f32` and `f64`. The helpers let generic code
/// build constants and counts without `Option`-returning casts.
pub trait Real:
    Float + LinalgScalar + ScalarOperand + Debug + Display + Sum + Send + Sync + 'static
{
    /// Convert an `f64` literal into `Self`, rounding if needed.
    fn of(value: f64) -> Self;

    /// Convert a count (sample size, dimension) into `Self`.
    fn of_usize(value: usize) -> Self;

    /// Widen into `f64` for error reporting and logging.
    fn as_f64(self) -> f64;
}

macro_rules! impl_real {
    ($t:ty) => {
        impl Real for $t {
            #[inline]
            fn of(value: f64) -> Self {
                value as $t
            }

            #[inline]
            fn of_usize(value: usize) -> Self {
                value as $t
            }

            #[inline]
            fn as_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

impl_real!(f32);
impl_real!(f64);
