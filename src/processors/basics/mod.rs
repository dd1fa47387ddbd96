// src/processors/basics/mod.rs
pub mod centering;
pub(crate) mod validation;

pub use centering::{center_rows, row_means};
