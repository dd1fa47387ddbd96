// src/processors/mod.rs
pub mod basics;
pub mod spatial;
