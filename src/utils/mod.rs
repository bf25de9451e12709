//! Utility functions shared by the decomposition and detection modules.

pub mod stats;

pub use stats::{mad, median, quantile, quantile_t};
