//! Seasonal decomposition.
//!
//! This module provides:
//! - STL: Seasonal-Trend decomposition using LOESS
//! - `time_decompose`: `stl` and `twitter` decomposition of a series column

mod decompose;
mod stl;

pub use decompose::{
    columns, median_spans, time_decompose, DecomposeConfig, DecomposeMethod, Decomposition,
    TrendComponent,
};
pub use stl::{SeasonalWindow, STLResult, STL};
