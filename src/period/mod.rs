//! Period resolution.
//!
//! This module turns frequency and trend requests into observation counts:
//! - `ScaleTemplate`: default spans per sampling scale
//! - `PeriodResolver`: `auto`, calendar-span and raw-count resolution with a
//!   data-sufficiency fallback
//! - `time_apply`: per-period reducers broadcast back onto the series

mod apply;
mod resolver;
mod template;

pub use apply::{time_apply, TIME_APPLY_COLUMN};
pub use resolver::{time_frequency, time_trend, PeriodResolver, PeriodSpec, PeriodTarget};
pub use template::{ScaleTemplate, TemplateEntry};
