//! Core data structures: the time series container, sampling scales and
//! calendar spans, and grouped collections of series.

mod grouped;
mod time_scale;
mod time_series;

pub use grouped::{GroupedSeries, SeriesGroup};
pub use time_scale::{CalendarSpan, TimeScale};
pub use time_series::{TimeSeries, DEFAULT_LABEL};
