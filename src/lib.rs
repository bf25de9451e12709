//! # anofox-anomaly
//!
//! Time series anomaly detection by decomposition.
//!
//! A series is split into season, trend (or median spans) and remainder, the
//! remainder is scored with an IQR or GESD detector, and the resulting limits
//! are recomposed into bands on the observed scale. Flagged observations can
//! be replaced by their seasonal + trend fit for downstream forecasting.
//!
//! ```no_run
//! use anofox_anomaly::prelude::*;
//!
//! # fn run(series: &TimeSeries) -> anofox_anomaly::Result<()> {
//! let anomalized = detect_anomalies(
//!     series,
//!     "value",
//!     &DecomposeConfig::stl(),
//!     &AnomalizeConfig::default(),
//! )?;
//! let bands = anomalized.recomposed();
//! let cleaned = anomalized.cleaned();
//! # let _ = (bands, cleaned);
//! # Ok(())
//! # }
//! ```

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]

pub mod anomaly;
pub mod core;
pub mod detection;
pub mod error;
pub mod period;
pub mod seasonality;
pub mod utils;

pub use error::{AnomalyError, Result};

pub mod prelude {
    pub use crate::anomaly::{
        anomalize, anomalize_column, clean_anomalies, detect_anomalies, time_recompose,
        AnomalizeConfig, Anomalized, CleanedSeries, RecomposedBands,
    };
    pub use crate::core::{CalendarSpan, GroupedSeries, TimeScale, TimeSeries};
    pub use crate::detection::{
        Anomaly, Direction, Gesd, Iqr, OutlierConfig, OutlierDetector, OutlierMethod,
        OutlierResult,
    };
    pub use crate::error::{AnomalyError, Result};
    pub use crate::period::{time_frequency, time_trend, PeriodSpec, ScaleTemplate};
    pub use crate::seasonality::{
        time_decompose, DecomposeConfig, DecomposeMethod, Decomposition, TrendComponent,
    };
}
