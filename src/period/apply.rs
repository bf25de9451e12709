//! Apply a reducer to every calendar period of a series.

use crate::core::{CalendarSpan, TimeSeries};
use crate::error::{AnomalyError, Result};
use crate::period::PeriodSpec;

/// Column label written by [`time_apply`].
pub const TIME_APPLY_COLUMN: &str = "time_apply";

/// Split `target` into calendar buckets of `period`, reduce each bucket with
/// `f` and broadcast the bucket's result back to every row in it.
///
/// A numeric period means `count` units of the series' own time scale,
/// e.g. `7` on a daily series is `"7 days"`. `Auto` is not accepted.
/// Returns the input series with a `time_apply` column appended.
pub fn time_apply<F>(
    series: &TimeSeries,
    target: &str,
    period: &PeriodSpec,
    f: F,
) -> Result<TimeSeries>
where
    F: Fn(&[f64]) -> f64,
{
    let values = series.require_column(target, "time_apply")?;
    if values.is_empty() {
        return Err(AnomalyError::EmptyData);
    }

    let span = match period {
        PeriodSpec::Span(span) => *span,
        PeriodSpec::Observations(count) => {
            let count = u32::try_from(*count).map_err(|_| {
                AnomalyError::InvalidParameter(format!("period {} is too large", count))
            })?;
            CalendarSpan::new(count, series.time_scale()?)?
        }
        PeriodSpec::Auto => {
            return Err(AnomalyError::Unsupported(
                "time_apply requires an explicit period".to_string(),
            ))
        }
    };

    let mut applied = Vec::with_capacity(values.len());
    let mut start = 0;
    for count in span.bucket_counts(series.timestamps()) {
        let bucket = &values[start..start + count];
        let reduced = f(bucket);
        applied.extend(std::iter::repeat(reduced).take(count));
        start += count;
    }

    series.clone().with_column(TIME_APPLY_COLUMN, applied)
}
