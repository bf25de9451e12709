//! Scale-to-span lookup template.

use crate::core::{CalendarSpan, TimeScale};
use crate::period::PeriodTarget;
use serde::{Deserialize, Serialize};

/// Default frequency and trend spans for one sampling scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateEntry {
    pub time_scale: TimeScale,
    pub frequency: CalendarSpan,
    pub trend: CalendarSpan,
}

impl TemplateEntry {
    pub fn span(&self, target: PeriodTarget) -> CalendarSpan {
        match target {
            PeriodTarget::Frequency => self.frequency,
            PeriodTarget::Trend => self.trend,
        }
    }
}

/// Mapping from [`TimeScale`] to default `(frequency, trend)` spans used when
/// a period is requested as `auto`.
///
/// The template is passed explicitly to the resolver. `ScaleTemplate::default()`
/// is the process-wide default table:
///
/// | scale   | frequency | trend    |
/// |---------|-----------|----------|
/// | second  | 1 hour    | 12 hours |
/// | minute  | 1 day     | 14 days  |
/// | hour    | 1 day     | 1 month  |
/// | day     | 1 week    | 3 months |
/// | week    | 1 quarter | 1 year   |
/// | month   | 1 year    | 5 years  |
/// | quarter | 1 year    | 10 years |
/// | year    | 5 years   | 30 years |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleTemplate {
    entries: Vec<TemplateEntry>,
}

const fn entry(
    time_scale: TimeScale,
    frequency: (u32, TimeScale),
    trend: (u32, TimeScale),
) -> TemplateEntry {
    TemplateEntry {
        time_scale,
        frequency: CalendarSpan::from_parts(frequency.0, frequency.1),
        trend: CalendarSpan::from_parts(trend.0, trend.1),
    }
}

const DEFAULT_ENTRIES: [TemplateEntry; 8] = [
    entry(TimeScale::Second, (1, TimeScale::Hour), (12, TimeScale::Hour)),
    entry(TimeScale::Minute, (1, TimeScale::Day), (14, TimeScale::Day)),
    entry(TimeScale::Hour, (1, TimeScale::Day), (1, TimeScale::Month)),
    entry(TimeScale::Day, (1, TimeScale::Week), (3, TimeScale::Month)),
    entry(TimeScale::Week, (1, TimeScale::Quarter), (1, TimeScale::Year)),
    entry(TimeScale::Month, (1, TimeScale::Year), (5, TimeScale::Year)),
    entry(TimeScale::Quarter, (1, TimeScale::Year), (10, TimeScale::Year)),
    entry(TimeScale::Year, (5, TimeScale::Year), (30, TimeScale::Year)),
];

impl Default for ScaleTemplate {
    fn default() -> Self {
        Self {
            entries: DEFAULT_ENTRIES.to_vec(),
        }
    }
}

impl ScaleTemplate {
    /// A template with no entries.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[TemplateEntry] {
        &self.entries
    }

    pub fn entry(&self, scale: TimeScale) -> Option<&TemplateEntry> {
        self.entries.iter().find(|e| e.time_scale == scale)
    }

    /// Set the spans for a scale, replacing any existing entry.
    pub fn with_entry(mut self, scale: TimeScale, frequency: CalendarSpan, trend: CalendarSpan) -> Self {
        let new_entry = TemplateEntry {
            time_scale: scale,
            frequency,
            trend,
        };
        match self.entries.iter_mut().find(|e| e.time_scale == scale) {
            Some(existing) => *existing = new_entry,
            None => {
                self.entries.push(new_entry);
                self.entries.sort_by_key(|e| e.time_scale);
            }
        }
        self
    }

    /// Span configured for `scale`.
    pub fn span(&self, scale: TimeScale, target: PeriodTarget) -> Option<CalendarSpan> {
        self.entry(scale).map(|e| e.span(target))
    }

    /// Span of the adjacent finer scale, used when the data cannot support
    /// the primary span.
    pub fn fallback_span(&self, scale: TimeScale, target: PeriodTarget) -> Option<CalendarSpan> {
        scale.finer().and_then(|finer| self.span(finer, target))
    }
}
