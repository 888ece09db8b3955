//! Named time windows used to bucket statistics.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive `{start, end}` date pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateSpan {
    pub fn single(day: NaiveDate) -> Self {
        DateSpan {
            start: day,
            end: day,
        }
    }
}

/// A named range. Identity is the name; the span is either explicit or derived
/// from the name relative to "today".
///
/// Written as a bare name, or as `{name, start, end}` when the span is explicit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawRange", into = "RawRange")]
pub struct StatsRange {
    pub name: String,
    pub span: Option<DateSpan>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawRange {
    Name(String),
    Explicit {
        name: String,
        start: NaiveDate,
        end: NaiveDate,
    },
}

impl From<RawRange> for StatsRange {
    fn from(raw: RawRange) -> Self {
        match raw {
            RawRange::Name(name) => StatsRange::named(name),
            RawRange::Explicit { name, start, end } => StatsRange::between(name, start, end),
        }
    }
}

impl From<StatsRange> for RawRange {
    fn from(range: StatsRange) -> Self {
        match range.span {
            None => RawRange::Name(range.name),
            Some(DateSpan { start, end }) => RawRange::Explicit {
                name: range.name,
                start,
                end,
            },
        }
    }
}

/// How a summaries request selects its days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryWindow {
    Dates(DateSpan),
    Named(String),
}

impl StatsRange {
    pub fn named(name: impl Into<String>) -> Self {
        StatsRange {
            name: name.into(),
            span: None,
        }
    }

    pub fn between(name: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        StatsRange {
            name: name.into(),
            span: Some(DateSpan { start, end }),
        }
    }

    /// Resolves the explicit span, or the span implied by a well-known name.
    /// Unknown names without a span resolve to `None`.
    pub fn resolve_span(&self, today: NaiveDate) -> Option<DateSpan> {
        if let Some(span) = self.span {
            return Some(span);
        }
        let days_back = match self.name.as_str() {
            "today" => 0,
            "yesterday" => return Some(DateSpan::single(today - Duration::days(1))),
            "last_7_days" => 6,
            "last_14_days" => 13,
            "last_30_days" => 29,
            "last_6_months" => 182,
            "last_year" => 364,
            _ => return None,
        };
        Some(DateSpan {
            start: today - Duration::days(days_back),
            end: today,
        })
    }

    /// The window to ask the summaries endpoint for.
    pub fn summary_window(&self, today: NaiveDate) -> SummaryWindow {
        match self.resolve_span(today) {
            Some(span) => SummaryWindow::Dates(span),
            None => SummaryWindow::Named(self.name.clone()),
        }
    }
}
