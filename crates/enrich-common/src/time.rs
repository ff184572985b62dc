//! Collection date parsing and provider availability windows.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Accepted collection-date layouts, tried in order. The first that parses wins.
///
/// Plain dates come first, then datetimes with a literal `Z`, then naive ISO
/// datetimes. RFC 3339 with an explicit offset is tried after these.
pub const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%MZ",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d",
    "%m/%d/%Y",
];

/// Parse a collection date string into a calendar date.
///
/// Returns `None` when no accepted layout matches; never panics.
pub fn parse_collection_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for (i, fmt) in DATE_FORMATS.iter().enumerate() {
        if fmt.contains("%H") {
            if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(ndt.date());
            }
        } else if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }

        // RFC 3339 slots in after the naive ISO layouts.
        if i == 4 {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.date_naive());
            }
        }
    }

    None
}

/// Upper bound of a provider's temporal coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowEnd {
    /// Coverage extends to today.
    Today,
    /// Coverage ends a fixed number of days before today (publication lag).
    DaysAgo(u32),
    /// Coverage ends on a fixed date.
    Fixed(NaiveDate),
    /// No upper bound (static datasets).
    Open,
}

/// The date range in which a provider can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub start: Option<NaiveDate>,
    pub end: WindowEnd,
}

impl AvailabilityWindow {
    /// Window from `start` up to today.
    pub fn since(start: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: WindowEnd::Today,
        }
    }

    /// Window for static datasets that answer for any date.
    pub fn always() -> Self {
        Self {
            start: None,
            end: WindowEnd::Open,
        }
    }

    /// Replace the upper bound.
    pub fn until(mut self, end: WindowEnd) -> Self {
        self.end = end;
        self
    }

    /// Whether `date` falls inside the window, evaluated against `today`.
    pub fn contains_on(&self, date: NaiveDate, today: NaiveDate) -> bool {
        if let Some(start) = self.start {
            if date < start {
                return false;
            }
        }
        match self.end {
            WindowEnd::Today => date <= today,
            WindowEnd::DaysAgo(days) => date <= today - Duration::days(days as i64),
            WindowEnd::Fixed(end) => date <= end,
            WindowEnd::Open => true,
        }
    }

    /// Whether `date` falls inside the window as of the current UTC date.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.contains_on(date, Utc::now().date_naive())
    }
}
