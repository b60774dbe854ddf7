#![forbid(unsafe_code)]

//! Half-open date-time intervals and full-day normalization.
//!
//! Calendar arithmetic runs on [`Interval`], a `[start, end)` pair of
//! naive date-times. Most calendar data (term, interruptions, school
//! holidays) is full-day: both endpoints at midnight. [`to_full_day`]
//! normalizes an arbitrary interval to that shape without ever extending
//! an interval that already ends exactly on a day boundary.
//!
//! The serialized full-day form is `"<start>/<end-inclusive>"` with both
//! dates shown, and a `"<start>/P<n>W<n>D"` duration form is accepted on
//! input. Parse failures carry a caller-supplied context message, in the
//! spirit of a syntax error raised at the use site.
//!
//! [`to_full_day`]: Interval::to_full_day

use std::fmt;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Midnight of `day`.
#[must_use]
pub fn day_start(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN)
}

/// The day after `day`; dates near the chrono range limit are out of
/// this system's domain.
#[must_use]
pub fn next_day(day: NaiveDate) -> NaiveDate {
    day.succ_opt().expect("date out of supported range")
}

/// The Monday of `day`'s calendar week.
#[must_use]
pub fn start_of_week(day: NaiveDate) -> NaiveDate {
    day.checked_sub_days(Days::new(u64::from(day.weekday().num_days_from_monday())))
        .expect("date out of supported range")
}

/// A half-open `[start, end)` time span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

/// Construction rejected: `end` preceded `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("interval end {end} precedes start {start}")]
pub struct InvalidInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Parse failure for the textual full-day forms.
///
/// `context` is supplied by the caller and names what was being read;
/// `detail` says what was wrong with the text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{context}: {detail}")]
pub struct IntervalParseError {
    pub context: String,
    pub detail: String,
}

impl IntervalParseError {
    fn new(context: &str, detail: impl Into<String>) -> Self {
        Self {
            context: context.to_string(),
            detail: detail.into(),
        }
    }
}

impl Interval {
    /// Build `[start, end)`; fails when `end < start`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, InvalidInterval> {
        if end < start {
            return Err(InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// Full-day interval covering `first..=last`.
    pub fn from_day_span(first: NaiveDate, last: NaiveDate) -> Result<Self, InvalidInterval> {
        Self::new(day_start(first), day_start(next_day(last)))
    }

    /// Full-day interval covering exactly one day.
    #[must_use]
    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day_start(day),
            end: day_start(next_day(day)),
        }
    }

    #[must_use]
    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// True when the interval covers no time at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Snap to whole days: start at midnight of its day, end at midnight
    /// of the day after its last covered day. An end already at midnight
    /// is a day boundary and is left untouched rather than extended.
    #[must_use]
    pub fn to_full_day(&self) -> Self {
        let start = day_start(self.start.date());
        let end = if self.end.time() == NaiveTime::MIN {
            self.end
        } else {
            day_start(next_day(self.end.date()))
        };
        Self { start, end }
    }

    /// True when both endpoints are at midnight.
    #[must_use]
    pub fn is_full_day(&self) -> bool {
        self.start.time() == NaiveTime::MIN && self.end.time() == NaiveTime::MIN
    }

    /// True when `instant` lies inside `[start, end)`.
    #[must_use]
    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant < self.end
    }

    /// True when any part of `day` lies inside the interval.
    #[must_use]
    pub fn contains_day(&self, day: NaiveDate) -> bool {
        !self.is_empty() && day_start(day) < self.end && self.start < day_start(next_day(day))
    }

    /// True when `other` lies entirely inside this interval.
    #[must_use]
    pub fn contains_interval(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// True when the two intervals share any time.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The dates with at least partial coverage, in order.
    #[must_use]
    pub fn days(self) -> impl Iterator<Item = NaiveDate> {
        self.start
            .date()
            .iter_days()
            .take_while(move |day| self.contains_day(*day))
    }

    /// Serialize as `"<start-date>/<end-date-inclusive>"`.
    ///
    /// Only meaningful for non-empty intervals; normalizes to full days
    /// first.
    #[must_use]
    pub fn to_full_day_iso(&self) -> String {
        let full = self.to_full_day();
        let last = full
            .end
            .date()
            .pred_opt()
            .expect("date out of supported range");
        format!("{}/{}", full.start.date(), last)
    }

    /// Parse the `"<start>/<end-inclusive>"` or `"<start>/P<n>W<n>D"`
    /// forms. `context` names what is being read and prefixes any error.
    pub fn from_full_day_iso(text: &str, context: &str) -> Result<Self, IntervalParseError> {
        let Some((start_text, end_text)) = text.split_once('/') else {
            return Err(IntervalParseError::new(
                context,
                format!("`{text}` is missing the `/` separator"),
            ));
        };
        let start: NaiveDate = start_text.parse().map_err(|_| {
            IntervalParseError::new(context, format!("`{start_text}` is not a date"))
        })?;

        let end = if end_text.starts_with('P') {
            let days = parse_day_span(end_text).ok_or_else(|| {
                IntervalParseError::new(context, format!("`{end_text}` is not a day/week duration"))
            })?;
            start
                .checked_add_days(Days::new(days))
                .ok_or_else(|| IntervalParseError::new(context, "duration overflows the calendar"))?
        } else {
            let last: NaiveDate = end_text.parse().map_err(|_| {
                IntervalParseError::new(context, format!("`{end_text}` is not a date"))
            })?;
            if last < start {
                return Err(IntervalParseError::new(
                    context,
                    format!("end {last} precedes start {start}"),
                ));
            }
            next_day(last)
        };

        Ok(Self {
            start: day_start(start),
            end: day_start(end),
        })
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Total days of an ISO-8601 duration restricted to weeks and days
/// (`P8W2D`, `P14D`, `P1W`). Returns `None` on anything else.
fn parse_day_span(text: &str) -> Option<u64> {
    let mut rest = text.strip_prefix('P')?;
    if rest.is_empty() {
        return None;
    }
    let mut days: u64 = 0;
    let mut seen_day = false;
    while !rest.is_empty() {
        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        if digits == 0 {
            return None;
        }
        let amount: u64 = rest[..digits].parse().ok()?;
        match rest.as_bytes().get(digits) {
            Some(b'W') if !seen_day => days = days.checked_add(amount.checked_mul(7)?)?,
            Some(b'D') if !seen_day => {
                days = days.checked_add(amount)?;
                seen_day = true;
            }
            _ => return None,
        }
        rest = &rest[digits + 1..];
    }
    Some(days)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn new_rejects_reversed_endpoints() {
        assert!(Interval::new(at(2023, 9, 2, 0, 0), at(2023, 9, 1, 0, 0)).is_err());
    }

    #[test]
    fn to_full_day_rounds_outward() {
        let interval = Interval::new(at(2023, 9, 2, 10, 30), at(2023, 9, 4, 15, 0)).unwrap();
        let full = interval.to_full_day();
        assert_eq!(full.start(), at(2023, 9, 2, 0, 0));
        assert_eq!(full.end(), at(2023, 9, 5, 0, 0));
    }

    #[test]
    fn to_full_day_keeps_midnight_end() {
        let interval = Interval::new(at(2023, 9, 2, 10, 30), at(2023, 9, 4, 0, 0)).unwrap();
        let full = interval.to_full_day();
        assert_eq!(full.end(), at(2023, 9, 4, 0, 0));
    }

    #[test]
    fn to_full_day_is_idempotent() {
        let interval = Interval::new(at(2023, 9, 2, 10, 30), at(2023, 9, 4, 15, 0)).unwrap();
        let once = interval.to_full_day();
        assert_eq!(once.to_full_day(), once);
    }

    #[test]
    fn contains_day_respects_partial_coverage() {
        let interval = Interval::new(at(2023, 9, 2, 22, 0), at(2023, 9, 3, 1, 0)).unwrap();
        assert!(interval.contains_day(date(2023, 9, 2)));
        assert!(interval.contains_day(date(2023, 9, 3)));
        assert!(!interval.contains_day(date(2023, 9, 4)));
    }

    #[test]
    fn empty_interval_contains_nothing() {
        let interval = Interval::new(at(2023, 9, 2, 10, 0), at(2023, 9, 2, 10, 0)).unwrap();
        assert!(interval.is_empty());
        assert!(!interval.contains_day(date(2023, 9, 2)));
        assert!(!interval.contains(at(2023, 9, 2, 10, 0)));
        assert_eq!(interval.days().count(), 0);
    }

    #[test]
    fn days_iterates_covered_dates() {
        let interval = Interval::from_day_span(date(2023, 9, 2), date(2023, 9, 4)).unwrap();
        let days: Vec<_> = interval.days().collect();
        assert_eq!(
            days,
            vec![date(2023, 9, 2), date(2023, 9, 3), date(2023, 9, 4)]
        );
    }

    #[test]
    fn iso_round_trip_explicit_end() {
        let interval = Interval::from_day_span(date(2023, 9, 2), date(2023, 10, 29)).unwrap();
        let text = interval.to_full_day_iso();
        assert_eq!(text, "2023-09-02/2023-10-29");
        let back = Interval::from_full_day_iso(&text, "term").unwrap();
        assert_eq!(back, interval);
    }

    #[test]
    fn iso_duration_form() {
        let interval = Interval::from_full_day_iso("2023-09-02/P8W2D", "term").unwrap();
        assert_eq!(interval.start(), at(2023, 9, 2, 0, 0));
        assert_eq!(interval.end(), at(2023, 10, 30, 0, 0));

        let week = Interval::from_full_day_iso("2023-10-16/P1W", "break").unwrap();
        assert_eq!(week.end(), at(2023, 10, 23, 0, 0));
    }

    #[test]
    fn parse_errors_carry_the_context_message() {
        let err = Interval::from_full_day_iso("2023-09-02", "term of year 2023").unwrap_err();
        assert!(err.to_string().starts_with("term of year 2023: "));

        let err = Interval::from_full_day_iso("not-a-date/2023-10-29", "term").unwrap_err();
        assert!(err.to_string().contains("not-a-date"));

        let err = Interval::from_full_day_iso("2023-09-02/P8X", "term").unwrap_err();
        assert!(err.to_string().contains("P8X"));

        let err = Interval::from_full_day_iso("2023-09-02/2023-08-01", "term").unwrap_err();
        assert!(err.to_string().contains("precedes"));
    }

    #[test]
    fn start_of_week_snaps_to_monday() {
        assert_eq!(start_of_week(date(2023, 9, 2)), date(2023, 8, 28));
        assert_eq!(start_of_week(date(2023, 8, 28)), date(2023, 8, 28));
    }
}
