#![forbid(unsafe_code)]

//! School calendar: interruptions, working days and week computation.
//!
//! The calendar owns everything needed to decide which calendar weeks can
//! host colles and how they are numbered. Weeks are derived data,
//! recomputed from the term interval, the interruptions and the holiday
//! lists; see [`Calendar::working_weeks`].
//!
//! # Week computation
//!
//! 1. The term is expanded to full days, then to full Monday-based
//!    calendar weeks; each one-week slice is a candidate.
//! 2. A candidate is kept iff at least one of its days lies inside the
//!    original term AND is a working day with every interruption ignored
//!    by id (weekday and holiday tests only) — interruption coverage is
//!    handled by the flags below, not by dropping days.
//! 3. A kept candidate entirely inside a `groups_rotation` interruption
//!    is dropped from the output; it still consumes a week number unless
//!    it is also inside a `weeks_numbering` interruption.
//! 4. A kept candidate entirely inside a `weeks_numbering` interruption
//!    is emitted with no number and consumes none.
//! 5. Every other kept candidate is emitted with the next number,
//!    starting at `first_week_number`.
//!
//! The two flags are independent: a week can be present-but-unnumbered,
//! absent, or a plain numbered week.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::entities::Week;
use crate::id::{EntityId, IdGen};
use crate::interval::{Interval, day_start, start_of_week};

/// Working days per week when nothing else is configured (Mon–Fri).
pub const DEFAULT_WEEK_LENGTH: u8 = 5;

/// A calendar break with fine-grained scheduling semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interruption {
    pub id: EntityId,
    pub name: String,
    /// Covered span; treated as full days.
    pub interval: Interval,
    /// Weeks inside do not consume week-number increments.
    pub weeks_numbering: bool,
    /// Weeks inside are cut from the working-week sequence entirely, as
    /// if time did not pass for rotation purposes.
    pub groups_rotation: bool,
}

impl Interruption {
    #[must_use]
    pub fn new(ids: &IdGen, name: impl Into<String>, interval: Interval) -> Self {
        Self {
            id: ids.next_id(),
            name: name.into(),
            interval,
            weeks_numbering: false,
            groups_rotation: false,
        }
    }
}

/// Holiday data fetched from the external calendar source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HolidayRefresh {
    pub school_holidays: Vec<Interval>,
    pub public_holidays: Vec<NaiveDate>,
}

/// External calendar data source, keyed by academy.
///
/// Transport and its failure modes belong to the implementor; the core
/// only awaits the results.
#[allow(async_fn_in_trait)]
pub trait HolidayService {
    type Error;

    /// Valid academy identifiers.
    async fn academies(&self) -> Result<Vec<String>, Self::Error>;

    /// School holiday spans for one academy.
    async fn school_holidays(&self, academy: &str) -> Result<Vec<Interval>, Self::Error>;

    /// Public holiday dates for one academy.
    async fn public_holidays(&self, academy: &str) -> Result<Vec<NaiveDate>, Self::Error>;
}

/// The school calendar configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    /// Academy the holiday data is fetched for; none disables fetching.
    pub academy: Option<String>,
    /// School term, treated as full days.
    pub interval: Interval,
    /// Number given to the first numbered week.
    pub first_week_number: i32,
    /// Working days per week, counted from Monday.
    pub week_length: u8,
    pub interruptions: Vec<Interruption>,
    pub school_holidays: Vec<Interval>,
    pub public_holidays: Vec<NaiveDate>,
}

impl Calendar {
    #[must_use]
    pub fn new(interval: Interval, first_week_number: i32) -> Self {
        Self {
            academy: None,
            interval,
            first_week_number,
            week_length: DEFAULT_WEEK_LENGTH,
            interruptions: Vec::new(),
            school_holidays: Vec::new(),
            public_holidays: Vec::new(),
        }
    }

    /// True when `day` can host colles.
    ///
    /// A day works iff its weekday is within the configured week length,
    /// it is not covered by any interruption (except those in `ignored`),
    /// not inside a school holiday, and not a public holiday.
    #[must_use]
    pub fn is_working_day(&self, day: NaiveDate, ignored: &[EntityId]) -> bool {
        if day.weekday().num_days_from_monday() >= u32::from(self.week_length) {
            return false;
        }
        if self
            .interruptions
            .iter()
            .any(|i| !ignored.contains(&i.id) && i.interval.to_full_day().contains_day(day))
        {
            return false;
        }
        if self
            .school_holidays
            .iter()
            .any(|h| h.to_full_day().contains_day(day))
        {
            return false;
        }
        !self.public_holidays.contains(&day)
    }

    /// Derive the ordered working-week sequence (see module docs).
    ///
    /// Every emitted week gets a fresh id; callers that need id
    /// stability across recomputations remap by start date.
    #[must_use]
    pub fn working_weeks(&self, ids: &IdGen) -> Vec<Week> {
        let term = self.interval.to_full_day();
        let every_interruption: Vec<EntityId> =
            self.interruptions.iter().map(|i| i.id).collect();

        let mut weeks = Vec::new();
        let mut number = self.first_week_number;
        let mut monday = start_of_week(term.start().date());

        while day_start(monday) < term.end() {
            let week = week_interval(monday);
            let keeps = week
                .days()
                .any(|day| {
                    self.interval.contains_day(day)
                        && self.is_working_day(day, &every_interruption)
                });
            if keeps {
                let unnumbered = self.flag_covers(&week, |i| i.weeks_numbering);
                if self.flag_covers(&week, |i| i.groups_rotation) {
                    // Cut from the sequence; the calendar still turned.
                    if !unnumbered {
                        number += 1;
                    }
                } else if unnumbered {
                    weeks.push(Week {
                        id: ids.next_id(),
                        number: None,
                        start: monday,
                    });
                } else {
                    weeks.push(Week {
                        id: ids.next_id(),
                        number: Some(number),
                        start: monday,
                    });
                    number += 1;
                }
            }
            monday = monday
                .checked_add_days(Days::new(7))
                .expect("date out of supported range");
        }

        tracing::debug!(weeks = weeks.len(), "recomputed working weeks");
        weeks
    }

    /// Fetch fresh holiday data for this calendar's academy.
    ///
    /// The calendar itself is untouched; the caller applies the refresh
    /// through a store mutation so weeks and holidays change atomically.
    pub async fn fetch_refresh<S: HolidayService>(
        &self,
        service: &S,
    ) -> Result<HolidayRefresh, S::Error> {
        let Some(academy) = self.academy.as_deref() else {
            return Ok(HolidayRefresh::default());
        };
        let school_holidays = service.school_holidays(academy).await?;
        let public_holidays = service.public_holidays(academy).await?;
        Ok(HolidayRefresh {
            school_holidays,
            public_holidays,
        })
    }

    fn flag_covers(&self, week: &Interval, flag: impl Fn(&Interruption) -> bool) -> bool {
        self.interruptions
            .iter()
            .any(|i| flag(i) && i.interval.to_full_day().contains_interval(week))
    }
}

/// Full-day interval of the calendar week starting at `monday`.
fn week_interval(monday: NaiveDate) -> Interval {
    let next = monday
        .checked_add_days(Days::new(7))
        .expect("date out of supported range");
    Interval::new(day_start(monday), day_start(next)).expect("week span is always forward")
}

// ============================================================================
// Tests
// ============================================================================
