#![forbid(unsafe_code)]

//! Domain entities of the colloscope.
//!
//! All entities are plain serializable values; identity-bearing ones
//! carry an [`EntityId`] minted at creation. Names must stay unique
//! among siblings — the edit operations enforce that, not the types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::id::{EntityId, IdGen};
use crate::interval::Interval;
use crate::timeslot::Timeslot;

/// A taught subject (maths, physique, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: EntityId,
    pub name: String,
}

impl Subject {
    #[must_use]
    pub fn new(ids: &IdGen, name: impl Into<String>) -> Self {
        Self {
            id: ids.next_id(),
            name: name.into(),
        }
    }
}

/// A teacher giving colles in exactly one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: EntityId,
    pub name: String,
    /// Subject taught; must resolve within the same snapshot.
    pub subject_id: EntityId,
    /// Weekly slots this teacher can take.
    pub slots: Vec<Timeslot>,
}

impl Teacher {
    #[must_use]
    pub fn new(ids: &IdGen, name: impl Into<String>, subject_id: EntityId) -> Self {
        Self {
            id: ids.next_id(),
            name: name.into(),
            subject_id,
            slots: Vec::new(),
        }
    }
}

/// A group of students.
///
/// The optional `next_group_id` + `duration` pair is one edge of the
/// rotation chain: after `duration` working weeks the group hands its
/// composition over to the target. Edges form a directed graph that is
/// not required to be acyclic; traversals must guard against cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: EntityId,
    pub name: String,
    /// Trio ids currently contained in this group.
    pub trios: Vec<u32>,
    /// Weekly slots the group can attend.
    pub slots: Vec<Timeslot>,
    /// Rotation edge target, or null.
    pub next_group_id: Option<EntityId>,
    /// Working weeks before the hand-off; meaningless without an edge.
    pub duration: Option<u32>,
}

impl Group {
    #[must_use]
    pub fn new(ids: &IdGen, name: impl Into<String>) -> Self {
        Self {
            id: ids.next_id(),
            name: name.into(),
            trios: Vec::new(),
            slots: Vec::new(),
            next_group_id: None,
            duration: None,
        }
    }
}

/// A student triad, derived entirely from group membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trio {
    pub id: u32,
    /// Groups currently containing this trio.
    pub group_ids: Vec<EntityId>,
}

/// A scheduled colle, produced by the solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Colle {
    pub teacher_id: EntityId,
    pub timeslot: Timeslot,
    pub trio_id: u32,
    pub week_id: EntityId,
}

/// One emitted working week.
///
/// `number` is null for weeks inside a numbering interruption; such weeks
/// still host a slot in the sequence but display no number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Week {
    pub id: EntityId,
    pub number: Option<i32>,
    /// Monday of the calendar week.
    pub start: NaiveDate,
}

impl Week {
    /// The full-day interval covered by this week.
    #[must_use]
    pub fn interval(&self) -> Interval {
        let monday = crate::interval::day_start(self.start);
        let next = crate::interval::day_start(
            self.start
                .checked_add_days(chrono::Days::new(7))
                .expect("date out of supported range"),
        );
        Interval::new(monday, next).expect("week span is always forward")
    }
}

/// A solver objective; list order is the priority ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub name: String,
    /// Numeric result reported by the last solver run, if any.
    pub result: Option<f64>,
}

impl Objective {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            result: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn week_interval_spans_seven_days() {
        let ids = IdGen::new();
        let week = Week {
            id: ids.next_id(),
            number: Some(1),
            start: NaiveDate::from_ymd_opt(2023, 9, 4).unwrap(),
        };
        let interval = week.interval();
        assert_eq!(interval.days().count(), 7);
        assert!(interval.contains_day(NaiveDate::from_ymd_opt(2023, 9, 10).unwrap()));
        assert!(!interval.contains_day(NaiveDate::from_ymd_opt(2023, 9, 11).unwrap()));
    }

    #[test]
    fn entities_get_distinct_ids() {
        let ids = IdGen::new();
        let maths = Subject::new(&ids, "maths");
        let physique = Subject::new(&ids, "physique");
        assert_ne!(maths.id, physique.id);
    }
}
