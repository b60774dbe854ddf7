#![forbid(unsafe_code)]

//! The root state snapshot and its read-only queries.
//!
//! [`State`] is the single tree the store versions. Consumers hold
//! `Arc<State>` snapshots and never mutate them; every edit goes through
//! the draft operations in [`crate::ops`].
//!
//! Collections are small; queries are linear scans by design.
//!
//! # Invariants
//!
//! Every cross reference (`subject_id`, `teacher_id`, `next_group_id`,
//! `trio_id`, `week_id`) resolves within the same snapshot or is null.
//! The `require_*` queries lean on that: a dangling id there is a
//! programming defect and panics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::calendar::{Calendar, Interruption};
use crate::entities::{Colle, Group, Objective, Subject, Teacher, Trio, Week};
use crate::id::EntityId;
use crate::timeslot::LunchRange;

/// Root snapshot of the whole colloscope configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub calendar: Calendar,
    pub groups: Vec<Group>,
    pub subjects: Vec<Subject>,
    pub teachers: Vec<Teacher>,
    pub colles: Vec<Colle>,
    pub trios: Vec<Trio>,
    pub weeks: Vec<Week>,
    /// Priority-ordered: earlier objectives dominate later ones.
    pub objectives: Vec<Objective>,
    pub lunch: LunchRange,
    /// Subjects that must not land in the same week for one trio;
    /// empty means no such constraint.
    pub forbidden_subject_ids: Vec<EntityId>,
}

impl State {
    /// Fresh state around a calendar, everything else empty.
    #[must_use]
    pub fn new(calendar: Calendar) -> Self {
        Self {
            calendar,
            groups: Vec::new(),
            subjects: Vec::new(),
            teachers: Vec::new(),
            colles: Vec::new(),
            trios: Vec::new(),
            weeks: Vec::new(),
            objectives: Vec::new(),
            lunch: LunchRange::default(),
            forbidden_subject_ids: Vec::new(),
        }
    }

    // ========================================================================
    // Id lookups
    // ========================================================================

    #[must_use]
    pub fn subject(&self, id: EntityId) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.id == id)
    }

    #[must_use]
    pub fn teacher(&self, id: EntityId) -> Option<&Teacher> {
        self.teachers.iter().find(|t| t.id == id)
    }

    #[must_use]
    pub fn group(&self, id: EntityId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    #[must_use]
    pub fn week(&self, id: EntityId) -> Option<&Week> {
        self.weeks.iter().find(|w| w.id == id)
    }

    #[must_use]
    pub fn trio(&self, id: u32) -> Option<&Trio> {
        self.trios.iter().find(|t| t.id == id)
    }

    #[must_use]
    pub fn interruption(&self, id: EntityId) -> Option<&Interruption> {
        self.calendar.interruptions.iter().find(|i| i.id == id)
    }

    /// Like [`subject`](Self::subject) for references that must resolve.
    ///
    /// # Panics
    ///
    /// Panics on a dangling id: the snapshot invariant is broken.
    #[must_use]
    pub fn require_subject(&self, id: EntityId) -> &Subject {
        self.subject(id)
            .unwrap_or_else(|| panic!("dangling subject id {id}"))
    }

    /// See [`require_subject`](Self::require_subject).
    #[must_use]
    pub fn require_teacher(&self, id: EntityId) -> &Teacher {
        self.teacher(id)
            .unwrap_or_else(|| panic!("dangling teacher id {id}"))
    }

    /// See [`require_subject`](Self::require_subject).
    #[must_use]
    pub fn require_group(&self, id: EntityId) -> &Group {
        self.group(id)
            .unwrap_or_else(|| panic!("dangling group id {id}"))
    }

    /// See [`require_subject`](Self::require_subject).
    #[must_use]
    pub fn require_week(&self, id: EntityId) -> &Week {
        self.week(id)
            .unwrap_or_else(|| panic!("dangling week id {id}"))
    }

    // ========================================================================
    // Name lookups
    // ========================================================================

    #[must_use]
    pub fn subject_by_name(&self, name: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.name == name)
    }

    #[must_use]
    pub fn teacher_by_name(&self, name: &str) -> Option<&Teacher> {
        self.teachers.iter().find(|t| t.name == name)
    }

    #[must_use]
    pub fn group_by_name(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    #[must_use]
    pub fn interruption_by_name(&self, name: &str) -> Option<&Interruption> {
        self.calendar.interruptions.iter().find(|i| i.name == name)
    }

    #[must_use]
    pub fn objective_by_name(&self, name: &str) -> Option<&Objective> {
        self.objectives.iter().find(|o| o.name == name)
    }

    // ========================================================================
    // Rotation chain
    // ========================================================================

    /// Walk the rotation chain from `start`, the starting group included.
    ///
    /// The edge graph is not required to be acyclic; the walk stops right
    /// before revisiting a group, so it terminates on every input.
    pub fn rotation_chain(&self, start: EntityId) -> RotationChain<'_> {
        RotationChain {
            state: self,
            next: Some(start),
            visited: Vec::new(),
        }
    }
}

/// Iterator over [`State::rotation_chain`].
#[derive(Debug)]
pub struct RotationChain<'a> {
    state: &'a State,
    next: Option<EntityId>,
    visited: Vec<EntityId>,
}

impl<'a> Iterator for RotationChain<'a> {
    type Item = &'a Group;

    fn next(&mut self) -> Option<&'a Group> {
        let id = self.next.take()?;
        if self.visited.contains(&id) {
            return None;
        }
        self.visited.push(id);
        let group = self.state.require_group(id);
        self.next = group.next_group_id;
        Some(group)
    }
}

/// Recompute the trio collection from group membership.
///
/// A trio exists iff some group contains it; its `group_ids` lists those
/// groups in state order. Output is ordered by trio id.
#[must_use]
pub fn derive_trios(groups: &[Group]) -> Vec<Trio> {
    let mut by_id: BTreeMap<u32, Vec<EntityId>> = BTreeMap::new();
    for group in groups {
        for trio in &group.trios {
            let members = by_id.entry(*trio).or_default();
            if !members.contains(&group.id) {
                members.push(group.id);
            }
        }
    }
    by_id
        .into_iter()
        .map(|(id, group_ids)| Trio { id, group_ids })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::IdGen;
    use crate::interval::Interval;
    use chrono::NaiveDate;

    fn base_state(ids: &IdGen) -> State {
        let term = Interval::from_day_span(
            NaiveDate::from_ymd_opt(2023, 9, 4).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
        )
        .unwrap();
        let mut state = State::new(Calendar::new(term, 1));
        state.subjects.push(Subject::new(ids, "maths"));
        state
    }

    #[test]
    fn find_by_id_and_name() {
        let ids = IdGen::new();
        let state = base_state(&ids);
        let id = state.subjects[0].id;
        assert_eq!(state.subject(id).unwrap().name, "maths");
        assert_eq!(state.subject_by_name("maths").unwrap().id, id);
        assert!(state.subject(EntityId::from_raw(9999)).is_none());
        assert!(state.subject_by_name("physique").is_none());
    }

    #[test]
    #[should_panic(expected = "dangling subject id")]
    fn require_panics_on_dangling_id() {
        let ids = IdGen::new();
        let state = base_state(&ids);
        let _ = state.require_subject(EntityId::from_raw(9999));
    }

    #[test]
    fn derive_trios_collects_membership() {
        let ids = IdGen::new();
        let mut g1 = Group::new(&ids, "G1");
        g1.trios = vec![1, 2];
        let mut g2 = Group::new(&ids, "G2");
        g2.trios = vec![2, 3];

        let trios = derive_trios(&[g1.clone(), g2.clone()]);
        assert_eq!(trios.len(), 3);
        assert_eq!(trios[0].id, 1);
        assert_eq!(trios[0].group_ids, vec![g1.id]);
        assert_eq!(trios[1].group_ids, vec![g1.id, g2.id]);
        assert_eq!(trios[2].group_ids, vec![g2.id]);
    }

    #[test]
    fn rotation_chain_follows_edges() {
        let ids = IdGen::new();
        let mut state = base_state(&ids);
        let mut a = Group::new(&ids, "A");
        let mut b = Group::new(&ids, "B");
        let c = Group::new(&ids, "C");
        a.next_group_id = Some(b.id);
        b.next_group_id = Some(c.id);
        let start = a.id;
        state.groups = vec![a, b, c];

        let names: Vec<_> = state.rotation_chain(start).map(|g| g.name.clone()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn rotation_chain_stops_on_cycles() {
        let ids = IdGen::new();
        let mut state = base_state(&ids);
        let mut a = Group::new(&ids, "A");
        let mut b = Group::new(&ids, "B");
        a.next_group_id = Some(b.id);
        b.next_group_id = Some(a.id);
        let start = a.id;
        state.groups = vec![a, b];

        let names: Vec<_> = state.rotation_chain(start).map(|g| g.name.clone()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }
}
