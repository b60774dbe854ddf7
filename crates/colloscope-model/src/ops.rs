#![forbid(unsafe_code)]

//! Undoable edit operations over the state tree.
//!
//! Every operation takes the pre-mutation snapshot for reads and the
//! store's [`Draft`] for writes, so it runs inside
//! [`Store::mutate`](colloscope_state::Store::mutate) (usually through
//! the undo stack). Operations validate against the snapshot *before*
//! recording any edit: a rejected operation leaves the draft untouched
//! and the commit becomes a no-op.
//!
//! Reads come from the snapshot, so an operation sees the state as it
//! was when the mutation started. Run one operation per commit; compose
//! several with the undo stack's grouping instead of calling them
//! back-to-back in one producer.
//!
//! Cascades keep the cross-reference invariant: removing a teacher drops
//! its colles, removing a group nulls inbound rotation edges and
//! recomputes trios, recomputing weeks prunes colles whose week vanished.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;

use colloscope_state::{Draft, Path};

use crate::calendar::{Calendar, HolidayRefresh, Interruption};
use crate::entities::{Colle, Group, Objective, Subject, Teacher, Trio, Week};
use crate::id::{EntityId, IdGen};
use crate::interval::Interval;
use crate::state::{State, derive_trios};
use crate::timeslot::{LunchRange, Timeslot};

/// Paths of the state tree's fixed nodes.
pub mod paths {
    use colloscope_state::Path;

    pub fn calendar() -> Path {
        Path::root().key("calendar")
    }
    pub fn academy() -> Path {
        calendar().key("academy")
    }
    pub fn term() -> Path {
        calendar().key("interval")
    }
    pub fn first_week_number() -> Path {
        calendar().key("first_week_number")
    }
    pub fn week_length() -> Path {
        calendar().key("week_length")
    }
    pub fn interruptions() -> Path {
        calendar().key("interruptions")
    }
    pub fn interruption(index: usize) -> Path {
        interruptions().index(index)
    }
    pub fn school_holidays() -> Path {
        calendar().key("school_holidays")
    }
    pub fn public_holidays() -> Path {
        calendar().key("public_holidays")
    }
    pub fn subjects() -> Path {
        Path::root().key("subjects")
    }
    pub fn subject(index: usize) -> Path {
        subjects().index(index)
    }
    pub fn teachers() -> Path {
        Path::root().key("teachers")
    }
    pub fn teacher(index: usize) -> Path {
        teachers().index(index)
    }
    pub fn groups() -> Path {
        Path::root().key("groups")
    }
    pub fn group(index: usize) -> Path {
        groups().index(index)
    }
    pub fn colles() -> Path {
        Path::root().key("colles")
    }
    pub fn trios() -> Path {
        Path::root().key("trios")
    }
    pub fn weeks() -> Path {
        Path::root().key("weeks")
    }
    pub fn objectives() -> Path {
        Path::root().key("objectives")
    }
    pub fn objective(index: usize) -> Path {
        objectives().index(index)
    }
    pub fn lunch() -> Path {
        Path::root().key("lunch")
    }
    pub fn forbidden_subject_ids() -> Path {
        Path::root().key("forbidden_subject_ids")
    }
}

/// Rejection reasons; a rejected operation records no edit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("name `{0}` is already taken")]
    DuplicateName(String),
    #[error("unknown subject id {0}")]
    UnknownSubject(EntityId),
    #[error("unknown teacher id {0}")]
    UnknownTeacher(EntityId),
    #[error("unknown group id {0}")]
    UnknownGroup(EntityId),
    #[error("unknown interruption id {0}")]
    UnknownInterruption(EntityId),
    #[error("unknown trio id {0}")]
    UnknownTrio(u32),
    #[error("unknown week id {0}")]
    UnknownWeek(EntityId),
    #[error("unknown objective `{0}`")]
    UnknownObjective(String),
}

fn value<T: Serialize>(entity: &T) -> Value {
    serde_json::to_value(entity).expect("entity serializes to a value tree")
}

fn read<T: DeserializeOwned>(draft: &Draft<'_>, path: &Path) -> T {
    let node = draft
        .get(path)
        .cloned()
        .unwrap_or_else(|| panic!("missing state node at {path}"));
    serde_json::from_value(node)
        .unwrap_or_else(|err| panic!("state node at {path} does not deserialize: {err}"))
}

// ============================================================================
// Subjects
// ============================================================================

/// Outcome descriptor of [`remove_subject`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveSubjectOutcome {
    /// Teachers referencing the subject were removed with it.
    pub had_associated_teachers: bool,
    /// The subject was part of the forbidden combination, which was
    /// cleared entirely.
    pub was_in_forbidden_combination: bool,
}

pub fn add_subject(
    state: &State,
    draft: &mut Draft<'_>,
    subject: Subject,
) -> Result<(), EditError> {
    if state.subject_by_name(&subject.name).is_some() {
        return Err(EditError::DuplicateName(subject.name));
    }
    draft.push(paths::subjects(), value(&subject));
    Ok(())
}

pub fn rename_subject(
    state: &State,
    draft: &mut Draft<'_>,
    id: EntityId,
    name: &str,
) -> Result<(), EditError> {
    let index = state
        .subjects
        .iter()
        .position(|s| s.id == id)
        .ok_or(EditError::UnknownSubject(id))?;
    if state.subject_by_name(name).is_some_and(|s| s.id != id) {
        return Err(EditError::DuplicateName(name.to_string()));
    }
    draft.set(paths::subject(index).key("name"), json!(name));
    Ok(())
}

/// Remove a subject, cascading teachers that reference it (and their
/// colles) and clearing the forbidden combination when the subject was a
/// member. A subject that is not present is a silent no-op.
pub fn remove_subject(state: &State, draft: &mut Draft<'_>, id: EntityId) -> RemoveSubjectOutcome {
    let Some(index) = state.subjects.iter().position(|s| s.id == id) else {
        return RemoveSubjectOutcome::default();
    };

    let removed_teachers: HashSet<EntityId> = state
        .teachers
        .iter()
        .filter(|t| t.subject_id == id)
        .map(|t| t.id)
        .collect();

    for (i, colle) in state.colles.iter().enumerate().rev() {
        if removed_teachers.contains(&colle.teacher_id) {
            draft.remove(paths::colles().index(i));
        }
    }
    for (i, teacher) in state.teachers.iter().enumerate().rev() {
        if teacher.subject_id == id {
            draft.remove(paths::teacher(i));
        }
    }
    draft.remove(paths::subject(index));

    let was_in_forbidden_combination = state.forbidden_subject_ids.contains(&id);
    if was_in_forbidden_combination {
        draft.set(paths::forbidden_subject_ids(), json!([]));
    }

    tracing::debug!(
        subject = %id,
        teachers = removed_teachers.len(),
        "removed subject"
    );
    RemoveSubjectOutcome {
        had_associated_teachers: !removed_teachers.is_empty(),
        was_in_forbidden_combination,
    }
}

// ============================================================================
// Teachers
// ============================================================================

pub fn add_teacher(
    state: &State,
    draft: &mut Draft<'_>,
    teacher: Teacher,
) -> Result<(), EditError> {
    if state.teacher_by_name(&teacher.name).is_some() {
        return Err(EditError::DuplicateName(teacher.name));
    }
    if state.subject(teacher.subject_id).is_none() {
        return Err(EditError::UnknownSubject(teacher.subject_id));
    }
    draft.push(paths::teachers(), value(&teacher));
    Ok(())
}

pub fn rename_teacher(
    state: &State,
    draft: &mut Draft<'_>,
    id: EntityId,
    name: &str,
) -> Result<(), EditError> {
    let index = teacher_index(state, id)?;
    if state.teacher_by_name(name).is_some_and(|t| t.id != id) {
        return Err(EditError::DuplicateName(name.to_string()));
    }
    draft.set(paths::teacher(index).key("name"), json!(name));
    Ok(())
}

pub fn set_teacher_slots(
    state: &State,
    draft: &mut Draft<'_>,
    id: EntityId,
    slots: Vec<Timeslot>,
) -> Result<(), EditError> {
    let index = teacher_index(state, id)?;
    draft.set(paths::teacher(index).key("slots"), value(&slots));
    Ok(())
}

/// Remove a teacher and the colles scheduled with them. Returns whether
/// the teacher was present.
pub fn remove_teacher(state: &State, draft: &mut Draft<'_>, id: EntityId) -> bool {
    let Some(index) = state.teachers.iter().position(|t| t.id == id) else {
        return false;
    };
    for (i, colle) in state.colles.iter().enumerate().rev() {
        if colle.teacher_id == id {
            draft.remove(paths::colles().index(i));
        }
    }
    draft.remove(paths::teacher(index));
    true
}

fn teacher_index(state: &State, id: EntityId) -> Result<usize, EditError> {
    state
        .teachers
        .iter()
        .position(|t| t.id == id)
        .ok_or(EditError::UnknownTeacher(id))
}

// ============================================================================
// Groups
// ============================================================================

pub fn add_group(state: &State, draft: &mut Draft<'_>, group: Group) -> Result<(), EditError> {
    if state.group_by_name(&group.name).is_some() {
        return Err(EditError::DuplicateName(group.name));
    }
    if let Some(next) = group.next_group_id {
        if state.group(next).is_none() {
            return Err(EditError::UnknownGroup(next));
        }
    }
    let trios = {
        let mut with = state.groups.to_vec();
        with.push(group.clone());
        derive_trios(&with)
    };
    draft.push(paths::groups(), value(&group));
    set_trios_and_prune(draft, trios);
    Ok(())
}

pub fn rename_group(
    state: &State,
    draft: &mut Draft<'_>,
    id: EntityId,
    name: &str,
) -> Result<(), EditError> {
    let index = group_index(state, id)?;
    if state.group_by_name(name).is_some_and(|g| g.id != id) {
        return Err(EditError::DuplicateName(name.to_string()));
    }
    draft.set(paths::group(index).key("name"), json!(name));
    Ok(())
}

pub fn set_group_slots(
    state: &State,
    draft: &mut Draft<'_>,
    id: EntityId,
    slots: Vec<Timeslot>,
) -> Result<(), EditError> {
    let index = group_index(state, id)?;
    draft.set(paths::group(index).key("slots"), value(&slots));
    Ok(())
}

/// Replace a group's trio membership and recompute the derived trio
/// collection.
pub fn set_group_trios(
    state: &State,
    draft: &mut Draft<'_>,
    id: EntityId,
    trios: Vec<u32>,
) -> Result<(), EditError> {
    let index = group_index(state, id)?;
    let mut membership = trios;
    membership.dedup();
    draft.set(paths::group(index).key("trios"), value(&membership));

    let derived = {
        let mut updated = state.groups.to_vec();
        updated[index].trios = membership;
        derive_trios(&updated)
    };
    set_trios_and_prune(draft, derived);
    Ok(())
}

/// Point the group's rotation edge at `next` (or clear it).
///
/// Only the target's existence is checked; the edge graph may contain
/// cycles, and traversals guard against them.
pub fn set_group_rotation(
    state: &State,
    draft: &mut Draft<'_>,
    id: EntityId,
    next: Option<EntityId>,
    duration: Option<u32>,
) -> Result<(), EditError> {
    let index = group_index(state, id)?;
    if let Some(next_id) = next {
        if state.group(next_id).is_none() {
            return Err(EditError::UnknownGroup(next_id));
        }
    }
    draft.set(paths::group(index).key("next_group_id"), value(&next));
    draft.set(paths::group(index).key("duration"), value(&duration));
    Ok(())
}

/// Remove a group: inbound rotation edges are nulled, trios recomputed,
/// colles of vanished trios pruned. Returns whether the group was
/// present.
pub fn remove_group(state: &State, draft: &mut Draft<'_>, id: EntityId) -> bool {
    let Some(index) = state.groups.iter().position(|g| g.id == id) else {
        return false;
    };

    // Null inbound edges first; these indices predate the removal.
    for (i, group) in state.groups.iter().enumerate() {
        if group.next_group_id == Some(id) {
            draft.set(paths::group(i).key("next_group_id"), Value::Null);
            draft.set(paths::group(i).key("duration"), Value::Null);
        }
    }
    draft.remove(paths::group(index));

    let remaining: Vec<Group> = state
        .groups
        .iter()
        .filter(|g| g.id != id)
        .cloned()
        .collect();
    set_trios_and_prune(draft, derive_trios(&remaining));
    true
}

fn group_index(state: &State, id: EntityId) -> Result<usize, EditError> {
    state
        .groups
        .iter()
        .position(|g| g.id == id)
        .ok_or(EditError::UnknownGroup(id))
}

fn set_trios_and_prune(draft: &mut Draft<'_>, trios: Vec<Trio>) {
    let keep: HashSet<u32> = trios.iter().map(|t| t.id).collect();
    draft.set(paths::trios(), value(&trios));
    let colles: Vec<Colle> = read(draft, &paths::colles());
    for (i, colle) in colles.iter().enumerate().rev() {
        if !keep.contains(&colle.trio_id) {
            draft.remove(paths::colles().index(i));
        }
    }
}

// ============================================================================
// Calendar & interruptions
// ============================================================================

pub fn set_academy(draft: &mut Draft<'_>, academy: Option<&str>) {
    draft.set(paths::academy(), value(&academy));
}

pub fn set_term(draft: &mut Draft<'_>, term: Interval, ids: &IdGen) {
    draft.set(paths::term(), value(&term));
    refresh_weeks(draft, ids);
}

pub fn set_first_week_number(draft: &mut Draft<'_>, number: i32, ids: &IdGen) {
    draft.set(paths::first_week_number(), json!(number));
    refresh_weeks(draft, ids);
}

pub fn set_week_length(draft: &mut Draft<'_>, week_length: u8, ids: &IdGen) {
    draft.set(paths::week_length(), json!(week_length));
    refresh_weeks(draft, ids);
}

pub fn set_lunch(draft: &mut Draft<'_>, lunch: LunchRange) {
    draft.set(paths::lunch(), value(&lunch));
}

/// Replace the forbidden subject combination. Every member must resolve.
pub fn set_forbidden_subjects(
    state: &State,
    draft: &mut Draft<'_>,
    subjects: Vec<EntityId>,
) -> Result<(), EditError> {
    let mut combination = Vec::new();
    for id in subjects {
        if state.subject(id).is_none() {
            return Err(EditError::UnknownSubject(id));
        }
        if !combination.contains(&id) {
            combination.push(id);
        }
    }
    draft.set(paths::forbidden_subject_ids(), value(&combination));
    Ok(())
}

pub fn add_interruption(
    state: &State,
    draft: &mut Draft<'_>,
    interruption: Interruption,
    ids: &IdGen,
) -> Result<(), EditError> {
    if state.interruption_by_name(&interruption.name).is_some() {
        return Err(EditError::DuplicateName(interruption.name));
    }
    draft.push(paths::interruptions(), value(&interruption));
    refresh_weeks(draft, ids);
    Ok(())
}

pub fn rename_interruption(
    state: &State,
    draft: &mut Draft<'_>,
    id: EntityId,
    name: &str,
) -> Result<(), EditError> {
    let index = interruption_index(state, id)?;
    if state
        .interruption_by_name(name)
        .is_some_and(|i| i.id != id)
    {
        return Err(EditError::DuplicateName(name.to_string()));
    }
    draft.set(paths::interruption(index).key("name"), json!(name));
    Ok(())
}

pub fn set_interruption_interval(
    state: &State,
    draft: &mut Draft<'_>,
    id: EntityId,
    interval: Interval,
    ids: &IdGen,
) -> Result<(), EditError> {
    let index = interruption_index(state, id)?;
    draft.set(paths::interruption(index).key("interval"), value(&interval));
    refresh_weeks(draft, ids);
    Ok(())
}

pub fn set_interruption_flags(
    state: &State,
    draft: &mut Draft<'_>,
    id: EntityId,
    weeks_numbering: bool,
    groups_rotation: bool,
    ids: &IdGen,
) -> Result<(), EditError> {
    let index = interruption_index(state, id)?;
    draft.set(
        paths::interruption(index).key("weeks_numbering"),
        json!(weeks_numbering),
    );
    draft.set(
        paths::interruption(index).key("groups_rotation"),
        json!(groups_rotation),
    );
    refresh_weeks(draft, ids);
    Ok(())
}

/// Returns whether the interruption was present.
pub fn remove_interruption(
    state: &State,
    draft: &mut Draft<'_>,
    id: EntityId,
    ids: &IdGen,
) -> bool {
    let Some(index) = state
        .calendar
        .interruptions
        .iter()
        .position(|i| i.id == id)
    else {
        return false;
    };
    draft.remove(paths::interruption(index));
    refresh_weeks(draft, ids);
    true
}

fn interruption_index(state: &State, id: EntityId) -> Result<usize, EditError> {
    state
        .calendar
        .interruptions
        .iter()
        .position(|i| i.id == id)
        .ok_or(EditError::UnknownInterruption(id))
}

/// Land fetched holiday data and the recomputed weeks in one mutation.
pub fn apply_holiday_refresh(draft: &mut Draft<'_>, refresh: &HolidayRefresh, ids: &IdGen) {
    draft.set(paths::school_holidays(), value(&refresh.school_holidays));
    draft.set(paths::public_holidays(), value(&refresh.public_holidays));
    refresh_weeks(draft, ids);
}

// ============================================================================
// Weeks
// ============================================================================

/// Recompute the week sequence from the calendar as edited so far in
/// this draft.
///
/// Weeks whose start date survives keep their id, so colles stay valid
/// across numbering changes; colles referencing a vanished week are
/// pruned.
pub fn refresh_weeks(draft: &mut Draft<'_>, ids: &IdGen) {
    let calendar: Calendar = read(draft, &paths::calendar());
    let previous: Vec<Week> = read(draft, &paths::weeks());
    let by_start: HashMap<NaiveDate, EntityId> =
        previous.iter().map(|w| (w.start, w.id)).collect();

    let weeks: Vec<Week> = calendar
        .working_weeks(ids)
        .into_iter()
        .map(|week| match by_start.get(&week.start) {
            Some(id) => Week { id: *id, ..week },
            None => week,
        })
        .collect();
    let keep: HashSet<EntityId> = weeks.iter().map(|w| w.id).collect();
    draft.set(paths::weeks(), value(&weeks));

    let colles: Vec<Colle> = read(draft, &paths::colles());
    for (i, colle) in colles.iter().enumerate().rev() {
        if !keep.contains(&colle.week_id) {
            draft.remove(paths::colles().index(i));
        }
    }
}

// ============================================================================
// Objectives
// ============================================================================

pub fn add_objective(
    state: &State,
    draft: &mut Draft<'_>,
    objective: Objective,
) -> Result<(), EditError> {
    if state.objective_by_name(&objective.name).is_some() {
        return Err(EditError::DuplicateName(objective.name));
    }
    draft.push(paths::objectives(), value(&objective));
    Ok(())
}

/// Move an objective to a new priority position (indices of the current
/// list; `to` addresses the list after removal). Out-of-range or equal
/// positions are a no-op.
pub fn move_objective(state: &State, draft: &mut Draft<'_>, from: usize, to: usize) -> bool {
    let len = state.objectives.len();
    if from >= len || to >= len || from == to {
        return false;
    }
    let moved = state.objectives[from].clone();
    draft.remove(paths::objective(from));
    draft.insert(paths::objectives(), to, value(&moved));
    true
}

pub fn remove_objective(state: &State, draft: &mut Draft<'_>, name: &str) -> bool {
    let Some(index) = state.objectives.iter().position(|o| o.name == name) else {
        return false;
    };
    draft.remove(paths::objective(index));
    true
}

pub fn set_objective_result(
    state: &State,
    draft: &mut Draft<'_>,
    name: &str,
    result: Option<f64>,
) -> Result<(), EditError> {
    let index = state
        .objectives
        .iter()
        .position(|o| o.name == name)
        .ok_or_else(|| EditError::UnknownObjective(name.to_string()))?;
    draft.set(paths::objective(index).key("result"), value(&result));
    Ok(())
}

// ============================================================================
// Colles
// ============================================================================

/// Replace the colle list with solver output. Every reference must
/// resolve in the snapshot; rejected input records nothing.
pub fn replace_colles(
    state: &State,
    draft: &mut Draft<'_>,
    colles: Vec<Colle>,
) -> Result<(), EditError> {
    for colle in &colles {
        if state.teacher(colle.teacher_id).is_none() {
            return Err(EditError::UnknownTeacher(colle.teacher_id));
        }
        if state.trio(colle.trio_id).is_none() {
            return Err(EditError::UnknownTrio(colle.trio_id));
        }
        if state.week(colle.week_id).is_none() {
            return Err(EditError::UnknownWeek(colle.week_id));
        }
    }
    draft.set(paths::colles(), value(&colles));
    Ok(())
}

pub fn clear_colles(draft: &mut Draft<'_>) {
    draft.set(paths::colles(), json!([]));
}

// ============================================================================
// Tests
// ============================================================================
