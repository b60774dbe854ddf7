#![forbid(unsafe_code)]

//! Human-readable JSON import/export.
//!
//! The exported document references entities by *name*, never by opaque
//! id: a teacher carries its subject's name, a group's rotation edge the
//! target group's name, a colle its teacher's name and the position of
//! its week. The document stays diffable and hand-editable; ids are
//! regenerated on import.
//!
//! Import is two-staged so failures stay typed: [`parse`] distinguishes
//! malformed JSON ([`HumanJsonError::Parse`]) from a well-formed document
//! of the wrong shape ([`HumanJsonError::Schema`]); [`into_state`] then
//! resolves names and rebuilds the derived collections (trios, weeks).
//! Nothing is ever half-imported: any error leaves the caller with no
//! state at all.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use colloscope_model::{
    Calendar, Colle, Group, IdGen, Interruption, Interval, IntervalParseError, LunchRange,
    Objective, State, Subject, Teacher, Timeslot, derive_trios,
};

/// Import/export failure taxonomy.
#[derive(Debug, Error)]
pub enum HumanJsonError {
    /// The text is not JSON at all.
    #[error("invalid JSON: {0}")]
    Parse(serde_json::Error),
    /// Valid JSON of the wrong shape.
    #[error("schema mismatch: {0}")]
    Schema(String),
    /// A name reference did not resolve.
    #[error("unknown {kind} name `{name}`")]
    UnknownName { kind: &'static str, name: String },
    /// Sibling names must be unique.
    #[error("duplicate {kind} name `{name}`")]
    DuplicateName { kind: &'static str, name: String },
    /// A colle referenced a trio no group contains.
    #[error("unknown trio id {0}")]
    UnknownTrio(u32),
    /// A colle referenced a week position past the derived sequence.
    #[error("colle week index {0} out of range")]
    WeekOutOfRange(usize),
    /// A textual interval did not parse.
    #[error(transparent)]
    Interval(#[from] IntervalParseError),
}

/// The document root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HumanState {
    pub calendar: HumanCalendar,
    pub subjects: Vec<String>,
    pub teachers: Vec<HumanTeacher>,
    pub groups: Vec<HumanGroup>,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub lunch: LunchRange,
    #[serde(default)]
    pub forbidden_subjects: Vec<String>,
    #[serde(default)]
    pub colles: Vec<HumanColle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HumanCalendar {
    #[serde(default)]
    pub academy: Option<String>,
    /// Full-day ISO form: `"2023-09-04/2024-06-28"` or `"2023-09-04/P38W"`.
    pub term: String,
    pub first_week_number: i32,
    #[serde(default = "default_week_length")]
    pub week_length: u8,
    #[serde(default)]
    pub interruptions: Vec<HumanInterruption>,
    #[serde(default)]
    pub school_holidays: Vec<String>,
    #[serde(default)]
    pub public_holidays: Vec<NaiveDate>,
}

fn default_week_length() -> u8 {
    colloscope_model::DEFAULT_WEEK_LENGTH
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HumanInterruption {
    pub name: String,
    pub interval: String,
    #[serde(default)]
    pub weeks_numbering: bool,
    #[serde(default)]
    pub groups_rotation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HumanTeacher {
    pub name: String,
    /// Subject by name.
    pub subject: String,
    #[serde(default)]
    pub slots: Vec<Timeslot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HumanGroup {
    pub name: String,
    #[serde(default)]
    pub trios: Vec<u32>,
    #[serde(default)]
    pub slots: Vec<Timeslot>,
    /// Rotation edge target by name.
    #[serde(default)]
    pub next_group: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HumanColle {
    /// Teacher by name.
    pub teacher: String,
    pub timeslot: Timeslot,
    pub trio: u32,
    /// Position in the derived week sequence.
    pub week: usize,
}

// ============================================================================
// Export
// ============================================================================

/// Project a snapshot to its human-readable form.
///
/// # Panics
///
/// Panics on a dangling cross reference: the snapshot invariant is
/// broken.
#[must_use]
pub fn to_human(state: &State) -> HumanState {
    HumanState {
        calendar: HumanCalendar {
            academy: state.calendar.academy.clone(),
            term: state.calendar.interval.to_full_day_iso(),
            first_week_number: state.calendar.first_week_number,
            week_length: state.calendar.week_length,
            interruptions: state
                .calendar
                .interruptions
                .iter()
                .map(|i| HumanInterruption {
                    name: i.name.clone(),
                    interval: i.interval.to_full_day_iso(),
                    weeks_numbering: i.weeks_numbering,
                    groups_rotation: i.groups_rotation,
                })
                .collect(),
            school_holidays: state
                .calendar
                .school_holidays
                .iter()
                .map(Interval::to_full_day_iso)
                .collect(),
            public_holidays: state.calendar.public_holidays.clone(),
        },
        subjects: state.subjects.iter().map(|s| s.name.clone()).collect(),
        teachers: state
            .teachers
            .iter()
            .map(|t| HumanTeacher {
                name: t.name.clone(),
                subject: state.require_subject(t.subject_id).name.clone(),
                slots: t.slots.clone(),
            })
            .collect(),
        groups: state
            .groups
            .iter()
            .map(|g| HumanGroup {
                name: g.name.clone(),
                trios: g.trios.clone(),
                slots: g.slots.clone(),
                next_group: g
                    .next_group_id
                    .map(|id| state.require_group(id).name.clone()),
                duration: g.duration,
            })
            .collect(),
        objectives: state.objectives.iter().map(|o| o.name.clone()).collect(),
        lunch: state.lunch,
        forbidden_subjects: state
            .forbidden_subject_ids
            .iter()
            .map(|id| state.require_subject(*id).name.clone())
            .collect(),
        colles: state
            .colles
            .iter()
            .map(|c| HumanColle {
                teacher: state.require_teacher(c.teacher_id).name.clone(),
                timeslot: c.timeslot,
                trio: c.trio_id,
                week: state
                    .weeks
                    .iter()
                    .position(|w| w.id == c.week_id)
                    .unwrap_or_else(|| panic!("dangling week id {}", c.week_id)),
            })
            .collect(),
    }
}

/// Serialize a snapshot to pretty-printed human JSON.
#[must_use]
pub fn export(state: &State) -> String {
    serde_json::to_string_pretty(&to_human(state)).expect("human projection serializes")
}

// ============================================================================
// Import
// ============================================================================

/// Parse text into the document shape, keeping parse and schema failures
/// apart.
pub fn parse(text: &str) -> Result<HumanState, HumanJsonError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(HumanJsonError::Parse)?;
    serde_json::from_value(value).map_err(|err| HumanJsonError::Schema(err.to_string()))
}

/// Rebuild a full state from the document: fresh ids, names resolved,
/// trios and weeks re-derived.
pub fn into_state(human: &HumanState, ids: &IdGen) -> Result<State, HumanJsonError> {
    let term = Interval::from_full_day_iso(&human.calendar.term, "calendar term")?;
    let mut calendar = Calendar::new(term, human.calendar.first_week_number);
    calendar.academy = human.calendar.academy.clone();
    calendar.week_length = human.calendar.week_length;

    for entry in &human.calendar.interruptions {
        if calendar.interruptions.iter().any(|i| i.name == entry.name) {
            return Err(HumanJsonError::DuplicateName {
                kind: "interruption",
                name: entry.name.clone(),
            });
        }
        let interval =
            Interval::from_full_day_iso(&entry.interval, &format!("interruption `{}`", entry.name))?;
        let mut interruption = Interruption::new(ids, entry.name.clone(), interval);
        interruption.weeks_numbering = entry.weeks_numbering;
        interruption.groups_rotation = entry.groups_rotation;
        calendar.interruptions.push(interruption);
    }
    for text in &human.calendar.school_holidays {
        calendar
            .school_holidays
            .push(Interval::from_full_day_iso(text, "school holidays")?);
    }
    calendar.public_holidays = human.calendar.public_holidays.clone();

    let mut state = State::new(calendar);

    for name in &human.subjects {
        if state.subject_by_name(name).is_some() {
            return Err(HumanJsonError::DuplicateName {
                kind: "subject",
                name: name.clone(),
            });
        }
        state.subjects.push(Subject::new(ids, name.clone()));
    }

    for entry in &human.teachers {
        if state.teacher_by_name(&entry.name).is_some() {
            return Err(HumanJsonError::DuplicateName {
                kind: "teacher",
                name: entry.name.clone(),
            });
        }
        let subject_id = state
            .subject_by_name(&entry.subject)
            .map(|s| s.id)
            .ok_or_else(|| HumanJsonError::UnknownName {
                kind: "subject",
                name: entry.subject.clone(),
            })?;
        let mut teacher = Teacher::new(ids, entry.name.clone(), subject_id);
        teacher.slots = entry.slots.clone();
        state.teachers.push(teacher);
    }

    for entry in &human.groups {
        if state.group_by_name(&entry.name).is_some() {
            return Err(HumanJsonError::DuplicateName {
                kind: "group",
                name: entry.name.clone(),
            });
        }
        let mut group = Group::new(ids, entry.name.clone());
        group.trios = entry.trios.clone();
        group.slots = entry.slots.clone();
        state.groups.push(group);
    }
    // Rotation edges second: targets may be declared later in the list.
    for (index, entry) in human.groups.iter().enumerate() {
        if let Some(next_name) = &entry.next_group {
            let target = state
                .group_by_name(next_name)
                .map(|g| g.id)
                .ok_or_else(|| HumanJsonError::UnknownName {
                    kind: "group",
                    name: next_name.clone(),
                })?;
            state.groups[index].next_group_id = Some(target);
            state.groups[index].duration = entry.duration;
        }
    }

    for name in &human.objectives {
        if state.objective_by_name(name).is_some() {
            return Err(HumanJsonError::DuplicateName {
                kind: "objective",
                name: name.clone(),
            });
        }
        state.objectives.push(Objective::new(name.clone()));
    }
    state.lunch = human.lunch;

    for name in &human.forbidden_subjects {
        let id = state
            .subject_by_name(name)
            .map(|s| s.id)
            .ok_or_else(|| HumanJsonError::UnknownName {
                kind: "subject",
                name: name.clone(),
            })?;
        if !state.forbidden_subject_ids.contains(&id) {
            state.forbidden_subject_ids.push(id);
        }
    }

    state.trios = derive_trios(&state.groups);
    state.weeks = state.calendar.working_weeks(ids);

    for entry in &human.colles {
        let teacher_id = state
            .teacher_by_name(&entry.teacher)
            .map(|t| t.id)
            .ok_or_else(|| HumanJsonError::UnknownName {
                kind: "teacher",
                name: entry.teacher.clone(),
            })?;
        if state.trio(entry.trio).is_none() {
            return Err(HumanJsonError::UnknownTrio(entry.trio));
        }
        let week_id = state
            .weeks
            .get(entry.week)
            .map(|w| w.id)
            .ok_or(HumanJsonError::WeekOutOfRange(entry.week))?;
        state.colles.push(Colle {
            teacher_id,
            timeslot: entry.timeslot,
            trio_id: entry.trio,
            week_id,
        });
    }

    tracing::debug!(
        subjects = state.subjects.len(),
        teachers = state.teachers.len(),
        groups = state.groups.len(),
        "imported human JSON"
    );
    Ok(state)
}

/// [`parse`] then [`into_state`].
pub fn import(text: &str, ids: &IdGen) -> Result<State, HumanJsonError> {
    into_state(&parse(text)?, ids)
}

// ============================================================================
// Tests
// ============================================================================
