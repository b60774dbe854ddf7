#![forbid(unsafe_code)]

//! Clipboard interchange of single entities.
//!
//! Individual interruptions, groups and teachers travel as JSON
//! fragments typed `application/json-<entity>`, so they can be copied
//! between sessions or positions. Fragments are name-keyed like the
//! human JSON document: ids never cross a clipboard boundary — paste
//! mints a fresh one — and a group's rotation edge is dropped because
//! its target is not guaranteed to exist on the pasting side.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use colloscope_model::{
    Group, IdGen, Interruption, Interval, IntervalParseError, State, Teacher, Timeslot,
};

/// Media type of interruption fragments.
pub const INTERRUPTION_MEDIA_TYPE: &str = "application/json-interruption";
/// Media type of group fragments.
pub const GROUP_MEDIA_TYPE: &str = "application/json-group";
/// Media type of teacher fragments.
pub const TEACHER_MEDIA_TYPE: &str = "application/json-teacher";

/// One clipboard entry: a media type plus its JSON payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardFragment {
    pub media_type: &'static str,
    pub payload: String,
}

/// Paste failures.
#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("unexpected media type `{found}`, expected `{expected}`")]
    MediaType {
        expected: &'static str,
        found: String,
    },
    #[error("invalid fragment: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("unknown subject `{0}`")]
    UnknownSubject(String),
    #[error(transparent)]
    Interval(#[from] IntervalParseError),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct InterruptionFragment {
    name: String,
    interval: String,
    weeks_numbering: bool,
    groups_rotation: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct GroupFragment {
    name: String,
    trios: Vec<u32>,
    slots: Vec<Timeslot>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TeacherFragment {
    name: String,
    subject: String,
    slots: Vec<Timeslot>,
}

fn encode<T: Serialize>(media_type: &'static str, fragment: &T) -> ClipboardFragment {
    ClipboardFragment {
        media_type,
        payload: serde_json::to_string(fragment).expect("fragment serializes"),
    }
}

fn decode<T: for<'de> Deserialize<'de>>(
    expected: &'static str,
    fragment: &ClipboardFragment,
) -> Result<T, ClipboardError> {
    if fragment.media_type != expected {
        return Err(ClipboardError::MediaType {
            expected,
            found: fragment.media_type.to_string(),
        });
    }
    Ok(serde_json::from_str(&fragment.payload)?)
}

// ============================================================================
// Interruptions
// ============================================================================

#[must_use]
pub fn copy_interruption(interruption: &Interruption) -> ClipboardFragment {
    encode(
        INTERRUPTION_MEDIA_TYPE,
        &InterruptionFragment {
            name: interruption.name.clone(),
            interval: interruption.interval.to_full_day_iso(),
            weeks_numbering: interruption.weeks_numbering,
            groups_rotation: interruption.groups_rotation,
        },
    )
}

pub fn paste_interruption(
    fragment: &ClipboardFragment,
    ids: &IdGen,
) -> Result<Interruption, ClipboardError> {
    let entry: InterruptionFragment = decode(INTERRUPTION_MEDIA_TYPE, fragment)?;
    let interval =
        Interval::from_full_day_iso(&entry.interval, &format!("interruption `{}`", entry.name))?;
    let mut interruption = Interruption::new(ids, entry.name, interval);
    interruption.weeks_numbering = entry.weeks_numbering;
    interruption.groups_rotation = entry.groups_rotation;
    Ok(interruption)
}

// ============================================================================
// Groups
// ============================================================================

#[must_use]
pub fn copy_group(group: &Group) -> ClipboardFragment {
    encode(
        GROUP_MEDIA_TYPE,
        &GroupFragment {
            name: group.name.clone(),
            trios: group.trios.clone(),
            slots: group.slots.clone(),
        },
    )
}

pub fn paste_group(fragment: &ClipboardFragment, ids: &IdGen) -> Result<Group, ClipboardError> {
    let entry: GroupFragment = decode(GROUP_MEDIA_TYPE, fragment)?;
    let mut group = Group::new(ids, entry.name);
    group.trios = entry.trios;
    group.slots = entry.slots;
    Ok(group)
}

// ============================================================================
// Teachers
// ============================================================================

/// Teachers carry their subject by name so the fragment stays meaningful
/// across sessions.
///
/// # Panics
///
/// Panics when the teacher's subject id dangles in `state`.
#[must_use]
pub fn copy_teacher(teacher: &Teacher, state: &State) -> ClipboardFragment {
    encode(
        TEACHER_MEDIA_TYPE,
        &TeacherFragment {
            name: teacher.name.clone(),
            subject: state.require_subject(teacher.subject_id).name.clone(),
            slots: teacher.slots.clone(),
        },
    )
}

pub fn paste_teacher(
    fragment: &ClipboardFragment,
    state: &State,
    ids: &IdGen,
) -> Result<Teacher, ClipboardError> {
    let entry: TeacherFragment = decode(TEACHER_MEDIA_TYPE, fragment)?;
    let subject_id = state
        .subject_by_name(&entry.subject)
        .map(|s| s.id)
        .ok_or(ClipboardError::UnknownSubject(entry.subject))?;
    let mut teacher = Teacher::new(ids, entry.name, subject_id);
    teacher.slots = entry.slots;
    Ok(teacher)
}

// ============================================================================
// Tests
// ============================================================================
