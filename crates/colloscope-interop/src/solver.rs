#![forbid(unsafe_code)]

//! Solver channel messages.
//!
//! The external solver process receives a [`SolverRequest`] — a trimmed
//! projection of the state — and answers with [`SolverReply`] messages
//! carrying computed colles and per-objective results. The channel
//! itself (process spawning, transport) belongs to the surrounding
//! application; this module owns the message shapes, their JSON
//! encoding, and the application of replies to the session.
//!
//! Cancellation is a fire-and-forget [`SolverCommand::Stop`]: no
//! acknowledgement is awaited.
//!
//! Replies are validated against the current snapshot before anything is
//! mutated; malformed or dangling input is rejected with a typed error
//! and never reaches the command stack.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use colloscope_model::{Colle, EditError, EntityId, Session, State, Timeslot, ops};

/// Outbound message to the solver process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SolverCommand {
    /// Start a solve over the projected state.
    Start { request: SolverRequest },
    /// Abort the running solve; fire-and-forget.
    Stop,
}

/// Inbound message from the solver process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SolverReply {
    /// A computed assignment, replacing the colle list.
    Colles { colles: Vec<Colle> },
    /// Numeric results for the named objectives.
    Objectives { results: Vec<ObjectiveResult> },
}

/// The solver-oriented projection of the state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverRequest {
    pub subjects: Vec<SolverSubject>,
    pub teachers: Vec<SolverTeacher>,
    pub trio_count: usize,
    pub week_count: usize,
    /// Priority-ordered objective names.
    pub objectives: Vec<String>,
    /// Lunch hours as `[start, end)`.
    pub lunch: [u8; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSubject {
    pub id: EntityId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverTeacher {
    pub id: EntityId,
    pub name: String,
    pub subject_id: EntityId,
    pub slots: Vec<Timeslot>,
}

/// One objective's numeric outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveResult {
    pub name: String,
    pub value: f64,
}

/// Solver interchange failures.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("invalid solver message: {0}")]
    Payload(#[from] serde_json::Error),
    #[error(transparent)]
    Rejected(#[from] EditError),
}

/// Project the snapshot into the outbound request.
#[must_use]
pub fn request(state: &State) -> SolverRequest {
    SolverRequest {
        subjects: state
            .subjects
            .iter()
            .map(|s| SolverSubject {
                id: s.id,
                name: s.name.clone(),
            })
            .collect(),
        teachers: state
            .teachers
            .iter()
            .map(|t| SolverTeacher {
                id: t.id,
                name: t.name.clone(),
                subject_id: t.subject_id,
                slots: t.slots.clone(),
            })
            .collect(),
        trio_count: state.trios.len(),
        week_count: state.weeks.len(),
        objectives: state.objectives.iter().map(|o| o.name.clone()).collect(),
        lunch: [state.lunch.start, state.lunch.end],
    }
}

/// Encode an outbound command for the wire.
#[must_use]
pub fn encode_command(command: &SolverCommand) -> String {
    serde_json::to_string(command).expect("solver command serializes")
}

/// Decode an inbound reply.
pub fn decode_reply(text: &str) -> Result<SolverReply, SolverError> {
    Ok(serde_json::from_str(text)?)
}

/// Apply a reply to the session as an undoable edit.
///
/// Validation runs against the snapshot first; on rejection the store is
/// untouched and no undo step is recorded.
pub fn apply_reply(session: &mut Session, reply: &SolverReply) -> Result<(), SolverError> {
    match reply {
        SolverReply::Colles { colles } => {
            let mut outcome = Ok(());
            let incoming = colles.clone();
            session.commit_with(
                |state, draft| {
                    outcome = ops::replace_colles(state, draft, incoming);
                },
                false,
            );
            tracing::debug!(colles = colles.len(), ok = outcome.is_ok(), "solver colles");
            outcome.map_err(SolverError::Rejected)
        }
        SolverReply::Objectives { results } => {
            let snapshot = session.state();
            for result in results {
                if snapshot.objective_by_name(&result.name).is_none() {
                    return Err(SolverError::Rejected(EditError::UnknownObjective(
                        result.name.clone(),
                    )));
                }
            }
            session.commit_with(
                |state, draft| {
                    for result in results {
                        ops::set_objective_result(state, draft, &result.name, Some(result.value))
                            .expect("objective validated before commit");
                    }
                },
                false,
            );
            Ok(())
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
