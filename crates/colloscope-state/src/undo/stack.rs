#![forbid(unsafe_code)]

//! Dual-stack undo/redo engine over a patch-producing store.
//!
//! ```text
//! commit(edit)
//! ┌───────────────────────────────────────────────┐
//! │ Undo Stack: [cmd1, cmd2, cmd3]   (newest last)│
//! │ Redo Stack: []                                │
//! └───────────────────────────────────────────────┘
//!
//! undo() x2
//! ┌───────────────────────────────────────────────┐
//! │ Undo Stack: [cmd1]                            │
//! │ Redo Stack: [cmd2, cmd3]     (next-to-redo    │
//! │                               at the front)   │
//! └───────────────────────────────────────────────┘
//!
//! commit(edit4)  — linear history, redo discarded
//! ┌───────────────────────────────────────────────┐
//! │ Undo Stack: [cmd1, cmd4]                      │
//! │ Redo Stack: []                                │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! # Invariants
//!
//! 1. The redo stack is cleared whenever a command is added, merges
//!    included.
//! 2. While a group is open the top of the undo stack is that group, and
//!    `undo`/`redo` are disabled.
//! 3. Undo/redo never fail on well-formed history; a patch that does not
//!    apply is an invariant breach and panics.

use std::collections::VecDeque;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::command::{Command, GroupCommand, PatchesCommand, push_merged};
use crate::draft::Draft;
use crate::patch::Patch;
use crate::store::Store;

/// Undo/redo history over a [`Store`].
#[derive(Debug, Default)]
pub struct UndoStack {
    undo: Vec<Command>,
    redo: VecDeque<Command>,
    group_depth: usize,
}

impl UndoStack {
    /// Empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Recording
    // ========================================================================

    /// Run a mutation and record it as one undo step, merging with the
    /// previous step when possible.
    ///
    /// Returns `false` when the mutation was a no-op (nothing recorded).
    pub fn commit<S, F>(&mut self, store: &mut Store<S>, produce: F) -> bool
    where
        S: Serialize + DeserializeOwned,
        F: FnOnce(&S, &mut Draft<'_>),
    {
        self.commit_with(store, produce, true)
    }

    /// [`commit`](Self::commit) with explicit merge control.
    pub fn commit_with<S, F>(&mut self, store: &mut Store<S>, produce: F, should_merge: bool) -> bool
    where
        S: Serialize + DeserializeOwned,
        F: FnOnce(&S, &mut Draft<'_>),
    {
        let outcome = store.mutate(produce);
        if outcome.is_noop() {
            tracing::trace!("no-op edit discarded");
            return false;
        }
        self.add(
            Command::Patches(PatchesCommand::new(outcome.forward, outcome.inverse)),
            should_merge,
        );
        true
    }

    /// Add an already-built command to the active target: the open
    /// group's children while grouping, the undo stack otherwise. The
    /// redo stack is cleared in every case.
    pub fn add(&mut self, command: Command, should_merge: bool) {
        self.redo.clear();
        if self.group_depth > 0 {
            match self.undo.last_mut() {
                Some(Command::Group(group)) => group.add(command, should_merge),
                _ => panic!("open group without a group command on top of the undo stack"),
            }
        } else {
            push_merged(&mut self.undo, command, should_merge);
        }
    }

    // ========================================================================
    // Grouping
    // ========================================================================

    /// Open a group; nested calls deepen the same group.
    ///
    /// Until the matching [`end_group`](Self::end_group), every added
    /// command lands in this group and undo/redo are disabled.
    pub fn start_group(&mut self) {
        if self.group_depth == 0 {
            self.undo.push(Command::Group(GroupCommand::default()));
        }
        self.group_depth += 1;
    }

    /// Close one grouping level; the outermost close finalizes the group.
    /// A group that collected no commands is discarded rather than left
    /// as a no-op undo step.
    pub fn end_group(&mut self) {
        debug_assert!(self.group_depth > 0, "end_group without start_group");
        if self.group_depth == 0 {
            return;
        }
        self.group_depth -= 1;
        if self.group_depth == 0
            && matches!(self.undo.last(), Some(Command::Group(group)) if group.is_empty())
        {
            self.undo.pop();
        }
    }

    /// True while a group is open.
    #[must_use]
    pub fn is_grouped(&self) -> bool {
        self.group_depth > 0
    }

    // ========================================================================
    // Undo / redo
    // ========================================================================

    /// Revert the latest undo step. No-op while grouped or when the
    /// stack is empty; returns whether a step was reverted.
    pub fn undo<S>(&mut self, store: &mut Store<S>) -> bool
    where
        S: Serialize + DeserializeOwned,
    {
        if self.group_depth > 0 {
            return false;
        }
        let Some(command) = self.undo.pop() else {
            return false;
        };
        apply_history(store, &command.undo_patches());
        self.redo.push_front(command);
        true
    }

    /// Replay the next redo step. No-op while grouped or when the stack
    /// is empty; returns whether a step was replayed.
    pub fn redo<S>(&mut self, store: &mut Store<S>) -> bool
    where
        S: Serialize + DeserializeOwned,
    {
        if self.group_depth > 0 {
            return false;
        }
        let Some(command) = self.redo.pop_front() else {
            return false;
        };
        apply_history(store, &command.redo_patches());
        self.undo.push(command);
        true
    }

    /// True when [`undo`](Self::undo) would revert a step.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.group_depth == 0 && !self.undo.is_empty()
    }

    /// True when [`redo`](Self::redo) would replay a step.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.group_depth == 0 && !self.redo.is_empty()
    }

    /// Number of undoable steps.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Number of redoable steps.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Drop all history, both stacks.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

fn apply_history<S>(store: &mut Store<S>, patches: &[Patch])
where
    S: Serialize + DeserializeOwned,
{
    if let Err(err) = store.apply(patches) {
        panic!("history patches failed to apply: {err}");
    }
}

// ============================================================================
// Tests
// ============================================================================
