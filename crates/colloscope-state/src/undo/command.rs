#![forbid(unsafe_code)]

//! Reversible commands for the undo/redo stack.
//!
//! A command is either a [`PatchesCommand`] (one recorded mutation: a
//! forward patch list and its inverse) or a [`GroupCommand`] (an ordered
//! sequence of child commands undone and redone as one atomic unit).
//! Dispatch is by tag on [`Command`], not by trait object: the set of
//! command shapes is closed.
//!
//! # Invariants
//!
//! 1. `redo_patches` applied to the pre-command snapshot reproduces the
//!    post-command snapshot; `undo_patches` applied to the post-command
//!    snapshot reproduces the pre-command one.
//! 2. Group undo replays children's undo patches in reverse order; group
//!    redo replays children's redo patches in forward order.
//! 3. Merging two commands never changes the net effect of history:
//!    the merged command spans from the older command's undo state to
//!    the newer command's redo state, or vanishes when those are equal.

use crate::patch::{Patch, PatchOp};

/// One undo-stack entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// A single recorded mutation.
    Patches(PatchesCommand),
    /// An atomic group of commands.
    Group(GroupCommand),
}

impl Command {
    /// Patch list that reverts this command, ready to apply in order.
    #[must_use]
    pub fn undo_patches(&self) -> Vec<Patch> {
        match self {
            Self::Patches(command) => command.undo.clone(),
            Self::Group(group) => group
                .children
                .iter()
                .rev()
                .flat_map(Command::undo_patches)
                .collect(),
        }
    }

    /// Patch list that replays this command, ready to apply in order.
    #[must_use]
    pub fn redo_patches(&self) -> Vec<Patch> {
        match self {
            Self::Patches(command) => command.redo.clone(),
            Self::Group(group) => group
                .children
                .iter()
                .flat_map(Command::redo_patches)
                .collect(),
        }
    }

    /// Merge `newer` into `older`.
    ///
    /// Returns the commands that replace the pair on the stack, oldest
    /// first: two commands when the pair is not mergeable, one folded
    /// command when it is, none when folding produced a net no-op.
    /// Groups refuse every merge and keep the pair separate.
    #[must_use]
    pub fn merge(older: Command, newer: Command) -> Vec<Command> {
        match (older, newer) {
            (Command::Patches(a), Command::Patches(b)) => PatchesCommand::merge(a, b),
            (older, newer) => vec![older, newer],
        }
    }
}

/// A recorded mutation: forward patches plus their inverse.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchesCommand {
    redo: Vec<Patch>,
    undo: Vec<Patch>,
}

impl PatchesCommand {
    /// Wrap the patch pair reported by a store mutation.
    #[must_use]
    pub fn new(forward: Vec<Patch>, inverse: Vec<Patch>) -> Self {
        Self {
            redo: forward,
            undo: inverse,
        }
    }

    /// The lone `Replace` patch, when this command is a single scalar
    /// overwrite; merge eligibility is decided on this shape.
    fn single_replace(&self) -> Option<&Patch> {
        match (self.redo.as_slice(), self.undo.as_slice()) {
            ([redo], [undo])
                if redo.op == PatchOp::Replace
                    && undo.op == PatchOp::Replace
                    && redo.path == undo.path =>
            {
                Some(redo)
            }
            _ => None,
        }
    }

    /// Fold two consecutive single-`Replace` commands on the same path.
    ///
    /// The folded command keeps the newer redo list and the older undo
    /// list, so a burst of keystrokes collapses into one step spanning
    /// value-before-typing to value-after-typing. A fold whose redo value
    /// equals its undo value is a net no-op and is discarded outright.
    fn merge(older: Self, newer: Self) -> Vec<Command> {
        let compatible = match (older.single_replace(), newer.single_replace()) {
            (Some(a), Some(b)) => a.path == b.path,
            _ => false,
        };
        if !compatible {
            return vec![Command::Patches(older), Command::Patches(newer)];
        }

        let folded = Self {
            redo: newer.redo,
            undo: older.undo,
        };
        if folded.redo[0].value == folded.undo[0].value {
            tracing::trace!(path = %folded.redo[0].path, "merge folded to a no-op");
            return Vec::new();
        }
        vec![Command::Patches(folded)]
    }
}

/// An ordered group of commands forming one undo step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupCommand {
    children: Vec<Command>,
}

impl GroupCommand {
    /// Number of child commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// True when no child command was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Append a child, merging with the current last child on request.
    pub fn add(&mut self, command: Command, should_merge: bool) {
        push_merged(&mut self.children, command, should_merge);
    }
}

/// Push `command` onto `target`, folding it into the previous top when
/// merging is requested and the pair is compatible.
pub(crate) fn push_merged(target: &mut Vec<Command>, command: Command, should_merge: bool) {
    if should_merge {
        if let Some(previous) = target.pop() {
            target.extend(Command::merge(previous, command));
            return;
        }
    }
    target.push(command);
}

// ============================================================================
// Tests
// ============================================================================
