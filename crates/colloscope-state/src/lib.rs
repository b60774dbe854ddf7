#![forbid(unsafe_code)]

//! Patch-producing state store and undo/redo command stack.
//!
//! This crate is the domain-agnostic state engine behind the Colloscope
//! editor. State lives in a [`Store`] as a canonical JSON-shaped value
//! tree plus a typed [`std::sync::Arc`] snapshot; mutations run against a
//! [`Draft`] that records every write, and the recorded edit log yields
//! minimal forward/inverse [`Patch`] lists. The [`UndoStack`] wraps those
//! patch pairs as reversible commands with merging and grouping.
//!
//! # Data Flow
//!
//! ```text
//! caller ──commit──► UndoStack ──mutate──► Store ──► Draft (edit log)
//!                        │                   │
//!                        │◄── forward/inverse patches
//!                        ▼
//!                  Command (merge / group / push)
//!                        │
//!                        ▼
//!                  undo()/redo() ──apply──► Store ──notify──► subscribers
//! ```
//!
//! # Error Policy
//!
//! Producer writes through a dangling path, and history patches that no
//! longer apply, are invariant breaches and panic; they signal a
//! programming defect, never a recoverable condition. Everything that can
//! legitimately fail returns a typed error ([`PatchError`]).

pub mod draft;
pub mod patch;
pub mod store;
pub mod undo;

pub use draft::Draft;
pub use patch::{Patch, PatchError, PatchOp, Path, PathSeg, apply_patch, apply_patches};
pub use store::{MutationOutcome, Store, SubscriptionId};
pub use undo::{Command, GroupCommand, PatchesCommand, UndoStack};
