#![forbid(unsafe_code)]

//! Entity identity.
//!
//! Every identity-bearing entity gets an [`EntityId`] from the session's
//! [`IdGen`] at creation. Ids are opaque, stable for the entity's
//! lifetime, unique within the session, and never reused after deletion.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Opaque identifier of a domain entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Rebuild an id from its raw value (deserialization, tests).
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session-scoped id generator.
///
/// A monotonic counter: uniqueness within the session is the whole
/// contract, so no randomness is needed. The generator is a cheap
/// cloneable handle to one shared counter, so clones keep minting from
/// the same sequence.
#[derive(Debug, Clone)]
pub struct IdGen {
    next: Arc<AtomicU64>,
}

impl IdGen {
    /// Generator starting at 1 (0 is never a valid id).
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Mint a fresh id, never seen before in this session.
    pub fn next_id(&self) -> EntityId {
        EntityId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdGen {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
