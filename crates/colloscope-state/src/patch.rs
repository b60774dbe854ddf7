#![forbid(unsafe_code)]

//! Structural patches over a JSON-shaped state tree.
//!
//! A [`Patch`] is the atomic unit of state change: an operation
//! ([`PatchOp`]), a [`Path`] into the tree, and (for `Add`/`Replace`) the
//! value to write. Patch lists are produced by the draft recorder
//! ([`crate::Draft`]) and replayed by the store during undo/redo.
//!
//! # Invariants
//!
//! 1. Applying a forward patch list to the snapshot it was recorded
//!    against reproduces the successor snapshot exactly.
//! 2. Applying the matching inverse list to the successor reproduces the
//!    original exactly.
//! 3. `apply_patches` applies strictly in list order; an error leaves the
//!    tree in the state reached so far (callers treat any error on
//!    history patches as an invariant breach).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operation kind carried by a [`Patch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// Insert a value: a new sequence element or a new map key.
    Add,
    /// Delete a value: a sequence element or a map key.
    Remove,
    /// Overwrite an existing value in place.
    Replace,
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => f.write_str("add"),
            Self::Remove => f.write_str("remove"),
            Self::Replace => f.write_str("replace"),
        }
    }
}

/// One step of a [`Path`]: a map key or a sequence index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSeg {
    /// Field name in an object node.
    Key(String),
    /// Position in an array node.
    Index(usize),
}

impl fmt::Display for PathSeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Ordered sequence of segments addressing one node in the state tree.
///
/// Built fluently: `Path::root().key("subjects").index(3).key("name")`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<PathSeg>);

impl Path {
    /// The empty path, addressing the tree root.
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Append a map-key segment.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.0.push(PathSeg::Key(key.into()));
        self
    }

    /// Append a sequence-index segment.
    #[must_use]
    pub fn index(mut self, index: usize) -> Self {
        self.0.push(PathSeg::Index(index));
        self
    }

    /// The segments, outermost first.
    #[must_use]
    pub fn segments(&self) -> &[PathSeg] {
        &self.0
    }

    /// True for the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for seg in &self.0 {
            write!(f, "/{seg}")?;
        }
        Ok(())
    }
}

/// A single structural edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    /// What to do at `path`.
    pub op: PatchOp,
    /// Where to do it.
    pub path: Path,
    /// Payload for `Add`/`Replace`; `None` for `Remove`.
    pub value: Option<Value>,
}

impl Patch {
    /// An `Add` patch.
    #[must_use]
    pub fn add(path: Path, value: Value) -> Self {
        Self {
            op: PatchOp::Add,
            path,
            value: Some(value),
        }
    }

    /// A `Remove` patch.
    #[must_use]
    pub fn remove(path: Path) -> Self {
        Self {
            op: PatchOp::Remove,
            path,
            value: None,
        }
    }

    /// A `Replace` patch.
    #[must_use]
    pub fn replace(path: Path, value: Value) -> Self {
        Self {
            op: PatchOp::Replace,
            path,
            value: Some(value),
        }
    }
}

/// Errors raised while applying a patch to a value tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// A path segment did not resolve to an existing node.
    PathNotFound(Path),
    /// A segment kind did not match the node kind (key into an array,
    /// index into an object, descent through a scalar).
    TypeMismatch(Path),
    /// An `Add`/`Replace` patch carried no value.
    MissingValue(Path),
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PathNotFound(path) => write!(f, "path {path} not found"),
            Self::TypeMismatch(path) => write!(f, "segment kind mismatch at {path}"),
            Self::MissingValue(path) => write!(f, "patch at {path} is missing its value"),
        }
    }
}

impl std::error::Error for PatchError {}

/// Apply one patch to `root` in place.
pub fn apply_patch(root: &mut Value, patch: &Patch) -> Result<(), PatchError> {
    let segments = patch.path.segments();
    let Some((last, parents)) = segments.split_last() else {
        // Root replacement is the only operation with an empty path.
        return match patch.op {
            PatchOp::Replace => {
                *root = required_value(patch)?.clone();
                Ok(())
            }
            _ => Err(PatchError::TypeMismatch(patch.path.clone())),
        };
    };

    let mut node = root;
    for seg in parents {
        node = descend(node, seg).ok_or_else(|| PatchError::PathNotFound(patch.path.clone()))?;
    }

    match (patch.op, last) {
        (PatchOp::Replace, seg) => {
            let slot =
                descend(node, seg).ok_or_else(|| PatchError::PathNotFound(patch.path.clone()))?;
            *slot = required_value(patch)?.clone();
            Ok(())
        }
        (PatchOp::Add, PathSeg::Index(index)) => {
            let seq = node
                .as_array_mut()
                .ok_or_else(|| PatchError::TypeMismatch(patch.path.clone()))?;
            if *index > seq.len() {
                return Err(PatchError::PathNotFound(patch.path.clone()));
            }
            seq.insert(*index, required_value(patch)?.clone());
            Ok(())
        }
        (PatchOp::Add, PathSeg::Key(key)) => {
            let map = node
                .as_object_mut()
                .ok_or_else(|| PatchError::TypeMismatch(patch.path.clone()))?;
            map.insert(key.clone(), required_value(patch)?.clone());
            Ok(())
        }
        (PatchOp::Remove, PathSeg::Index(index)) => {
            let seq = node
                .as_array_mut()
                .ok_or_else(|| PatchError::TypeMismatch(patch.path.clone()))?;
            if *index >= seq.len() {
                return Err(PatchError::PathNotFound(patch.path.clone()));
            }
            seq.remove(*index);
            Ok(())
        }
        (PatchOp::Remove, PathSeg::Key(key)) => {
            let map = node
                .as_object_mut()
                .ok_or_else(|| PatchError::TypeMismatch(patch.path.clone()))?;
            map.remove(key)
                .map(|_| ())
                .ok_or_else(|| PatchError::PathNotFound(patch.path.clone()))
        }
    }
}

/// Apply a patch list in order.
pub fn apply_patches(root: &mut Value, patches: &[Patch]) -> Result<(), PatchError> {
    for patch in patches {
        apply_patch(root, patch)?;
    }
    Ok(())
}

fn required_value(patch: &Patch) -> Result<&Value, PatchError> {
    patch
        .value
        .as_ref()
        .ok_or_else(|| PatchError::MissingValue(patch.path.clone()))
}

fn descend<'v>(node: &'v mut Value, seg: &PathSeg) -> Option<&'v mut Value> {
    match seg {
        PathSeg::Key(key) => node.as_object_mut()?.get_mut(key),
        PathSeg::Index(index) => node.as_array_mut()?.get_mut(*index),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree() -> Value {
        json!({
            "title": "term 1",
            "subjects": [
                {"name": "maths"},
                {"name": "physique"},
            ],
        })
    }

    #[test]
    fn path_display() {
        let path = Path::root().key("subjects").index(1).key("name");
        assert_eq!(path.to_string(), "/subjects/1/name");
        assert_eq!(Path::root().to_string(), "/");
    }

    #[test]
    fn replace_leaf() {
        let mut value = tree();
        let patch = Patch::replace(
            Path::root().key("subjects").index(0).key("name"),
            json!("chimie"),
        );
        apply_patch(&mut value, &patch).unwrap();
        assert_eq!(value["subjects"][0]["name"], json!("chimie"));
    }

    #[test]
    fn add_into_sequence() {
        let mut value = tree();
        let patch = Patch::add(Path::root().key("subjects").index(2), json!({"name": "svt"}));
        apply_patch(&mut value, &patch).unwrap();
        assert_eq!(value["subjects"].as_array().unwrap().len(), 3);
        assert_eq!(value["subjects"][2]["name"], json!("svt"));
    }

    #[test]
    fn add_past_end_is_path_not_found() {
        let mut value = tree();
        let patch = Patch::add(Path::root().key("subjects").index(5), json!({}));
        assert!(matches!(
            apply_patch(&mut value, &patch),
            Err(PatchError::PathNotFound(_))
        ));
    }

    #[test]
    fn remove_sequence_element() {
        let mut value = tree();
        let patch = Patch::remove(Path::root().key("subjects").index(0));
        apply_patch(&mut value, &patch).unwrap();
        assert_eq!(value["subjects"].as_array().unwrap().len(), 1);
        assert_eq!(value["subjects"][0]["name"], json!("physique"));
    }

    #[test]
    fn remove_missing_key_fails() {
        let mut value = tree();
        let patch = Patch::remove(Path::root().key("nonexistent"));
        assert!(matches!(
            apply_patch(&mut value, &patch),
            Err(PatchError::PathNotFound(_))
        ));
    }

    #[test]
    fn key_into_array_is_type_mismatch() {
        let mut value = tree();
        let patch = Patch::replace(Path::root().key("subjects").key("name"), json!(1));
        assert!(matches!(
            apply_patch(&mut value, &patch),
            Err(PatchError::TypeMismatch(_))
        ));
    }

    #[test]
    fn replace_without_value_fails() {
        let mut value = tree();
        let patch = Patch {
            op: PatchOp::Replace,
            path: Path::root().key("title"),
            value: None,
        };
        assert!(matches!(
            apply_patch(&mut value, &patch),
            Err(PatchError::MissingValue(_))
        ));
    }

    #[test]
    fn root_replace() {
        let mut value = tree();
        apply_patch(&mut value, &Patch::replace(Path::root(), json!(42))).unwrap();
        assert_eq!(value, json!(42));
    }

    #[test]
    fn patch_serde_round_trip() {
        let patch = Patch::add(Path::root().key("subjects").index(2), json!({"name": "svt"}));
        let text = serde_json::to_string(&patch).unwrap();
        let back: Patch = serde_json::from_str(&text).unwrap();
        assert_eq!(back, patch);
    }
}
