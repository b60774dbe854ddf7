#![forbid(unsafe_code)]

//! Draft recorder: tracked in-place edits over the store's value tree.
//!
//! A [`Draft`] is handed to a mutation producer by
//! [`Store::mutate`](crate::Store::mutate). Every write performs the edit
//! on the underlying tree *and* appends it to an edit log; forward and
//! inverse patch lists are derived directly from that log rather than from
//! a generic deep diff, so patches stay minimal by construction.
//!
//! # Invariants
//!
//! 1. Replaying the forward list against the pre-mutation tree yields the
//!    post-mutation tree exactly.
//! 2. Replaying the inverse list (log reversed, operations inverted)
//!    against the post-mutation tree yields the pre-mutation tree exactly.
//! 3. A `set` that writes a value equal to the current one records
//!    nothing — true no-op edits are invisible to history.
//!
//! # Failure Modes
//!
//! Writes through a path that does not resolve indicate a dangling
//! reference in the producer and panic: an invariant breach must not be
//! silently tolerated.

use serde_json::Value;

use crate::patch::{Patch, Path, PathSeg};

/// One recorded write, with enough captured state to invert it.
#[derive(Debug, Clone)]
enum Edit {
    Replace { path: Path, old: Value, new: Value },
    AddKey { path: Path, new: Value },
    Insert { path: Path, new: Value },
    Remove { path: Path, old: Value },
}

/// Mutable view of the store's value tree with an edit log.
#[derive(Debug)]
pub struct Draft<'a> {
    root: &'a mut Value,
    edits: Vec<Edit>,
}

impl<'a> Draft<'a> {
    pub(crate) fn new(root: &'a mut Value) -> Self {
        Self {
            root,
            edits: Vec::new(),
        }
    }

    /// Read the node at `path`, if present.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&Value> {
        let mut node = &*self.root;
        for seg in path.segments() {
            node = match seg {
                PathSeg::Key(key) => node.as_object()?.get(key)?,
                PathSeg::Index(index) => node.as_array()?.get(*index)?,
            };
        }
        Some(node)
    }

    /// Length of the sequence at `path`, if it is one.
    #[must_use]
    pub fn seq_len(&self, path: &Path) -> Option<usize> {
        self.get(path)?.as_array().map(Vec::len)
    }

    /// Write `value` at `path`.
    ///
    /// Replaces an existing node, or adds a missing map key. Writing a
    /// value equal to the current one records nothing. Sequence slots can
    /// only be replaced, never grown; use [`insert`](Self::insert) or
    /// [`push`](Self::push) for that.
    ///
    /// # Panics
    ///
    /// Panics when the path does not resolve (dangling reference in the
    /// producer).
    pub fn set(&mut self, path: Path, value: Value) {
        if path.is_root() {
            if *self.root == value {
                return;
            }
            let old = self.root.clone();
            *self.root = value.clone();
            self.edits.push(Edit::Replace {
                path,
                old,
                new: value,
            });
            return;
        }

        let (parent, last) = split_path(&path);
        match last {
            PathSeg::Key(key) => {
                let map = self
                    .node_mut(&parent)
                    .and_then(Value::as_object_mut)
                    .unwrap_or_else(|| panic!("draft set: no object at {parent}"));
                match map.get(key) {
                    Some(old) if *old == value => {}
                    Some(old) => {
                        let old = old.clone();
                        map.insert(key.clone(), value.clone());
                        self.edits.push(Edit::Replace {
                            path,
                            old,
                            new: value,
                        });
                    }
                    None => {
                        map.insert(key.clone(), value.clone());
                        self.edits.push(Edit::AddKey { path, new: value });
                    }
                }
            }
            PathSeg::Index(index) => {
                let seq = self
                    .node_mut(&parent)
                    .and_then(Value::as_array_mut)
                    .unwrap_or_else(|| panic!("draft set: no sequence at {parent}"));
                let slot = seq
                    .get_mut(*index)
                    .unwrap_or_else(|| panic!("draft set: index out of range at {path}"));
                if *slot == value {
                    return;
                }
                let old = slot.clone();
                *slot = value.clone();
                self.edits.push(Edit::Replace {
                    path,
                    old,
                    new: value,
                });
            }
        }
    }

    /// Insert `value` at `index` of the sequence at `seq_path`.
    ///
    /// # Panics
    ///
    /// Panics when `seq_path` is not a sequence or `index > len`.
    pub fn insert(&mut self, seq_path: Path, index: usize, value: Value) {
        let seq = self
            .node_mut(&seq_path)
            .and_then(Value::as_array_mut)
            .unwrap_or_else(|| panic!("draft insert: no sequence at {seq_path}"));
        assert!(
            index <= seq.len(),
            "draft insert: index {index} out of range at {seq_path}"
        );
        seq.insert(index, value.clone());
        self.edits.push(Edit::Insert {
            path: seq_path.index(index),
            new: value,
        });
    }

    /// Append `value` to the sequence at `seq_path`.
    pub fn push(&mut self, seq_path: Path, value: Value) {
        let len = self
            .seq_len(&seq_path)
            .unwrap_or_else(|| panic!("draft push: no sequence at {seq_path}"));
        self.insert(seq_path, len, value);
    }

    /// Remove the node at `path` (a sequence element or a map key).
    ///
    /// # Panics
    ///
    /// Panics when the path does not resolve.
    pub fn remove(&mut self, path: Path) {
        let (parent, last) = split_path(&path);
        let old = match last {
            PathSeg::Key(key) => self
                .node_mut(&parent)
                .and_then(Value::as_object_mut)
                .unwrap_or_else(|| panic!("draft remove: no object at {parent}"))
                .remove(key)
                .unwrap_or_else(|| panic!("draft remove: no key at {path}")),
            PathSeg::Index(index) => {
                let seq = self
                    .node_mut(&parent)
                    .and_then(Value::as_array_mut)
                    .unwrap_or_else(|| panic!("draft remove: no sequence at {parent}"));
                assert!(
                    *index < seq.len(),
                    "draft remove: index {index} out of range at {path}"
                );
                seq.remove(*index)
            }
        };
        self.edits.push(Edit::Remove { path, old });
    }

    /// Consume the draft, yielding `(forward, inverse)` patch lists.
    pub(crate) fn finish(self) -> (Vec<Patch>, Vec<Patch>) {
        let forward = self
            .edits
            .iter()
            .map(|edit| match edit {
                Edit::Replace { path, new, .. } => Patch::replace(path.clone(), new.clone()),
                Edit::AddKey { path, new } | Edit::Insert { path, new } => {
                    Patch::add(path.clone(), new.clone())
                }
                Edit::Remove { path, .. } => Patch::remove(path.clone()),
            })
            .collect();
        let inverse = self
            .edits
            .iter()
            .rev()
            .map(|edit| match edit {
                Edit::Replace { path, old, .. } => Patch::replace(path.clone(), old.clone()),
                Edit::AddKey { path, .. } | Edit::Insert { path, .. } => {
                    Patch::remove(path.clone())
                }
                Edit::Remove { path, old } => Patch::add(path.clone(), old.clone()),
            })
            .collect();
        (forward, inverse)
    }

    fn node_mut(&mut self, path: &Path) -> Option<&mut Value> {
        let mut node = &mut *self.root;
        for seg in path.segments() {
            node = match seg {
                PathSeg::Key(key) => node.as_object_mut()?.get_mut(key)?,
                PathSeg::Index(index) => node.as_array_mut()?.get_mut(*index)?,
            };
        }
        Some(node)
    }
}

/// Split a non-root path into (parent, last segment).
fn split_path(path: &Path) -> (Path, &PathSeg) {
    let (last, parents) = path
        .segments()
        .split_last()
        .expect("draft write through the root path must use set");
    let mut parent = Path::root();
    for seg in parents {
        parent = match seg {
            PathSeg::Key(key) => parent.key(key.clone()),
            PathSeg::Index(index) => parent.index(*index),
        };
    }
    (parent, last)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{PatchOp, apply_patches};
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
    fn set_records_replace_with_old_value() {
        let mut value = tree();
        let before = value.clone();
        let mut draft = Draft::new(&mut value);
        draft.set(Path::root().key("title"), json!("term 2"));
        let (forward, inverse) = draft.finish();

        assert_eq!(forward.len(), 1);
        assert_eq!(forward[0].op, PatchOp::Replace);
        assert_eq!(inverse[0].value, Some(json!("term 1")));

        let mut replay = before.clone();
        apply_patches(&mut replay, &forward).unwrap();
        assert_eq!(replay, value);
        apply_patches(&mut replay, &inverse).unwrap();
        assert_eq!(replay, before);
    }

    #[test]
    fn set_equal_value_records_nothing() {
        let mut value = tree();
        let mut draft = Draft::new(&mut value);
        draft.set(Path::root().key("title"), json!("term 1"));
        let (forward, inverse) = draft.finish();
        assert!(forward.is_empty());
        assert!(inverse.is_empty());
    }

    #[test]
    fn set_missing_key_records_add() {
        let mut value = tree();
        let mut draft = Draft::new(&mut value);
        draft.set(Path::root().key("notes"), json!("brouillon"));
        let (forward, inverse) = draft.finish();
        assert_eq!(forward[0].op, PatchOp::Add);
        assert_eq!(inverse[0].op, PatchOp::Remove);
    }

    #[test]
    fn insert_then_remove_round_trips() {
        let mut value = tree();
        let before = value.clone();
        let mut draft = Draft::new(&mut value);
        draft.push(Path::root().key("subjects"), json!({"name": "svt"}));
        draft.remove(Path::root().key("subjects").index(0));
        let (forward, inverse) = draft.finish();

        let mut replay = before.clone();
        apply_patches(&mut replay, &forward).unwrap();
        assert_eq!(replay, value);
        apply_patches(&mut replay, &inverse).unwrap();
        assert_eq!(replay, before);
    }

    #[test]
    fn inverse_is_reversed_log() {
        let mut value = tree();
        let mut draft = Draft::new(&mut value);
        draft.set(Path::root().key("title"), json!("a"));
        draft.push(Path::root().key("subjects"), json!({"name": "svt"}));
        let (forward, inverse) = draft.finish();
        assert_eq!(forward.len(), 2);
        // Inverse list undoes the push first, then the title write.
        assert_eq!(inverse[0].op, PatchOp::Remove);
        assert_eq!(inverse[1].op, PatchOp::Replace);
    }

    #[test]
    fn get_reads_through_edits() {
        let mut value = tree();
        let mut draft = Draft::new(&mut value);
        draft.set(
            Path::root().key("subjects").index(0).key("name"),
            json!("chimie"),
        );
        assert_eq!(
            draft.get(&Path::root().key("subjects").index(0).key("name")),
            Some(&json!("chimie"))
        );
        assert_eq!(draft.seq_len(&Path::root().key("subjects")), Some(2));
    }

    #[test]
    #[should_panic(expected = "no sequence")]
    fn push_through_scalar_panics() {
        let mut value = tree();
        let mut draft = Draft::new(&mut value);
        draft.push(Path::root().key("title"), json!(1));
    }
}
