#![forbid(unsafe_code)]

//! End-to-end exercise of the store + undo stack pair.
//!
//! Drives a realistic editing session against a small document: scalar
//! edits with merging, sequence edits, grouped compound edits, and full
//! undo/redo traversals, checking the value tree byte-for-byte at each
//! checkpoint.

use serde::{Deserialize, Serialize};
use serde_json::json;

use colloscope_state::{Path, Store, UndoStack};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Planner {
    name: String,
    first_week: i64,
    slots: Vec<String>,
}

fn new_session() -> (Store<Planner>, UndoStack) {
    let store = Store::new(Planner {
        name: "colloscope".into(),
        first_week: 1,
        slots: Vec::new(),
    });
    (store, UndoStack::new())
}

#[test]
fn editing_session_with_merges_and_groups() {
    let (mut store, mut stack) = new_session();
    let initial = store.value().clone();

    // Typing burst on the name field: one undo step.
    for name in ["c", "co", "col", "colle"] {
        stack.commit(&mut store, move |_, draft| {
            draft.set(Path::root().key("name"), json!(name));
        });
    }
    assert_eq!(stack.undo_depth(), 1);
    assert_eq!(store.state().name, "colle");

    // Unrelated scalar edit: separate step.
    stack.commit(&mut store, |_, draft| {
        draft.set(Path::root().key("first_week"), json!(12));
    });
    assert_eq!(stack.undo_depth(), 2);

    // Grouped compound edit: rename + two slot inserts, atomic.
    stack.start_group();
    stack.commit(&mut store, |_, draft| {
        draft.set(Path::root().key("name"), json!("colloscope 2"));
    });
    stack.commit(&mut store, |_, draft| {
        draft.push(Path::root().key("slots"), json!("mon 8h"));
    });
    stack.commit(&mut store, |_, draft| {
        draft.push(Path::root().key("slots"), json!("tue 17h"));
    });
    stack.end_group();
    assert_eq!(stack.undo_depth(), 3);

    let final_value = store.value().clone();

    // One undo reverts the whole group.
    assert!(stack.undo(&mut store));
    assert_eq!(store.state().name, "colle");
    assert!(store.state().slots.is_empty());

    // Unwind the rest.
    assert!(stack.undo(&mut store));
    assert!(stack.undo(&mut store));
    assert!(!stack.undo(&mut store));
    assert_eq!(store.value(), &initial);

    // Replay everything.
    assert!(stack.redo(&mut store));
    assert!(stack.redo(&mut store));
    assert!(stack.redo(&mut store));
    assert!(!stack.redo(&mut store));
    assert_eq!(store.value(), &final_value);
}

#[test]
fn redo_branch_is_discarded_on_new_edit() {
    let (mut store, mut stack) = new_session();

    stack.commit(&mut store, |_, draft| {
        draft.set(Path::root().key("first_week"), json!(2));
    });
    stack.commit_with(
        &mut store,
        |_, draft| draft.set(Path::root().key("first_week"), json!(3)),
        false,
    );
    stack.undo(&mut store);
    assert!(stack.can_redo());
    assert_eq!(store.state().first_week, 2);

    stack.commit_with(
        &mut store,
        |_, draft| draft.push(Path::root().key("slots"), json!("wed 10h")),
        false,
    );
    assert!(!stack.can_redo());

    // History is linear again: undoing twice reaches the initial state.
    stack.undo(&mut store);
    stack.undo(&mut store);
    assert_eq!(store.state().first_week, 1);
    assert!(store.state().slots.is_empty());
}

#[test]
fn merge_spanning_back_to_origin_leaves_depth_unchanged() {
    let (mut store, mut stack) = new_session();

    stack.commit_with(
        &mut store,
        |_, draft| draft.set(Path::root().key("first_week"), json!(5)),
        false,
    );
    let depth = stack.undo_depth();

    stack.commit(&mut store, |_, draft| {
        draft.set(Path::root().key("first_week"), json!(9));
    });
    stack.commit(&mut store, |_, draft| {
        draft.set(Path::root().key("first_week"), json!(5));
    });

    assert_eq!(stack.undo_depth(), depth);
    assert_eq!(store.state().first_week, 5);
    stack.undo(&mut store);
    assert_eq!(store.state().first_week, 1);
}

#[test]
fn subscribers_observe_every_history_move() {
    use std::cell::Cell;
    use std::rc::Rc;

    let (mut store, mut stack) = new_session();
    let hits = Rc::new(Cell::new(0u32));
    let seen = Rc::clone(&hits);
    store.subscribe(move || seen.set(seen.get() + 1));

    stack.commit(&mut store, |_, draft| {
        draft.set(Path::root().key("name"), json!("a"));
    });
    stack.undo(&mut store);
    stack.redo(&mut store);
    assert_eq!(hits.get(), 3);
}
