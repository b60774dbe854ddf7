#![forbid(unsafe_code)]

//! Property tests for undo-stack invariants.
//!
//! Validates, over random edit/undo/redo/group sequences:
//! - Unwinding the whole undo stack restores the initial value tree
//!   exactly, merges and groups included.
//! - Replaying the whole redo stack restores the final tree exactly.
//! - Undo and redo depths stay consistent with the moves performed.

use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

use colloscope_state::{Path, Store, UndoStack};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Doc {
    title: String,
    counters: Vec<i64>,
}

#[derive(Debug, Clone)]
enum Op {
    SetTitle(String, bool),
    PushCounter(i64),
    SetCounter(usize, i64),
    PopCounter,
    Undo,
    Redo,
    GroupedPair(String, i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => ("[a-z]{0,6}", any::<bool>()).prop_map(|(t, m)| Op::SetTitle(t, m)),
        2 => any::<i64>().prop_map(Op::PushCounter),
        2 => (any::<usize>(), any::<i64>()).prop_map(|(i, v)| Op::SetCounter(i, v)),
        1 => Just(Op::PopCounter),
        2 => Just(Op::Undo),
        2 => Just(Op::Redo),
        1 => ("[a-z]{0,6}", any::<i64>()).prop_map(|(t, v)| Op::GroupedPair(t, v)),
    ]
}

fn apply(op: &Op, store: &mut Store<Doc>, stack: &mut UndoStack) {
    match op {
        Op::SetTitle(title, merge) => {
            let value = json!(title);
            stack.commit_with(
                store,
                move |_, draft| draft.set(Path::root().key("title"), value),
                *merge,
            );
        }
        Op::PushCounter(v) => {
            let value = json!(v);
            stack.commit_with(
                store,
                move |_, draft| draft.push(Path::root().key("counters"), value),
                false,
            );
        }
        Op::SetCounter(index, v) => {
            let len = store.state().counters.len();
            if len == 0 {
                return;
            }
            let slot = index % len;
            let value = json!(v);
            stack.commit(store, move |_, draft| {
                draft.set(Path::root().key("counters").index(slot), value);
            });
        }
        Op::PopCounter => {
            let len = store.state().counters.len();
            if len == 0 {
                return;
            }
            stack.commit_with(
                store,
                move |_, draft| draft.remove(Path::root().key("counters").index(len - 1)),
                false,
            );
        }
        Op::Undo => {
            stack.undo(store);
        }
        Op::Redo => {
            stack.redo(store);
        }
        Op::GroupedPair(title, v) => {
            let title = json!(title);
            let value = json!(v);
            stack.start_group();
            stack.commit_with(
                store,
                move |_, draft| draft.set(Path::root().key("title"), title),
                false,
            );
            stack.commit_with(
                store,
                move |_, draft| draft.push(Path::root().key("counters"), value),
                false,
            );
            stack.end_group();
        }
    }
}

fn initial_doc() -> Doc {
    Doc {
        title: "start".into(),
        counters: vec![0],
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn full_unwind_restores_initial_tree(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut store = Store::new(initial_doc());
        let mut stack = UndoStack::new();
        let initial = store.value().clone();

        for op in &ops {
            apply(op, &mut store, &mut stack);
        }

        while stack.undo(&mut store) {}
        prop_assert_eq!(store.value(), &initial);
    }

    #[test]
    fn full_replay_restores_final_tree(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut store = Store::new(initial_doc());
        let mut stack = UndoStack::new();

        for op in &ops {
            apply(op, &mut store, &mut stack);
        }
        let final_value = store.value().clone();

        while stack.undo(&mut store) {}
        while stack.redo(&mut store) {}
        prop_assert_eq!(store.value(), &final_value);
    }

    #[test]
    fn undo_then_redo_is_identity_at_every_depth(
        ops in prop::collection::vec(op_strategy(), 1..30),
        steps in 1usize..10,
    ) {
        let mut store = Store::new(initial_doc());
        let mut stack = UndoStack::new();

        for op in &ops {
            apply(op, &mut store, &mut stack);
        }
        let checkpoint = store.value().clone();

        let mut undone = 0;
        for _ in 0..steps {
            if stack.undo(&mut store) {
                undone += 1;
            }
        }
        for _ in 0..undone {
            prop_assert!(stack.redo(&mut store));
        }
        prop_assert_eq!(store.value(), &checkpoint);
    }

    #[test]
    fn depths_track_moves(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut store = Store::new(initial_doc());
        let mut stack = UndoStack::new();

        for op in &ops {
            apply(op, &mut store, &mut stack);
        }

        let undo_before = stack.undo_depth();
        let redo_before = stack.redo_depth();
        if stack.undo(&mut store) {
            prop_assert_eq!(stack.undo_depth(), undo_before - 1);
            prop_assert_eq!(stack.redo_depth(), redo_before + 1);
        } else {
            prop_assert_eq!(stack.undo_depth(), 0);
        }
    }
}
