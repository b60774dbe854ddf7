#![forbid(unsafe_code)]

//! The editing session context.
//!
//! [`Session`] bundles the store, the undo stack and the id generator
//! into one explicitly constructed object passed by reference — there is
//! no ambient global state. Its lifetime is the application session's.
//!
//! The holiday refresh is the session's sole asynchronous operation: the
//! fetch is awaited first, then holidays and recomputed weeks land in a
//! single store mutation, so the previous week list stays visible until
//! the future resolves and no partial state is ever observable. The
//! store stays fully available for unrelated synchronous edits while a
//! fetch is pending; its eventual write simply lands on whatever state
//! is current by then.

use std::sync::Arc;

use colloscope_state::{Draft, Store, UndoStack};

use crate::calendar::{Calendar, HolidayService};
use crate::id::IdGen;
use crate::ops;
use crate::state::State;

/// Store + undo stack + id generator for one editing session.
#[derive(Debug)]
pub struct Session {
    pub store: Store<State>,
    pub undo: UndoStack,
    pub ids: IdGen,
}

impl Session {
    /// Wrap an existing state; `ids` must be the generator its entities
    /// were minted from.
    #[must_use]
    pub fn new(state: State, ids: IdGen) -> Self {
        Self {
            store: Store::new(state),
            undo: UndoStack::new(),
            ids,
        }
    }

    /// Fresh session around a calendar, with the initial week sequence
    /// already derived. `ids` is the generator the calendar's entities
    /// were minted from (a new one for an empty calendar).
    #[must_use]
    pub fn from_calendar(calendar: Calendar, ids: IdGen) -> Self {
        let mut state = State::new(calendar);
        state.weeks = state.calendar.working_weeks(&ids);
        Self::new(state, ids)
    }

    /// The current snapshot.
    #[must_use]
    pub fn state(&self) -> Arc<State> {
        self.store.state()
    }

    /// Record one undoable edit; see [`UndoStack::commit`].
    pub fn commit<F>(&mut self, produce: F) -> bool
    where
        F: FnOnce(&State, &mut Draft<'_>),
    {
        self.undo.commit(&mut self.store, produce)
    }

    /// [`commit`](Self::commit) with explicit merge control.
    pub fn commit_with<F>(&mut self, produce: F, should_merge: bool) -> bool
    where
        F: FnOnce(&State, &mut Draft<'_>),
    {
        self.undo.commit_with(&mut self.store, produce, should_merge)
    }

    pub fn start_group(&mut self) {
        self.undo.start_group();
    }

    pub fn end_group(&mut self) {
        self.undo.end_group();
    }

    #[must_use]
    pub fn is_grouped(&self) -> bool {
        self.undo.is_grouped()
    }

    pub fn undo(&mut self) -> bool {
        self.undo.undo(&mut self.store)
    }

    pub fn redo(&mut self) -> bool {
        self.undo.redo(&mut self.store)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    /// Fetch holiday data for the calendar's academy and land it, with
    /// the recomputed week sequence, in one atomic store mutation.
    ///
    /// Not an undo step: refreshed holidays are ambient data, not a user
    /// edit.
    pub async fn update_weeks_and_holidays<H: HolidayService>(
        &mut self,
        service: &H,
    ) -> Result<(), H::Error> {
        let calendar = self.store.state().calendar.clone();
        let refresh = calendar.fetch_refresh(service).await?;
        let ids = &self.ids;
        self.store.mutate(|_, draft| {
            ops::apply_holiday_refresh(draft, &refresh, ids);
        });
        tracing::debug!(
            school_holidays = refresh.school_holidays.len(),
            public_holidays = refresh.public_holidays.len(),
            "holidays refreshed"
        );
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
