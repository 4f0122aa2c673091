//! # Undo/Redo History
//!
//! Wraps any [`Reducer`] with past/present/future snapshot stacks.
//!
//! ## Design
//!
//! - History stores whole state snapshots (`Arc`s), not inverse edits
//! - Undo then redo restores the exact same snapshot pointer
//! - A new edit clears the redo stack
//! - Consecutive edits can collapse into one undo step via `continue_previous`
//! - A command that leaves the inner state untouched adds no undo level
//!
//! ## Example
//!
//! ```rust,ignore
//! let reducer = WithHistory::new(BlockStore);
//! let history = Arc::new(History::new(Arc::new(BlockTree::new())));
//!
//! let history = reducer.reduce(&history, &HistoryCommand::apply(command));
//! let history = reducer.reduce(&history, &HistoryCommand::Undo);
//! ```

use crate::reducer::{ChangeEffect, CommandKind, HistoryEffect, Reducer};
use std::fmt;
use std::sync::Arc;

/// Snapshot stacks around the present state
pub struct History<S> {
    /// Older snapshots (most recent last)
    past: im::Vector<Arc<S>>,

    present: Arc<S>,

    /// Undone snapshots (next redo first)
    future: im::Vector<Arc<S>>,
}

impl<S> Clone for History<S> {
    fn clone(&self) -> Self {
        Self {
            past: self.past.clone(),
            present: Arc::clone(&self.present),
            future: self.future.clone(),
        }
    }
}

impl<S> fmt::Debug for History<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("undo_levels", &self.past.len())
            .field("redo_levels", &self.future.len())
            .finish()
    }
}

impl<S> History<S> {
    /// History with no undo or redo levels
    pub fn new(present: Arc<S>) -> Self {
        Self {
            past: im::Vector::new(),
            present,
            future: im::Vector::new(),
        }
    }

    pub fn present(&self) -> &Arc<S> {
        &self.present
    }

    pub fn past(&self) -> &im::Vector<Arc<S>> {
        &self.past
    }

    pub fn future(&self) -> &im::Vector<Arc<S>> {
        &self.future
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.past.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.future.len()
    }
}

/// Commands understood by [`WithHistory`]
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryCommand<C> {
    Undo,
    Redo,
    Apply {
        command: C,

        /// Fold this edit into the current undo step instead of opening a new one
        continue_previous: bool,
    },
}

impl<C> HistoryCommand<C> {
    /// Apply as a new undo step
    pub fn apply(command: C) -> Self {
        Self::Apply {
            command,
            continue_previous: false,
        }
    }

    /// Apply as part of the current undo step
    pub fn continue_previous(command: C) -> Self {
        Self::Apply {
            command,
            continue_previous: true,
        }
    }
}

impl<C: CommandKind> CommandKind for HistoryCommand<C> {
    fn history_effect(&self) -> HistoryEffect {
        match self {
            HistoryCommand::Apply { command, .. } => command.history_effect(),
            HistoryCommand::Undo | HistoryCommand::Redo => HistoryEffect::Record,
        }
    }

    fn change_effect(&self) -> ChangeEffect {
        match self {
            HistoryCommand::Apply { command, .. } => command.change_effect(),
            HistoryCommand::Undo | HistoryCommand::Redo => ChangeEffect::Track,
        }
    }
}

/// History enhancer
#[derive(Debug, Default, Clone)]
pub struct WithHistory<R> {
    inner: R,
}

impl<R> WithHistory<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R> Reducer for WithHistory<R>
where
    R: Reducer,
    R::Command: CommandKind,
{
    type State = History<R::State>;
    type Command = HistoryCommand<R::Command>;

    fn reduce(&self, state: &Arc<Self::State>, command: &Self::Command) -> Arc<Self::State> {
        match command {
            HistoryCommand::Undo => {
                let Some(previous) = state.past.last() else {
                    return Arc::clone(state);
                };
                let mut next = History::clone(state);
                next.past.pop_back();
                next.future.push_front(Arc::clone(&state.present));
                next.present = Arc::clone(previous);
                Arc::new(next)
            }

            HistoryCommand::Redo => {
                let Some(following) = state.future.front() else {
                    return Arc::clone(state);
                };
                let mut next = History::clone(state);
                next.future.pop_front();
                next.past.push_back(Arc::clone(&state.present));
                next.present = Arc::clone(following);
                Arc::new(next)
            }

            HistoryCommand::Apply {
                command,
                continue_previous,
            } => self.apply(state, command, *continue_previous),
        }
    }
}

impl<R> WithHistory<R>
where
    R: Reducer,
    R::Command: CommandKind,
{
    fn apply(
        &self,
        state: &Arc<History<R::State>>,
        command: &R::Command,
        continue_previous: bool,
    ) -> Arc<History<R::State>> {
        let effect = command.history_effect();
        let present = self.inner.reduce(&state.present, command);

        if effect == HistoryEffect::Reset {
            return Arc::new(History::new(present));
        }

        if effect == HistoryEffect::Rewrite {
            return self.rewrite(state, command, present);
        }

        if Arc::ptr_eq(&present, &state.present) {
            return Arc::clone(state);
        }

        let mut next = History::clone(state);
        next.present = present;

        if effect == HistoryEffect::Skip {
            return Arc::new(next);
        }

        if !(continue_previous && next.can_undo()) {
            next.past.push_back(Arc::clone(&state.present));
        }
        next.future.clear();
        Arc::new(next)
    }

    /// Apply a command to every snapshot without adding an undo level
    fn rewrite(
        &self,
        state: &Arc<History<R::State>>,
        command: &R::Command,
        present: Arc<R::State>,
    ) -> Arc<History<R::State>> {
        let mut changed = !Arc::ptr_eq(&present, &state.present);
        let mut rewrite_all = |snapshots: &im::Vector<Arc<R::State>>| {
            snapshots
                .iter()
                .map(|snapshot| {
                    let rewritten = self.inner.reduce(snapshot, command);
                    changed |= !Arc::ptr_eq(&rewritten, snapshot);
                    rewritten
                })
                .collect::<im::Vector<_>>()
        };

        let past = rewrite_all(&state.past);
        let future = rewrite_all(&state.future);

        if !changed {
            return Arc::clone(state);
        }

        Arc::new(History {
            past,
            present,
            future,
        })
    }
}
