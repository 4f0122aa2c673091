//! Dirty-flag tracking around a reducer.

use crate::reducer::{ChangeEffect, CommandKind, Reducer};
use std::sync::Arc;

/// Wrapped state plus whether it changed since the last checkpoint
#[derive(Debug)]
pub struct Tracked<S> {
    pub state: Arc<S>,
    pub is_dirty: bool,
}

impl<S> Clone for Tracked<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            is_dirty: self.is_dirty,
        }
    }
}

impl<S> Tracked<S> {
    /// Clean state
    pub fn new(state: Arc<S>) -> Self {
        Self {
            state,
            is_dirty: false,
        }
    }
}

/// Change-detection enhancer
#[derive(Debug, Default, Clone)]
pub struct WithChangeDetection<R> {
    inner: R,
}

impl<R> WithChangeDetection<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R> Reducer for WithChangeDetection<R>
where
    R: Reducer,
    R::Command: CommandKind,
{
    type State = Tracked<R::State>;
    type Command = R::Command;

    fn reduce(&self, tracked: &Arc<Self::State>, command: &Self::Command) -> Arc<Self::State> {
        let state = self.inner.reduce(&tracked.state, command);
        let unchanged = Arc::ptr_eq(&state, &tracked.state);

        let is_dirty = match command.change_effect() {
            ChangeEffect::Reset => false,
            ChangeEffect::Ignore => tracked.is_dirty,
            ChangeEffect::Track if unchanged => tracked.is_dirty,
            ChangeEffect::Track => true,
        };

        if unchanged && is_dirty == tracked.is_dirty {
            return Arc::clone(tracked);
        }

        Arc::new(Tracked { state, is_dirty })
    }
}
