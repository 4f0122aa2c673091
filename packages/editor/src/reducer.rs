use std::sync::Arc;

/// Trait for state transitions
///
/// Each store (and each enhancer wrapping a store) implements this trait.
/// A reducer that leaves the state untouched must hand back the input `Arc`
/// itself, so callers can detect "nothing changed" with `Arc::ptr_eq`.
pub trait Reducer {
    type State;
    type Command;

    /// Compute the next state for a command
    fn reduce(&self, state: &Arc<Self::State>, command: &Self::Command) -> Arc<Self::State>;
}

/// How an edit interacts with undo history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryEffect {
    /// Normal undoable edit
    Record,
    /// Checkpoint: discard past and future (e.g. loading a document)
    Reset,
    /// Applied to the present only, no undo level is created
    Skip,
    /// Applied to the present and to every stored snapshot, no undo level is created
    Rewrite,
}

/// How an edit interacts with the dirty flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEffect {
    /// A changed state marks the document dirty
    Track,
    /// Checkpoint: the document is clean afterwards
    Reset,
    /// State may change but the dirty flag is left alone
    Ignore,
}

/// Classification of commands consumed by the enhancers
pub trait CommandKind {
    fn history_effect(&self) -> HistoryEffect {
        HistoryEffect::Record
    }

    fn change_effect(&self) -> ChangeEffect {
        ChangeEffect::Track
    }
}
