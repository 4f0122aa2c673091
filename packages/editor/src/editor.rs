//! # Editor
//!
//! Owns the editing state of one document and routes commands through the
//! reducer chain.
//!
//! ## Composition
//!
//! ```text
//! EditorCommand::Edit ──→ WithChangeDetection ──→ WithHistory ──→ BlockStore
//!         │                      (is_dirty)       (undo/redo)      (tree)
//!         └──────────────→ Selection::on_tree_command
//!
//! EditorCommand::Select ──→ SelectionReducer
//! ```
//!
//! Undo and redo also pass through the chain, so they mark the document
//! dirty. After either, a selection pointing at a block that no longer
//! exists is cleared.

use crate::block::{BlockNode, ClientId};
use crate::change_detection::{Tracked, WithChangeDetection};
use crate::history::{History, HistoryCommand, WithHistory};
use crate::reducer::Reducer;
use crate::selection::{MultiSelectionCache, Selection, SelectionCommand, SelectionReducer};
use crate::tree::{should_continue_previous, BlockStore, BlockTree, TreeCommand};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

type EditorReducer = WithChangeDetection<WithHistory<BlockStore>>;

/// Anything the editor can be asked to do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EditorCommand {
    Edit(TreeCommand),
    Undo,
    Redo,
    Select(SelectionCommand),
}

/// Outcome of [`Editor::dispatch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchResult {
    /// Editor version after the command
    pub version: u64,

    /// Whether any state (tree, history, dirty flag or selection) changed
    pub changed: bool,
}

/// Editing state of one document
#[derive(Debug)]
pub struct Editor {
    reducer: EditorReducer,
    state: Arc<Tracked<History<BlockTree>>>,
    selection: Arc<Selection>,

    /// Previous edit, used to batch consecutive attribute updates
    last_edit: Option<TreeCommand>,

    /// Increments on every command that changed something
    version: u64,

    multi_selection: MultiSelectionCache,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    /// Editor over an empty document
    pub fn new() -> Self {
        let tree = Arc::new(BlockTree::new());
        Self {
            reducer: WithChangeDetection::new(WithHistory::new(BlockStore)),
            state: Arc::new(Tracked::new(Arc::new(History::new(tree)))),
            selection: Arc::default(),
            last_edit: None,
            version: 0,
            multi_selection: MultiSelectionCache::new(),
        }
    }

    /// Editor with a loaded document (clean, no history)
    pub fn with_blocks(blocks: Vec<BlockNode>) -> Self {
        let mut editor = Self::new();
        editor.dispatch(EditorCommand::Edit(TreeCommand::ResetBlocks(blocks)));
        editor.version = 0;
        editor
    }

    /// Apply a command
    pub fn dispatch(&mut self, command: EditorCommand) -> DispatchResult {
        let (state, selection) = match &command {
            EditorCommand::Edit(edit) => {
                let continue_previous = should_continue_previous(self.last_edit.as_ref(), edit);
                let history_command = HistoryCommand::Apply {
                    command: edit.clone(),
                    continue_previous,
                };
                let state = self.reducer.reduce(&self.state, &history_command);
                let selection = Selection::on_tree_command(&self.selection, edit);
                (state, selection)
            }

            EditorCommand::Undo | EditorCommand::Redo => {
                let history_command = if command == EditorCommand::Undo {
                    HistoryCommand::Undo
                } else {
                    HistoryCommand::Redo
                };
                let state = self.reducer.reduce(&self.state, &history_command);
                let selection =
                    Selection::retain_existing(&self.selection, state.state.present());
                (state, selection)
            }

            EditorCommand::Select(select) => (
                Arc::clone(&self.state),
                SelectionReducer.reduce(&self.selection, select),
            ),
        };

        self.last_edit = match command {
            EditorCommand::Edit(edit) => Some(edit),
            _ => None,
        };

        let changed =
            !Arc::ptr_eq(&state, &self.state) || !Arc::ptr_eq(&selection, &self.selection);
        if changed {
            self.state = state;
            self.selection = selection;
            self.version += 1;
        }

        DispatchResult {
            version: self.version,
            changed,
        }
    }

    /// Apply several commands in order; returns the final result
    pub fn dispatch_all(
        &mut self,
        commands: impl IntoIterator<Item = EditorCommand>,
    ) -> DispatchResult {
        let mut result = DispatchResult {
            version: self.version,
            changed: false,
        };
        for command in commands {
            let step = self.dispatch(command);
            result.version = step.version;
            result.changed |= step.changed;
        }
        result
    }

    /// Present tree
    pub fn tree(&self) -> &Arc<BlockTree> {
        self.state.state.present()
    }

    pub fn history(&self) -> &Arc<History<BlockTree>> {
        &self.state.state
    }

    /// Nested top-level blocks
    pub fn blocks(&self) -> Vec<BlockNode> {
        self.tree().to_nested(None)
    }

    pub fn is_dirty(&self) -> bool {
        self.state.is_dirty
    }

    pub fn can_undo(&self) -> bool {
        self.history().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history().can_redo()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn selection(&self) -> &Arc<Selection> {
        &self.selection
    }

    pub fn selected_block_id(&self) -> Option<&ClientId> {
        self.selection.selected_block_id()
    }

    /// Memoized multi-selection range over the present tree
    pub fn multi_selected_ids(&mut self) -> Arc<Vec<ClientId>> {
        let tree = Arc::clone(self.state.state.present());
        self.multi_selection.get(&self.selection, &tree)
    }
}
