//! # Trellis Editor
//!
//! Undoable, normalized block-tree editing core.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Editor: command routing + selection         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ WithChangeDetection: is_dirty flag          │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ WithHistory: past / present / future        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ BlockStore: normalized tree (by id + order) │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **State is immutable**: every transition returns a new `Arc`
//! 2. **Identity means unchanged**: a no-op hands back the input `Arc`
//! 3. **Structural sharing**: untouched blocks and sibling lists keep their pointers
//! 4. **Edits never fail**: unknown ids make a command a no-op
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trellis_editor::{BlockNode, Editor, EditorCommand, TreeCommand};
//!
//! let mut editor = Editor::with_blocks(vec![BlockNode::new("navigation-link")]);
//!
//! editor.dispatch(EditorCommand::Edit(TreeCommand::InsertBlocks {
//!     blocks: vec![BlockNode::new("navigation-link")],
//!     parent: None,
//!     index: Some(0),
//! }));
//! assert!(editor.is_dirty());
//!
//! editor.dispatch(EditorCommand::Undo);
//! ```

mod block;
mod change_detection;
mod editor;
mod history;
mod reducer;
mod selection;
mod tree;

pub use block::{Attributes, Block, BlockNode, ClientId, RecordId, RECORD_ID_ATTRIBUTE};
pub use change_detection::{Tracked, WithChangeDetection};
pub use editor::{DispatchResult, Editor, EditorCommand};
pub use history::{History, HistoryCommand, WithHistory};
pub use reducer::{ChangeEffect, CommandKind, HistoryEffect, Reducer};
pub use selection::{Focus, MultiSelectionCache, Selection, SelectionCommand, SelectionReducer};
pub use tree::{
    should_continue_previous, BlockStore, BlockTree, FlatEntry, MoveDirection, TreeCommand,
};
