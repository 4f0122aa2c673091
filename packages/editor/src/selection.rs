//! # Block Selection
//!
//! Single and contiguous multi-block selection over one sibling list.
//!
//! A selection is a pair of bounds. `start == end` is a single selection
//! (or none when both are `None`); focus metadata is only meaningful for a
//! single selection. Which blocks a multi-selection covers is always derived
//! from the current sibling order, never from the order bounds were picked in.

use crate::block::ClientId;
use crate::reducer::Reducer;
use crate::tree::{BlockTree, TreeCommand};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Caret / focus metadata attached to a single selection
pub type Focus = BTreeMap<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub start: Option<ClientId>,
    pub end: Option<ClientId>,
    pub focus: Option<Focus>,
    pub is_multi_selecting: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectionCommand {
    Select { id: ClientId, focus: Option<Focus> },
    Clear,
    StartMultiSelect,
    StopMultiSelect,
    MultiSelect { start: ClientId, end: ClientId },
    UpdateFocus { id: ClientId, focus: Focus },
}

impl Selection {
    /// Single selection of `id`
    pub fn single(id: ClientId, focus: Focus) -> Self {
        Self {
            start: Some(id.clone()),
            end: Some(id),
            focus: Some(focus),
            is_multi_selecting: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    fn is_single(&self) -> bool {
        self.start == self.end
    }

    /// The selected block when exactly one block is selected
    pub fn selected_block_id(&self) -> Option<&ClientId> {
        if self.is_single() {
            self.start.as_ref()
        } else {
            None
        }
    }

    /// Ids covered by a multi-selection, in sibling order
    ///
    /// Empty for a single selection and when the bounds are not siblings.
    pub fn multi_selected_ids(&self, tree: &BlockTree) -> Vec<ClientId> {
        self.range(tree)
            .map(|(siblings, from, to)| siblings[from..=to].to_vec())
            .unwrap_or_default()
    }

    pub fn first_multi_selected_id(&self, tree: &BlockTree) -> Option<ClientId> {
        self.range(tree)
            .map(|(siblings, from, _)| siblings[from].clone())
    }

    pub fn last_multi_selected_id(&self, tree: &BlockTree) -> Option<ClientId> {
        self.range(tree).map(|(siblings, _, to)| siblings[to].clone())
    }

    pub fn is_block_multi_selected(&self, tree: &BlockTree, id: &ClientId) -> bool {
        self.range(tree)
            .map(|(siblings, from, to)| siblings[from..=to].contains(id))
            .unwrap_or(false)
    }

    /// Shared sibling list plus normalized inclusive bounds
    fn range<'t>(&self, tree: &'t BlockTree) -> Option<(&'t Arc<Vec<ClientId>>, usize, usize)> {
        let (Some(start), Some(end)) = (&self.start, &self.end) else {
            return None;
        };
        if start == end {
            return None;
        }

        let parent = tree.parent_of(start)?;
        let siblings = tree.sibling_list(Some(parent))?;
        let a = siblings.iter().position(|id| id == start)?;
        let b = siblings.iter().position(|id| id == end)?;
        Some((siblings, a.min(b), a.max(b)))
    }

    /// Follow a tree edit so the selection never points at a deleted block
    pub fn on_tree_command(state: &Arc<Selection>, command: &TreeCommand) -> Arc<Selection> {
        match command {
            TreeCommand::InsertBlocks { blocks, .. } => match blocks.first() {
                Some(first) => Arc::new(Selection::single(first.id.clone(), Focus::new())),
                None => Arc::clone(state),
            },

            TreeCommand::ReplaceBlocks { ids, blocks } => {
                let start_replaced = state.start.as_ref().is_some_and(|id| ids.contains(id));
                let end_replaced = state.end.as_ref().is_some_and(|id| ids.contains(id));
                if !start_replaced && !end_replaced {
                    return Arc::clone(state);
                }

                let (Some(first), Some(last)) = (blocks.first(), blocks.last()) else {
                    return Arc::new(Selection::default());
                };

                let start = if start_replaced {
                    Some(first.id.clone())
                } else {
                    state.start.clone()
                };
                let end = if end_replaced {
                    Some(last.id.clone())
                } else {
                    state.end.clone()
                };
                let focus = (start == end).then(Focus::new);
                Arc::new(Selection {
                    start,
                    end,
                    focus,
                    is_multi_selecting: false,
                })
            }

            TreeCommand::RemoveBlocks(ids) => {
                let touched = [&state.start, &state.end]
                    .into_iter()
                    .flatten()
                    .any(|id| ids.contains(id));
                if touched {
                    Arc::new(Selection::default())
                } else {
                    Arc::clone(state)
                }
            }

            TreeCommand::ResetBlocks(_) => clear(state),

            _ => Arc::clone(state),
        }
    }

    /// Drop a selection whose bounds are no longer in the tree
    pub fn retain_existing(state: &Arc<Selection>, tree: &BlockTree) -> Arc<Selection> {
        let dangling = [&state.start, &state.end]
            .into_iter()
            .flatten()
            .any(|id| !tree.contains(id));
        if dangling {
            Arc::new(Selection::default())
        } else {
            Arc::clone(state)
        }
    }
}

fn clear(state: &Arc<Selection>) -> Arc<Selection> {
    if **state == Selection::default() {
        Arc::clone(state)
    } else {
        Arc::new(Selection::default())
    }
}

/// Reducer for [`SelectionCommand`]
#[derive(Debug, Default, Clone, Copy)]
pub struct SelectionReducer;

impl Reducer for SelectionReducer {
    type State = Selection;
    type Command = SelectionCommand;

    fn reduce(&self, state: &Arc<Selection>, command: &SelectionCommand) -> Arc<Selection> {
        match command {
            SelectionCommand::Select { id, focus } => {
                if state.start.as_ref() == Some(id) && state.end.as_ref() == Some(id) {
                    return Arc::clone(state);
                }
                Arc::new(Selection {
                    start: Some(id.clone()),
                    end: Some(id.clone()),
                    focus: Some(focus.clone().unwrap_or_default()),
                    is_multi_selecting: state.is_multi_selecting,
                })
            }

            SelectionCommand::Clear => clear(state),

            SelectionCommand::StartMultiSelect => {
                if state.is_multi_selecting {
                    return Arc::clone(state);
                }
                Arc::new(Selection {
                    is_multi_selecting: true,
                    ..Selection::clone(state)
                })
            }

            SelectionCommand::StopMultiSelect => {
                if !state.is_multi_selecting {
                    return Arc::clone(state);
                }
                let focus = if state.is_single() {
                    state.focus.clone()
                } else {
                    None
                };
                Arc::new(Selection {
                    is_multi_selecting: false,
                    focus,
                    ..Selection::clone(state)
                })
            }

            SelectionCommand::MultiSelect { start, end } => {
                let focus = if state.is_multi_selecting {
                    state.focus.clone()
                } else {
                    None
                };
                Arc::new(Selection {
                    start: Some(start.clone()),
                    end: Some(end.clone()),
                    focus,
                    is_multi_selecting: state.is_multi_selecting,
                })
            }

            SelectionCommand::UpdateFocus { id, focus } => Arc::new(Selection {
                start: Some(id.clone()),
                end: Some(id.clone()),
                focus: Some(focus.clone()),
                is_multi_selecting: state.is_multi_selecting,
            }),
        }
    }
}

/// Memoized multi-selection range
///
/// Recomputes only when the sibling list containing the selection is a
/// different `Arc` or the bounds moved.
#[derive(Debug, Default)]
pub struct MultiSelectionCache {
    key: Option<CacheKey>,
    ids: Arc<Vec<ClientId>>,
}

#[derive(Debug)]
struct CacheKey {
    siblings: Arc<Vec<ClientId>>,
    start: ClientId,
    end: ClientId,
}

impl MultiSelectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, selection: &Selection, tree: &BlockTree) -> Arc<Vec<ClientId>> {
        let Some((siblings, from, to)) = selection.range(tree) else {
            self.key = None;
            self.ids = Arc::default();
            return Arc::clone(&self.ids);
        };
        let (Some(start), Some(end)) = (&selection.start, &selection.end) else {
            return Arc::clone(&self.ids);
        };

        let hit = self.key.as_ref().is_some_and(|key| {
            Arc::ptr_eq(&key.siblings, siblings) && &key.start == start && &key.end == end
        });
        if !hit {
            self.key = Some(CacheKey {
                siblings: Arc::clone(siblings),
                start: start.clone(),
                end: end.clone(),
            });
            self.ids = Arc::new(siblings[from..=to].to_vec());
        }

        Arc::clone(&self.ids)
    }
}
