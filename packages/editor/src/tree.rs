//! # Normalized Block Tree
//!
//! Blocks are stored flat, keyed by id, and nesting is expressed only through
//! an ordering map from parent id to the ordered ids of its children. The
//! top-level list lives under the reserved root id (`""`).
//!
//! ## Identity
//!
//! Both maps are persistent (`im`) and every sibling list sits behind its own
//! `Arc`. Commands rebuild only what they touch:
//!
//! - a command with no effect returns the input `Arc<BlockTree>` itself
//! - a sibling list that does not contain an affected id keeps its `Arc`
//! - a block whose attributes are unchanged keeps its `Arc`
//!
//! Memoized readers downstream compare these pointers instead of contents.
//!
//! ## Command Semantics
//!
//! ### InsertBlocks
//! - Appends to the end of the sibling list unless an index is given
//! - Indexes past the end are clamped
//!
//! ### MoveBlocks
//! - Moves a contiguous run of siblings one slot as a unit
//! - No-op when the run already touches the boundary
//!
//! ### ReplaceBlocks
//! - Replacements take the position of the first replaced id
//! - Descendants of replaced blocks are dropped
//!
//! ### RemoveBlocks
//! - Removes blocks and, transitively, all their descendants

use crate::block::{Attributes, Block, BlockNode, ClientId, RecordId, RECORD_ID_ATTRIBUTE};
use crate::reducer::{ChangeEffect, CommandKind, HistoryEffect, Reducer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

type OrderMap = im::HashMap<ClientId, Arc<Vec<ClientId>>>;
type BlockMap = im::HashMap<ClientId, Arc<Block>>;

/// Direction for [`TreeCommand::MoveBlocks`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Edits understood by the tree store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeCommand {
    /// Replace the whole document (history checkpoint)
    ResetBlocks(Vec<BlockNode>),

    /// Register blocks and their inner ordering without placing them in the
    /// top-level list
    ReceiveBlocks(Vec<BlockNode>),

    /// Insert blocks under a parent (root when `None`)
    InsertBlocks {
        blocks: Vec<BlockNode>,
        parent: Option<ClientId>,
        index: Option<usize>,
    },

    /// Move a contiguous run of siblings one position
    MoveBlocks {
        ids: Vec<ClientId>,
        direction: MoveDirection,
        parent: Option<ClientId>,
    },

    /// Substitute blocks in place
    ReplaceBlocks {
        ids: Vec<ClientId>,
        blocks: Vec<BlockNode>,
    },

    /// Shallow-merge attributes into a block
    UpdateAttributes { id: ClientId, attributes: Attributes },

    /// Remove blocks and their descendants
    RemoveBlocks(Vec<ClientId>),

    /// Record server ids for blocks that were created remotely
    AssignRecordIds(Vec<(ClientId, RecordId)>),

    /// The document was persisted; the tree itself is unchanged
    MarkPersisted,
}

impl CommandKind for TreeCommand {
    fn history_effect(&self) -> HistoryEffect {
        match self {
            TreeCommand::ResetBlocks(_) => HistoryEffect::Reset,
            TreeCommand::ReceiveBlocks(_) => HistoryEffect::Skip,
            TreeCommand::AssignRecordIds(_) => HistoryEffect::Rewrite,
            _ => HistoryEffect::Record,
        }
    }

    fn change_effect(&self) -> ChangeEffect {
        match self {
            TreeCommand::ResetBlocks(_) | TreeCommand::MarkPersisted => ChangeEffect::Reset,
            TreeCommand::ReceiveBlocks(_) | TreeCommand::AssignRecordIds(_) => {
                ChangeEffect::Ignore
            }
            _ => ChangeEffect::Track,
        }
    }
}

/// Whether `command` should extend the undo step opened by `previous`.
///
/// Consecutive attribute updates of the same block touching the same keys
/// (typing into a label, dragging a slider) collapse into one undo level.
pub fn should_continue_previous(previous: Option<&TreeCommand>, command: &TreeCommand) -> bool {
    match (previous, command) {
        (
            Some(TreeCommand::UpdateAttributes {
                id: previous_id,
                attributes: previous_attributes,
            }),
            TreeCommand::UpdateAttributes { id, attributes },
        ) => previous_id == id && previous_attributes.keys().eq(attributes.keys()),
        _ => false,
    }
}

/// One entry of a depth-first walk over the tree
#[derive(Debug, Clone)]
pub struct FlatEntry {
    pub block: Arc<Block>,

    /// Parent block (`None` when the walk started at the document root)
    pub parent: Option<Arc<Block>>,

    /// Zero-based position among siblings
    pub index: usize,
}

/// Normalized block storage
#[derive(Debug, Clone, PartialEq)]
pub struct BlockTree {
    by_id: BlockMap,
    order: OrderMap,
}

impl Default for BlockTree {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockTree {
    /// Empty document
    pub fn new() -> Self {
        let mut order = OrderMap::new();
        order.insert(ClientId::root(), Arc::new(Vec::new()));
        Self {
            by_id: BlockMap::new(),
            order,
        }
    }

    /// Build a tree from nested blocks
    pub fn from_blocks(blocks: &[BlockNode]) -> Self {
        let mut tree = Self {
            by_id: BlockMap::new(),
            order: OrderMap::new(),
        };
        let top = tree.add_nodes(blocks);
        tree.order.insert(ClientId::root(), Arc::new(top));
        tree
    }

    pub fn block(&self, id: &ClientId) -> Option<&Arc<Block>> {
        self.by_id.get(id)
    }

    pub fn contains(&self, id: &ClientId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Ordered child ids of a parent (root when `None`)
    pub fn children(&self, parent: Option<&ClientId>) -> &[ClientId] {
        self.sibling_list(parent)
            .map(|list| list.as_slice())
            .unwrap_or(&[])
    }

    /// The shared sibling list of a parent, for identity comparisons
    pub fn sibling_list(&self, parent: Option<&ClientId>) -> Option<&Arc<Vec<ClientId>>> {
        self.order.get(&order_key(parent))
    }

    /// Key of the sibling list containing `id` (the root id for top-level blocks)
    pub fn parent_of(&self, id: &ClientId) -> Option<&ClientId> {
        self.order
            .iter()
            .find(|(_, list)| list.contains(id))
            .map(|(parent, _)| parent)
    }

    /// The given ids followed by all of their descendants
    pub fn with_descendants(&self, ids: &[ClientId]) -> Vec<ClientId> {
        let mut all = ids.to_vec();
        let mut i = 0;
        while i < all.len() {
            if let Some(children) = self.order.get(&all[i]) {
                all.extend(children.iter().cloned());
            }
            i += 1;
        }
        all
    }

    /// Rebuild the nested shape below a parent
    pub fn to_nested(&self, parent: Option<&ClientId>) -> Vec<BlockNode> {
        self.children(parent)
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .map(|block| BlockNode {
                id: block.id.clone(),
                name: block.name.clone(),
                attributes: block.attributes.clone(),
                inner_blocks: self.to_nested(Some(&block.id)),
            })
            .collect()
    }

    /// Depth-first walk below a parent, in document order
    pub fn flatten(&self, parent: Option<&ClientId>) -> Vec<FlatEntry> {
        let mut entries = Vec::new();
        let parent_block = parent.and_then(|id| self.by_id.get(id)).cloned();
        self.walk(parent, parent_block, &mut entries);
        entries
    }

    fn walk(
        &self,
        parent: Option<&ClientId>,
        parent_block: Option<Arc<Block>>,
        entries: &mut Vec<FlatEntry>,
    ) {
        for (index, id) in self.children(parent).iter().enumerate() {
            let Some(block) = self.by_id.get(id) else {
                continue;
            };
            entries.push(FlatEntry {
                block: Arc::clone(block),
                parent: parent_block.clone(),
                index,
            });
            self.walk(Some(id), Some(Arc::clone(block)), entries);
        }
    }

    /// Store nested nodes and their inner orderings; returns the top-level ids
    fn add_nodes(&mut self, nodes: &[BlockNode]) -> Vec<ClientId> {
        nodes
            .iter()
            .map(|node| {
                self.by_id
                    .insert(node.id.clone(), Arc::new(node.to_block()));
                let inner = self.add_nodes(&node.inner_blocks);
                self.order.insert(node.id.clone(), Arc::new(inner));
                node.id.clone()
            })
            .collect()
    }

    /// Rebuild only the sibling lists that contain one of `ids`
    fn rewrite_lists_containing<F>(&mut self, ids: &HashSet<ClientId>, mut rewrite: F)
    where
        F: FnMut(&[ClientId]) -> Vec<ClientId>,
    {
        let affected: Vec<ClientId> = self
            .order
            .iter()
            .filter(|(_, list)| list.iter().any(|id| ids.contains(id)))
            .map(|(parent, _)| parent.clone())
            .collect();

        for parent in affected {
            if let Some(list) = self.order.get(&parent).cloned() {
                self.order.insert(parent, Arc::new(rewrite(&list)));
            }
        }
    }
}

fn order_key(parent: Option<&ClientId>) -> ClientId {
    parent.cloned().unwrap_or_default()
}

/// Reducer for [`TreeCommand`]
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockStore;

impl Reducer for BlockStore {
    type State = BlockTree;
    type Command = TreeCommand;

    fn reduce(&self, state: &Arc<BlockTree>, command: &TreeCommand) -> Arc<BlockTree> {
        match command {
            TreeCommand::ResetBlocks(blocks) => Arc::new(BlockTree::from_blocks(blocks)),

            TreeCommand::ReceiveBlocks(blocks) => receive(state, blocks),

            TreeCommand::InsertBlocks {
                blocks,
                parent,
                index,
            } => insert(state, blocks, parent.as_ref(), *index),

            TreeCommand::MoveBlocks {
                ids,
                direction,
                parent,
            } => move_run(state, ids, *direction, parent.as_ref()),

            TreeCommand::ReplaceBlocks { ids, blocks } => replace(state, ids, blocks),

            TreeCommand::UpdateAttributes { id, attributes } => {
                update_attributes(state, id, attributes)
            }

            TreeCommand::RemoveBlocks(ids) => remove(state, ids),

            TreeCommand::AssignRecordIds(assignments) => {
                assignments
                    .iter()
                    .fold(Arc::clone(state), |tree, (id, record_id)| {
                        let mut attributes = Attributes::new();
                        attributes.insert(RECORD_ID_ATTRIBUTE.to_string(), (*record_id).into());
                        update_attributes(&tree, id, &attributes)
                    })
            }

            TreeCommand::MarkPersisted => Arc::clone(state),
        }
    }
}

fn receive(state: &Arc<BlockTree>, blocks: &[BlockNode]) -> Arc<BlockTree> {
    if blocks.is_empty() {
        return Arc::clone(state);
    }

    let mut tree = BlockTree::clone(state);
    tree.add_nodes(blocks);
    Arc::new(tree)
}

fn insert(
    state: &Arc<BlockTree>,
    blocks: &[BlockNode],
    parent: Option<&ClientId>,
    index: Option<usize>,
) -> Arc<BlockTree> {
    if blocks.is_empty() {
        return Arc::clone(state);
    }

    let mut tree = BlockTree::clone(state);
    let inserted = tree.add_nodes(blocks);

    let key = order_key(parent);
    let mut siblings = state.children(parent).to_vec();
    let at = index.unwrap_or(siblings.len()).min(siblings.len());
    siblings.splice(at..at, inserted);
    tree.order.insert(key, Arc::new(siblings));

    Arc::new(tree)
}

fn move_run(
    state: &Arc<BlockTree>,
    ids: &[ClientId],
    direction: MoveDirection,
    parent: Option<&ClientId>,
) -> Arc<BlockTree> {
    let siblings = state.children(parent);
    let (Some(first), Some(last)) = (ids.first(), ids.last()) else {
        return Arc::clone(state);
    };
    let (Some(first_index), Some(last_index)) = (
        siblings.iter().position(|id| id == first),
        siblings.iter().position(|id| id == last),
    ) else {
        return Arc::clone(state);
    };
    if last_index < first_index {
        return Arc::clone(state);
    }

    let run = &siblings[first_index..=last_index];
    let moved: Vec<ClientId> = match direction {
        MoveDirection::Up => {
            if first_index == 0 {
                return Arc::clone(state);
            }
            let swapped = &siblings[first_index - 1];
            siblings[..first_index - 1]
                .iter()
                .chain(run)
                .chain(std::iter::once(swapped))
                .chain(&siblings[last_index + 1..])
                .cloned()
                .collect()
        }
        MoveDirection::Down => {
            if last_index + 1 >= siblings.len() {
                return Arc::clone(state);
            }
            let swapped = &siblings[last_index + 1];
            siblings[..first_index]
                .iter()
                .chain(std::iter::once(swapped))
                .chain(run)
                .chain(&siblings[last_index + 2..])
                .cloned()
                .collect()
        }
    };

    let mut tree = BlockTree::clone(state);
    tree.order.insert(order_key(parent), Arc::new(moved));
    Arc::new(tree)
}

fn replace(state: &Arc<BlockTree>, ids: &[ClientId], blocks: &[BlockNode]) -> Arc<BlockTree> {
    let Some(first) = ids.first() else {
        return Arc::clone(state);
    };

    let mut tree = BlockTree::clone(state);
    for id in state.with_descendants(ids) {
        tree.by_id.remove(&id);
        tree.order.remove(&id);
    }

    let replacements = tree.add_nodes(blocks);
    let replaced: HashSet<ClientId> = ids.iter().cloned().collect();

    tree.rewrite_lists_containing(&replaced, |list| {
        let mut next = Vec::with_capacity(list.len() + replacements.len());
        for id in list {
            if id == first {
                next.extend(replacements.iter().cloned());
            } else if !replaced.contains(id) {
                next.push(id.clone());
            }
        }
        next
    });

    Arc::new(tree)
}

fn update_attributes(
    state: &Arc<BlockTree>,
    id: &ClientId,
    attributes: &Attributes,
) -> Arc<BlockTree> {
    // Unknown blocks are ignored
    let Some(block) = state.by_id.get(id) else {
        return Arc::clone(state);
    };

    let changed: Vec<(&String, &serde_json::Value)> = attributes
        .iter()
        .filter(|(key, value)| block.attributes.get(*key) != Some(*value))
        .collect();
    if changed.is_empty() {
        return Arc::clone(state);
    }

    let mut next = Block::clone(block);
    for (key, value) in changed {
        next.attributes.insert(key.clone(), value.clone());
    }

    let mut tree = BlockTree::clone(state);
    tree.by_id.insert(id.clone(), Arc::new(next));
    Arc::new(tree)
}

fn remove(state: &Arc<BlockTree>, ids: &[ClientId]) -> Arc<BlockTree> {
    let removed: HashSet<ClientId> = state.with_descendants(ids).into_iter().collect();
    let listed = state
        .order
        .values()
        .any(|list| list.iter().any(|id| removed.contains(id)));
    if !listed && !removed.iter().any(|id| state.by_id.contains_key(id)) {
        return Arc::clone(state);
    }

    let mut tree = BlockTree::clone(state);
    for id in &removed {
        tree.by_id.remove(id);
        tree.order.remove(id);
    }
    tree.rewrite_lists_containing(&removed, |list| {
        list.iter()
            .filter(|id| !removed.contains(*id))
            .cloned()
            .collect()
    });

    Arc::new(tree)
}
