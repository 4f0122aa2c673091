//! # Changeset Computation
//!
//! Compares the flattened navigation tree with the last known remote items.
//!
//! - **creates**: blocks without a `recordId`, in document order
//! - **updates**: blocks with a `recordId` whose payload differs from the
//!   remote item, or whose item is not in the remote list
//! - **deletes**: remote items no block refers to any more

use crate::menu_item::{MenuItem, MenuItemFields};
use crate::transform::block_to_menu_item;
use std::collections::{HashMap, HashSet};
use trellis_editor::{ClientId, FlatEntry, RecordId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    pub creates: Vec<ClientId>,
    pub updates: Vec<(RecordId, MenuItemFields)>,
    pub deletes: Vec<RecordId>,
}

impl Changeset {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// Record id a flattened entry should be parented to (0 at the top level)
pub fn parent_record_id(entry: &FlatEntry, root: &ClientId) -> RecordId {
    match &entry.parent {
        Some(parent) if &parent.id != root => parent.record_id().unwrap_or(0),
        _ => 0,
    }
}

/// Payload an entry should have remotely
pub fn desired_fields(entry: &FlatEntry, root: &ClientId, menu_id: u64) -> MenuItemFields {
    let position = u32::try_from(entry.index + 1).unwrap_or(u32::MAX);
    block_to_menu_item(
        &entry.block,
        parent_record_id(entry, root),
        position,
        menu_id,
    )
}

pub fn compute_changeset(
    remote: &[MenuItem],
    flat: &[FlatEntry],
    root: &ClientId,
    menu_id: u64,
) -> Changeset {
    let remote_by_id: HashMap<RecordId, &MenuItem> =
        remote.iter().map(|item| (item.id, item)).collect();
    let mut changeset = Changeset::default();
    let mut referenced = HashSet::new();

    for entry in flat {
        let Some(record_id) = entry.block.record_id() else {
            changeset.creates.push(entry.block.id.clone());
            continue;
        };
        referenced.insert(record_id);

        let desired = desired_fields(entry, root, menu_id);
        let unchanged = remote_by_id
            .get(&record_id)
            .is_some_and(|item| item.fields.same_content(&desired));
        if !unchanged {
            changeset.updates.push((record_id, desired));
        }
    }

    changeset.deletes = remote
        .iter()
        .map(|item| item.id)
        .filter(|id| !referenced.contains(id))
        .collect();

    changeset
}
