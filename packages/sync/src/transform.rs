//! Conversions between navigation blocks and menu items.

use crate::config::SyncConfig;
use crate::menu_item::{MenuItem, MenuItemFields};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use trellis_editor::{Attributes, Block, BlockNode, RecordId, RECORD_ID_ATTRIBUTE};

const OPENS_IN_NEW_TAB: &str = "opensInNewTab";
const NEW_TAB_TARGET: &str = "_blank";
const CUSTOM: &str = "custom";

fn string_attribute<'a>(attributes: &'a Attributes, key: &str) -> Option<&'a str> {
    attributes.get(key).and_then(Value::as_str)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(String::from)
}

fn split_words(value: Option<&str>) -> Option<Vec<String>> {
    let words: Vec<String> = value?.split_whitespace().map(String::from).collect();
    (!words.is_empty()).then_some(words)
}

fn join_words(value: &Option<Vec<String>>) -> Option<String> {
    let joined = value
        .iter()
        .flatten()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!joined.is_empty()).then_some(joined)
}

/// Menu item payload for a navigation link's attributes
///
/// Only the display fields are filled in; position fields stay at zero.
pub fn block_attributes_to_menu_item(attributes: &Attributes) -> MenuItemFields {
    let object = string_attribute(attributes, "type");
    let is_custom = object == Some(CUSTOM);

    MenuItemFields {
        title: string_attribute(attributes, "label").unwrap_or_default().to_string(),
        url: string_attribute(attributes, "url").unwrap_or_default().to_string(),
        description: non_empty(string_attribute(attributes, "description")),
        xfn: split_words(string_attribute(attributes, "rel")),
        classes: split_words(string_attribute(attributes, "className")),
        attr_title: non_empty(string_attribute(attributes, "title")),
        object_id: if is_custom {
            None
        } else {
            attributes.get("id").and_then(Value::as_u64)
        },
        object: object.map(|object| match object {
            "tag" => "post_tag".to_string(),
            other => other.to_string(),
        }),
        kind: string_attribute(attributes, "kind").map(|kind| match kind {
            "post-type" => "post_type".to_string(),
            other => other.to_string(),
        }),
        target: attributes
            .get(OPENS_IN_NEW_TAB)
            .and_then(Value::as_bool)
            .map(|opens| {
                if opens {
                    NEW_TAB_TARGET.to_string()
                } else {
                    String::new()
                }
            }),
        ..Default::default()
    }
}

/// Navigation link attributes for a menu item
pub fn menu_item_to_block_attributes(item: &MenuItemFields) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert("label".into(), item.title.clone().into());
    attributes.insert("url".into(), item.url.clone().into());

    if let Some(description) = non_empty(item.description.as_deref()) {
        attributes.insert("description".into(), description.into());
    }
    if let Some(rel) = join_words(&item.xfn) {
        attributes.insert("rel".into(), rel.into());
    }
    if let Some(class_name) = join_words(&item.classes) {
        attributes.insert("className".into(), class_name.into());
    }
    if let Some(title) = non_empty(item.attr_title.as_deref()) {
        attributes.insert("title".into(), title.into());
    }

    let is_custom = item.object.as_deref() == Some(CUSTOM);
    if let (Some(object_id), false) = (item.object_id, is_custom) {
        attributes.insert("id".into(), object_id.into());
    }
    if let Some(object) = non_empty(item.object.as_deref()) {
        let block_type = if object == "post_tag" {
            "tag".to_string()
        } else {
            object
        };
        attributes.insert("type".into(), block_type.into());
    }

    let kind = match item.kind.as_deref() {
        Some("post_type") => "post-type",
        Some(kind) if !kind.is_empty() => kind,
        _ => CUSTOM,
    };
    attributes.insert("kind".into(), kind.into());

    if item.target.as_deref() == Some(NEW_TAB_TARGET) {
        attributes.insert(OPENS_IN_NEW_TAB.into(), true.into());
    }

    attributes
}

/// Nested navigation blocks for a flat list of menu items
///
/// Siblings are ordered by `menu_order`. Items whose parent is not in the
/// list are placed at the top level. Every block gets a fresh client id and
/// carries its item's id as `recordId`.
pub fn menu_items_to_blocks(items: &[MenuItem], config: &SyncConfig) -> Vec<BlockNode> {
    let known: HashSet<RecordId> = items.iter().map(|item| item.id).collect();
    let mut by_parent: HashMap<RecordId, Vec<&MenuItem>> = HashMap::new();
    for item in items {
        let parent = if known.contains(&item.fields.parent) && item.fields.parent != item.id {
            item.fields.parent
        } else {
            0
        };
        by_parent.entry(parent).or_default().push(item);
    }
    for siblings in by_parent.values_mut() {
        siblings.sort_by_key(|item| (item.fields.menu_order, item.id));
    }

    nest(0, &by_parent, config, &mut HashSet::new())
}

fn nest(
    parent: RecordId,
    by_parent: &HashMap<RecordId, Vec<&MenuItem>>,
    config: &SyncConfig,
    visited: &mut HashSet<RecordId>,
) -> Vec<BlockNode> {
    let Some(siblings) = by_parent.get(&parent) else {
        return Vec::new();
    };

    let mut blocks = Vec::with_capacity(siblings.len());
    for item in siblings {
        // Guards against parent cycles
        if !visited.insert(item.id) {
            continue;
        }

        let inner_blocks = nest(item.id, by_parent, config, visited);
        let name = if inner_blocks.is_empty() {
            &config.link_block_name
        } else {
            &config.submenu_block_name
        };
        blocks.push(
            BlockNode::new(name.as_str())
                .attributes(menu_item_to_block_attributes(&item.fields))
                .attribute(RECORD_ID_ATTRIBUTE, item.id)
                .inner_blocks(inner_blocks),
        );
    }
    blocks
}

/// Full create/update payload for a block at a position in the menu
pub fn block_to_menu_item(
    block: &Block,
    parent: RecordId,
    position: u32,
    menu_id: u64,
) -> MenuItemFields {
    MenuItemFields {
        parent,
        menu_order: position,
        menus: menu_id,
        ..block_attributes_to_menu_item(&block.attributes)
    }
}
