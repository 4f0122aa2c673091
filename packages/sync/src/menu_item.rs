//! # Menu Items
//!
//! Remote entities mirrored by navigation blocks.
//!
//! A [`MenuItem`] is a stored entity (it has a server id). [`MenuItemFields`]
//! is the writable payload sent on create and update. Optional display fields
//! left as `None` are omitted from the JSON so the server keeps its defaults.

use serde::{Deserialize, Deserializer, Serialize};
use trellis_editor::RecordId;

/// Writable menu item fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuItemFields {
    #[serde(default, deserialize_with = "deserialize_title")]
    pub title: String,

    #[serde(default)]
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xfn: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr_title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Record id of the parent item (0 for top level)
    #[serde(default)]
    pub parent: RecordId,

    /// 1-based position among siblings
    #[serde(default)]
    pub menu_order: u32,

    /// Menu the item belongs to
    #[serde(default)]
    pub menus: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl MenuItemFields {
    /// Whether two payloads describe the same menu entry
    ///
    /// Compares the fields a navigation block controls. Blank strings and
    /// empty lists count as absent, and the menu id and status are ignored.
    pub fn same_content(&self, other: &MenuItemFields) -> bool {
        self.title == other.title
            && self.url == other.url
            && self.parent == other.parent
            && self.menu_order == other.menu_order
            && blank_to_none(&self.description) == blank_to_none(&other.description)
            && blank_to_none(&self.attr_title) == blank_to_none(&other.attr_title)
            && blank_to_none(&self.target) == blank_to_none(&other.target)
            && blank_to_none(&self.object) == blank_to_none(&other.object)
            && blank_to_none(&self.kind) == blank_to_none(&other.kind)
            && self.object_id == other.object_id
            && words(&self.classes) == words(&other.classes)
            && words(&self.xfn) == words(&other.xfn)
    }
}

fn blank_to_none(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn words(value: &Option<Vec<String>>) -> Vec<&str> {
    value
        .iter()
        .flatten()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Titles arrive either as a plain string or as `{ raw, rendered }`
fn deserialize_title<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Title {
        Plain(String),
        Rendered {
            raw: String,
        },
        Missing(Option<()>),
    }

    Ok(match Title::deserialize(deserializer)? {
        Title::Plain(title) | Title::Rendered { raw: title } => title,
        Title::Missing(_) => String::new(),
    })
}

/// A stored menu item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: RecordId,

    #[serde(flatten)]
    pub fields: MenuItemFields,
}

/// Filter for listing menu items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemsQuery {
    pub menus: u64,

    /// Page size; -1 lists everything
    pub per_page: i64,
}

/// Query listing every item of a menu
pub fn menu_items_query(menu_id: u64) -> MenuItemsQuery {
    MenuItemsQuery {
        menus: menu_id,
        per_page: -1,
    }
}

/// Identifier of the editable navigation document for a menu
pub fn navigation_post_id(menu_id: u64) -> String {
    format!("navigation-post-{menu_id}")
}
