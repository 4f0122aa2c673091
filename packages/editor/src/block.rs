//! # Blocks
//!
//! Content nodes of the edited document. A stored [`Block`] carries no child
//! list: nesting lives only in the tree store's ordering map. [`BlockNode`] is
//! the nested shape used to load blocks into the store and read them back out.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Attribute holding the server-assigned id of the entity a block mirrors
pub const RECORD_ID_ATTRIBUTE: &str = "recordId";

/// Server-assigned identifier of a remote entity
pub type RecordId = u64;

/// Block attributes (key order is irrelevant)
pub type Attributes = BTreeMap<String, Value>;

/// Client-side block identifier
///
/// Assigned once when a block is created and never changed. The empty id is
/// reserved for the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Fresh random id for a new block
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Key of the top-level sibling list
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ClientId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A stored block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: ClientId,

    /// Block type name (e.g. "navigation-link")
    pub name: String,

    #[serde(default)]
    pub attributes: Attributes,
}

impl Block {
    /// Remote record id, if this block has been persisted
    pub fn record_id(&self) -> Option<RecordId> {
        self.attributes
            .get(RECORD_ID_ATTRIBUTE)
            .and_then(Value::as_u64)
    }

    /// String attribute lookup
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// A block together with its nested children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockNode {
    pub id: ClientId,
    pub name: String,

    #[serde(default)]
    pub attributes: Attributes,

    #[serde(default)]
    pub inner_blocks: Vec<BlockNode>,
}

impl BlockNode {
    /// New block with a freshly generated id
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(ClientId::generate(), name)
    }

    pub fn with_id(id: impl Into<ClientId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes: Attributes::new(),
            inner_blocks: Vec::new(),
        }
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn inner_blocks(mut self, inner_blocks: Vec<BlockNode>) -> Self {
        self.inner_blocks = inner_blocks;
        self
    }

    /// The block without its children
    pub fn to_block(&self) -> Block {
        Block {
            id: self.id.clone(),
            name: self.name.clone(),
            attributes: self.attributes.clone(),
        }
    }
}
