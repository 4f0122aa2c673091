use crate::errors::RemoteError;
use crate::menu_item::{MenuItem, MenuItemFields, MenuItemsQuery};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use trellis_editor::RecordId;

/// Response to deleting a menu item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<MenuItem>,
}

/// One operation inside a batch request
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOperation {
    Update { id: RecordId, fields: MenuItemFields },
    Delete { id: RecordId },
}

impl BatchOperation {
    pub fn record_id(&self) -> RecordId {
        match self {
            BatchOperation::Update { id, .. } | BatchOperation::Delete { id } => *id,
        }
    }
}

/// Result of one batched operation
#[derive(Debug, Clone, PartialEq)]
pub enum BatchItemResult {
    Updated(MenuItem),
    Deleted(DeleteResponse),
    Failed(RemoteError),
}

/// Response to a batch request; `responses[i]` answers `operations[i]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchResponse {
    /// Set when at least one operation failed
    pub failed: Option<String>,
    pub responses: Vec<BatchItemResult>,
}

/// Remote collection of menu items
///
/// An `Err` from any method means the request as a whole did not go through.
/// Failures of individual batch operations are reported in the response.
#[async_trait]
pub trait MenuItemsApi: Send + Sync {
    async fn list(&self, query: &MenuItemsQuery) -> Result<Vec<MenuItem>, RemoteError>;

    async fn create(&self, fields: MenuItemFields) -> Result<MenuItem, RemoteError>;

    async fn update(&self, id: RecordId, fields: MenuItemFields) -> Result<MenuItem, RemoteError>;

    async fn delete(&self, id: RecordId) -> Result<DeleteResponse, RemoteError>;

    async fn batch(&self, operations: Vec<BatchOperation>) -> Result<BatchResponse, RemoteError>;
}
