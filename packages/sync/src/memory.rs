//! # In-Memory Menu Items
//!
//! Complete [`MenuItemsApi`] backed by a map, for tests and offline use.
//!
//! ## Failure Injection
//!
//! - [`InMemoryMenuItems::set_offline`]: every request fails with a transport error
//! - [`InMemoryMenuItems::reject_create_titled`]: creates with a given title are rejected
//! - [`InMemoryMenuItems::reject_update`] / [`InMemoryMenuItems::reject_delete`]:
//!   the batched operation for that id fails

use crate::errors::RemoteError;
use crate::menu_item::{MenuItem, MenuItemFields, MenuItemsQuery};
use crate::remote::{BatchItemResult, BatchOperation, BatchResponse, DeleteResponse, MenuItemsApi};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;
use trellis_editor::RecordId;

/// Request received by the backend
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    List { menus: u64 },
    Create { title: String },
    Update { id: RecordId },
    Delete { id: RecordId },
    Batch { operations: usize },
}

#[derive(Debug, Default)]
struct Store {
    items: BTreeMap<RecordId, MenuItem>,
    next_id: RecordId,
    calls: Vec<RemoteCall>,
    offline: bool,
    rejected_titles: HashSet<String>,
    rejected_updates: HashSet<RecordId>,
    rejected_deletes: HashSet<RecordId>,
}

impl Store {
    fn check_online(&self) -> Result<(), RemoteError> {
        if self.offline {
            return Err(RemoteError::Transport("Network request failed".to_string()));
        }
        Ok(())
    }

    fn update(&mut self, id: RecordId, fields: MenuItemFields) -> Result<MenuItem, RemoteError> {
        if self.rejected_updates.contains(&id) {
            return Err(RemoteError::Rejected {
                code: "rest_invalid_param".to_string(),
                message: format!("Invalid menu item {id}"),
            });
        }
        let item = self.items.get_mut(&id).ok_or(RemoteError::NotFound(id))?;
        item.fields = MenuItemFields {
            status: fields.status.clone().or_else(|| item.fields.status.clone()),
            ..fields
        };
        Ok(item.clone())
    }

    fn delete(&mut self, id: RecordId) -> Result<DeleteResponse, RemoteError> {
        if self.rejected_deletes.contains(&id) {
            return Ok(DeleteResponse {
                deleted: false,
                previous: self.items.get(&id).cloned(),
            });
        }
        let previous = self.items.remove(&id).ok_or(RemoteError::NotFound(id))?;
        Ok(DeleteResponse {
            deleted: true,
            previous: Some(previous),
        })
    }
}

#[derive(Debug, Default)]
pub struct InMemoryMenuItems {
    store: Mutex<Store>,
    latency: Option<Duration>,
}

impl InMemoryMenuItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-populated with items (ids are kept)
    pub fn with_items(items: impl IntoIterator<Item = MenuItem>) -> Self {
        let items: BTreeMap<RecordId, MenuItem> =
            items.into_iter().map(|item| (item.id, item)).collect();
        let next_id = items.keys().next_back().copied().unwrap_or(0);
        Self {
            store: Mutex::new(Store {
                items,
                next_id,
                ..Default::default()
            }),
            latency: None,
        }
    }

    /// Delay every request
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn set_offline(&self, offline: bool) {
        self.store.lock().await.offline = offline;
    }

    pub async fn reject_create_titled(&self, title: impl Into<String>) {
        self.store.lock().await.rejected_titles.insert(title.into());
    }

    pub async fn reject_update(&self, id: RecordId) {
        self.store.lock().await.rejected_updates.insert(id);
    }

    pub async fn reject_delete(&self, id: RecordId) {
        self.store.lock().await.rejected_deletes.insert(id);
    }

    /// Requests received so far
    pub async fn calls(&self) -> Vec<RemoteCall> {
        self.store.lock().await.calls.clone()
    }

    /// All stored items, by id
    pub async fn items(&self) -> Vec<MenuItem> {
        self.store.lock().await.items.values().cloned().collect()
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl MenuItemsApi for InMemoryMenuItems {
    async fn list(&self, query: &MenuItemsQuery) -> Result<Vec<MenuItem>, RemoteError> {
        self.delay().await;
        let mut store = self.store.lock().await;
        store.calls.push(RemoteCall::List { menus: query.menus });
        store.check_online()?;

        let matching = store
            .items
            .values()
            .filter(|item| item.fields.menus == query.menus)
            .cloned();
        Ok(match usize::try_from(query.per_page) {
            Ok(limit) => matching.take(limit).collect(),
            Err(_) => matching.collect(),
        })
    }

    async fn create(&self, fields: MenuItemFields) -> Result<MenuItem, RemoteError> {
        self.delay().await;
        let mut store = self.store.lock().await;
        store.calls.push(RemoteCall::Create {
            title: fields.title.clone(),
        });
        store.check_online()?;

        if store.rejected_titles.contains(&fields.title) {
            return Err(RemoteError::Rejected {
                code: "rest_cannot_create".to_string(),
                message: format!("Cannot create menu item \"{}\"", fields.title),
            });
        }

        store.next_id += 1;
        let item = MenuItem {
            id: store.next_id,
            fields,
        };
        store.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update(&self, id: RecordId, fields: MenuItemFields) -> Result<MenuItem, RemoteError> {
        self.delay().await;
        let mut store = self.store.lock().await;
        store.calls.push(RemoteCall::Update { id });
        store.check_online()?;
        store.update(id, fields)
    }

    async fn delete(&self, id: RecordId) -> Result<DeleteResponse, RemoteError> {
        self.delay().await;
        let mut store = self.store.lock().await;
        store.calls.push(RemoteCall::Delete { id });
        store.check_online()?;
        store.delete(id)
    }

    async fn batch(&self, operations: Vec<BatchOperation>) -> Result<BatchResponse, RemoteError> {
        self.delay().await;
        let mut store = self.store.lock().await;
        store.calls.push(RemoteCall::Batch {
            operations: operations.len(),
        });
        store.check_online()?;

        let responses: Vec<BatchItemResult> = operations
            .into_iter()
            .map(|operation| match operation {
                BatchOperation::Update { id, fields } => match store.update(id, fields) {
                    Ok(item) => BatchItemResult::Updated(item),
                    Err(err) => BatchItemResult::Failed(err),
                },
                BatchOperation::Delete { id } => match store.delete(id) {
                    Ok(response) => BatchItemResult::Deleted(response),
                    Err(err) => BatchItemResult::Failed(err),
                },
            })
            .collect();

        let any_failed = responses.iter().any(|response| match response {
            BatchItemResult::Failed(_) => true,
            BatchItemResult::Deleted(response) => !response.deleted,
            BatchItemResult::Updated(_) => false,
        });

        Ok(BatchResponse {
            failed: any_failed.then(|| "execution".to_string()),
            responses,
        })
    }
}
