//! # Reconciliation
//!
//! Makes the remote menu items match a snapshot of the navigation tree.
//!
//! ## Save Pipeline
//!
//! ```text
//! flatten ─→ diff ─→ create placeholders ─→ diff again ─→ batch ─→ re-list
//!                     (one by one, in          (deletes,
//!                      document order)          updates)
//! ```
//!
//! New blocks are created first so that every later operation can refer to
//! a real record id, including as a parent. Creating an item in document
//! order guarantees its parent already has one.
//!
//! ## Failure Handling
//!
//! - A failed create stops the save before the batch is sent
//! - Failed batch operations are collected; nothing is rolled back
//! - Correlations made before a failure are always reported
//!
//! The remote items are listed once the save holds its [`SaveToken`], so a
//! save never diffs against items read before an earlier save finished.

use crate::config::SyncConfig;
use crate::diff::{compute_changeset, desired_fields};
use crate::errors::{RemoteError, SyncError};
use crate::lock::SaveToken;
use crate::menu_item::{menu_items_query, navigation_post_id, MenuItem, MenuItemFields};
use crate::remote::{BatchItemResult, BatchOperation, BatchResponse, MenuItemsApi};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use trellis_editor::{
    BlockStore, BlockTree, ClientId, Editor, EditorCommand, RecordId, Reducer, TreeCommand,
};

/// Counts and fresh remote state of a successful save
#[derive(Debug, Clone, PartialEq)]
pub struct SaveSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,

    /// Remote items after the save, for the next diff
    pub remote: Vec<MenuItem>,
}

/// Result of a save
#[derive(Debug, Clone)]
pub struct SaveReport {
    /// The tree snapshot that was saved
    pub tree: Arc<BlockTree>,

    /// Client ids paired with the record ids created for them
    pub assigned: Vec<(ClientId, RecordId)>,

    pub outcome: Result<SaveSummary, SyncError>,
}

impl SaveReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Fold the report back into the editor it was taken from
    ///
    /// Record ids are always written. The document is only marked persisted
    /// when the save succeeded and nothing was edited while it ran.
    pub fn apply_to(&self, editor: &mut Editor) {
        let unchanged_since_snapshot = Arc::ptr_eq(editor.tree(), &self.tree);

        if !self.assigned.is_empty() {
            editor.dispatch(EditorCommand::Edit(TreeCommand::AssignRecordIds(
                self.assigned.clone(),
            )));
        }

        if self.is_success() && unchanged_since_snapshot {
            editor.dispatch(EditorCommand::Edit(TreeCommand::MarkPersisted));
        }
    }
}

/// Save engine for one menu
pub struct Reconciler<'a, A: MenuItemsApi + ?Sized> {
    api: &'a A,
    config: &'a SyncConfig,
    menu_id: u64,
}

impl<'a, A: MenuItemsApi + ?Sized> Reconciler<'a, A> {
    pub fn new(api: &'a A, config: &'a SyncConfig, menu_id: u64) -> Self {
        Self {
            api,
            config,
            menu_id,
        }
    }

    /// Save the blocks below `root` in `tree`
    pub async fn reconcile(
        &self,
        token: &SaveToken,
        tree: &Arc<BlockTree>,
        root: &ClientId,
    ) -> SaveReport {
        let mut assigned = Vec::new();
        let outcome = self.run(token, tree, root, &mut assigned).await;

        match &outcome {
            Ok(summary) => tracing::info!(
                "[Reconcile] Saved {}: {} created, {} updated, {} deleted",
                token.document_id(),
                summary.created,
                summary.updated,
                summary.deleted
            ),
            Err(err) => tracing::warn!(
                "[Reconcile] Save of {} failed after {} creates: {}",
                token.document_id(),
                assigned.len(),
                err
            ),
        }

        SaveReport {
            tree: Arc::clone(tree),
            assigned,
            outcome,
        }
    }

    async fn run(
        &self,
        token: &SaveToken,
        tree: &Arc<BlockTree>,
        root: &ClientId,
        assigned: &mut Vec<(ClientId, RecordId)>,
    ) -> Result<SaveSummary, SyncError> {
        if token.menu_id() != self.menu_id {
            return Err(SyncError::LockMismatch {
                expected: navigation_post_id(self.menu_id),
                actual: token.document_id().to_string(),
            });
        }
        if !tree.contains(root) {
            return Err(SyncError::MissingRoot(root.clone()));
        }

        let remote = self.api.list(&menu_items_query(self.menu_id)).await?;
        let flat = tree.flatten(Some(root));
        let initial = compute_changeset(&remote, &flat, root, self.menu_id);
        tracing::debug!(
            "[Reconcile] {} blocks, {} to create",
            flat.len(),
            initial.creates.len()
        );

        // Placeholders, in document order
        let creates: HashSet<&ClientId> = initial.creates.iter().collect();
        let mut known = remote;
        let mut correlated: HashMap<ClientId, RecordId> = HashMap::new();

        for entry in flat.iter().filter(|entry| creates.contains(&entry.block.id)) {
            let parent = match &entry.parent {
                Some(parent) if &parent.id != root => correlated
                    .get(&parent.id)
                    .copied()
                    .or_else(|| parent.record_id())
                    .unwrap_or(0),
                _ => 0,
            };
            let fields = MenuItemFields {
                parent,
                status: Some(self.config.status.clone()),
                ..desired_fields(entry, root, self.menu_id)
            };

            let item = self
                .api
                .create(fields)
                .await
                .map_err(|err| match err {
                    RemoteError::Transport(message) => SyncError::Transport(message),
                    other => SyncError::PlaceholderCreation {
                        client_id: entry.block.id.clone(),
                        message: other.to_string(),
                    },
                })?;

            tracing::debug!("[Reconcile] Created item {} for {}", item.id, entry.block.id);
            correlated.insert(entry.block.id.clone(), item.id);
            assigned.push((entry.block.id.clone(), item.id));
            known.push(item);
        }

        // Every block has a record id now
        let working = BlockStore.reduce(tree, &TreeCommand::AssignRecordIds(assigned.clone()));
        let changeset = compute_changeset(&known, &working.flatten(Some(root)), root, self.menu_id);

        let deleted = changeset.deletes.len();
        let updated = changeset.updates.len();
        let operations: Vec<BatchOperation> = changeset
            .deletes
            .into_iter()
            .map(|id| BatchOperation::Delete { id })
            .chain(
                changeset
                    .updates
                    .into_iter()
                    .map(|(id, fields)| BatchOperation::Update { id, fields }),
            )
            .collect();

        if !operations.is_empty() {
            let response = self.api.batch(operations.clone()).await?;
            let failed = failed_operations(&operations, &response);
            if let Some(reason) = unattributed_failure(&response, &failed) {
                tracing::warn!(
                    "[Reconcile] Batch for {} failed ({}) but every operation succeeded",
                    token.document_id(),
                    reason
                );
            }
            if !failed.is_empty() {
                return Err(SyncError::PartialFailure { failed });
            }
        }

        let remote = self.api.list(&menu_items_query(self.menu_id)).await?;

        Ok(SaveSummary {
            created: assigned.len(),
            updated,
            deleted,
            remote,
        })
    }
}

/// Record ids of batched operations that did not succeed
fn failed_operations(operations: &[BatchOperation], response: &BatchResponse) -> Vec<RecordId> {
    operations
        .iter()
        .enumerate()
        .filter(|(i, operation)| {
            let succeeded = match (operation, response.responses.get(*i)) {
                (BatchOperation::Delete { .. }, Some(BatchItemResult::Deleted(deleted))) => {
                    deleted.deleted
                }
                (BatchOperation::Update { .. }, Some(BatchItemResult::Updated(_))) => true,
                _ => false,
            };
            !succeeded
        })
        .map(|(_, operation)| operation.record_id())
        .collect()
}

/// Batch-level failure that no operation result accounts for
fn unattributed_failure<'r>(response: &'r BatchResponse, failed: &[RecordId]) -> Option<&'r str> {
    response.failed.as_deref().filter(|_| failed.is_empty())
}
