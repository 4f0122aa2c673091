//! # Trellis Sync
//!
//! Keeps a navigation block tree and a remote menu in step.
//!
//! ## Flow
//!
//! ```text
//! load:  list items ─→ menu_items_to_blocks ─→ Editor (ResetBlocks)
//!
//! save:  SaveToken ─→ Editor tree snapshot ─→ Reconciler ─→ SaveReport
//!                                                             │
//!        Editor ←── AssignRecordIds + MarkPersisted ←─────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let sync = NavigationSync::new(Arc::new(api), SyncConfig::load(".")?);
//!
//! let loaded = sync.load(menu_id).await?;
//! let root = loaded.root.id.clone();
//! let editor = Mutex::new(Editor::with_blocks(vec![loaded.root]));
//!
//! // ... edit ...
//!
//! // Waits for a running save of the same menu, then applies its record ids
//! let report = sync.save(menu_id, &editor, &root).await;
//! ```

mod config;
mod diff;
mod errors;
mod lock;
mod memory;
mod menu_item;
mod navigation;
mod reconcile;
mod remote;
mod transform;

pub use config::{SyncConfig, DEFAULT_CONFIG_NAME};
pub use diff::{compute_changeset, Changeset};
pub use errors::{RemoteError, SyncError};
pub use lock::{SaveLocks, SaveToken};
pub use memory::{InMemoryMenuItems, RemoteCall};
pub use menu_item::{menu_items_query, navigation_post_id, MenuItem, MenuItemFields, MenuItemsQuery};
pub use navigation::{LoadedNavigation, NavigationSync};
pub use reconcile::{Reconciler, SaveReport, SaveSummary};
pub use remote::{BatchItemResult, BatchOperation, BatchResponse, DeleteResponse, MenuItemsApi};
pub use transform::{
    block_attributes_to_menu_item, block_to_menu_item, menu_item_to_block_attributes,
    menu_items_to_blocks,
};
