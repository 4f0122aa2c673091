use crate::config::SyncConfig;
use crate::errors::SyncError;
use crate::lock::{SaveLocks, SaveToken};
use crate::menu_item::{menu_items_query, MenuItem};
use crate::reconcile::{Reconciler, SaveReport};
use crate::remote::MenuItemsApi;
use crate::transform::menu_items_to_blocks;
use std::sync::Arc;
use tokio::sync::Mutex;
use trellis_editor::{BlockNode, ClientId, Editor};

/// A menu loaded for editing
#[derive(Debug, Clone)]
pub struct LoadedNavigation {
    /// Navigation block holding the menu's items as inner blocks
    pub root: BlockNode,

    /// Items the blocks were built from
    pub remote: Vec<MenuItem>,
}

/// Loads and saves navigation menus against a backend
pub struct NavigationSync<A: MenuItemsApi + ?Sized> {
    api: Arc<A>,
    config: SyncConfig,
    locks: SaveLocks,
}

impl<A: MenuItemsApi + ?Sized> NavigationSync<A> {
    pub fn new(api: Arc<A>, config: SyncConfig) -> Self {
        Self {
            api,
            config,
            locks: SaveLocks::new(),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn locks(&self) -> &SaveLocks {
        &self.locks
    }

    /// Fetch a menu and build its navigation block
    pub async fn load(&self, menu_id: u64) -> Result<LoadedNavigation, SyncError> {
        let remote = self.api.list(&menu_items_query(menu_id)).await?;
        tracing::info!("[NavigationSync] Loaded {} items for menu {}", remote.len(), menu_id);

        let root = BlockNode::new(self.config.root_block_name.as_str())
            .inner_blocks(menu_items_to_blocks(&remote, &self.config));
        Ok(LoadedNavigation { root, remote })
    }

    /// Save the editor's navigation, waiting for any running save of the same menu
    ///
    /// The tree is read once the lock is held and the report is applied to the
    /// editor before it is released, so a queued save sees every record id an
    /// earlier one assigned.
    pub async fn save(&self, menu_id: u64, editor: &Mutex<Editor>, root: &ClientId) -> SaveReport {
        let token = self.locks.acquire(menu_id).await;
        self.save_locked(&token, editor, root).await
    }

    /// Save unless a save of the same menu is already running
    pub async fn try_save(
        &self,
        menu_id: u64,
        editor: &Mutex<Editor>,
        root: &ClientId,
    ) -> Option<SaveReport> {
        let Some(token) = self.locks.try_acquire(menu_id) else {
            tracing::debug!("[NavigationSync] Save of menu {} already in flight", menu_id);
            return None;
        };
        Some(self.save_locked(&token, editor, root).await)
    }

    async fn save_locked(
        &self,
        token: &SaveToken,
        editor: &Mutex<Editor>,
        root: &ClientId,
    ) -> SaveReport {
        // Editor lock is held only to read the tree and to apply the report
        let tree = Arc::clone(editor.lock().await.tree());

        let report = Reconciler::new(self.api.as_ref(), &self.config, token.menu_id())
            .reconcile(token, &tree, root)
            .await;

        report.apply_to(&mut *editor.lock().await);
        report
    }
}
