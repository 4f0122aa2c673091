//! Per-document save locks.
//!
//! At most one save per navigation document runs at a time. A [`SaveToken`]
//! is proof that the holder owns the document's lock; dropping it releases
//! the lock.

use crate::menu_item::navigation_post_id;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Exclusive right to save one navigation document
#[derive(Debug)]
pub struct SaveToken {
    menu_id: u64,
    document_id: String,
    _guard: OwnedMutexGuard<()>,
}

impl SaveToken {
    pub fn menu_id(&self) -> u64 {
        self.menu_id
    }

    /// `navigation-post-{menu_id}`
    pub fn document_id(&self) -> &str {
        &self.document_id
    }
}

/// Lock table keyed by navigation document id
#[derive(Debug, Default)]
pub struct SaveLocks {
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl SaveLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other save of this menu is running
    pub async fn acquire(&self, menu_id: u64) -> SaveToken {
        let document_id = navigation_post_id(menu_id);
        let lock = self.get_or_create(&document_id);
        let guard = lock.lock_owned().await;
        SaveToken {
            menu_id,
            document_id,
            _guard: guard,
        }
    }

    /// Take the lock only if no save of this menu is running
    pub fn try_acquire(&self, menu_id: u64) -> Option<SaveToken> {
        let document_id = navigation_post_id(menu_id);
        let lock = self.get_or_create(&document_id);
        let guard = lock.try_lock_owned().ok()?;
        Some(SaveToken {
            menu_id,
            document_id,
            _guard: guard,
        })
    }

    pub fn is_saving(&self, menu_id: u64) -> bool {
        let locks = self.locks.read().unwrap_or_else(PoisonError::into_inner);
        locks
            .get(&navigation_post_id(menu_id))
            .is_some_and(|lock| lock.try_lock().is_err())
    }

    fn get_or_create(&self, document_id: &str) -> Arc<Mutex<()>> {
        // Try read lock first
        {
            let locks = self.locks.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(lock) = locks.get(document_id) {
                return Arc::clone(lock);
            }
        }

        let mut locks = self.locks.write().unwrap_or_else(PoisonError::into_inner);

        // Double-check (another task may have created it)
        if let Some(lock) = locks.get(document_id) {
            return Arc::clone(lock);
        }

        let lock = Arc::new(Mutex::new(()));
        locks.insert(document_id.to_string(), Arc::clone(&lock));
        lock
    }
}
