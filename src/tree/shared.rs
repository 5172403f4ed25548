//! Shared access to a tree during concurrent search.
//!
//! Any number of readers may query the tree at once. `interchange` takes
//! the write lock, so no query can observe a half-swapped tree.

use crate::tree::iterator_tree::IteratorTree;
use crate::tree::node::IteratorId;
use crate::utils::errors::SchedResult;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

/// Cloneable handle to a tree guarded by a reader/writer lock.
#[derive(Debug, Clone, Default)]
pub struct SharedTree {
    inner: Arc<RwLock<IteratorTree>>,
}

impl SharedTree {
    pub fn new(tree: IteratorTree) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tree)),
        }
    }

    /// Shared read access. Blocks while an interchange is in progress.
    pub fn read(&self) -> RwLockReadGuard<'_, IteratorTree> {
        // Interchange commits only after staging succeeds, so a poisoned
        // lock still guards a consistent tree.
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a read-only query under the read lock.
    pub fn with_read<R>(&self, f: impl FnOnce(&IteratorTree) -> R) -> R {
        f(&self.read())
    }

    /// Owned copy of the current tree.
    pub fn snapshot(&self) -> IteratorTree {
        self.read().clone()
    }

    /// Exclusive structural edit.
    pub fn interchange(&self, first: &IteratorId, second: &IteratorId) -> SchedResult<()> {
        let mut tree = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        tree.interchange(first, second)
    }
}
