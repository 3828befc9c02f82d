//! Writer locks for the department forest
//!
//! Mutations serialize per tree_id. Allocating a new tree_id (root insert,
//! move) additionally takes the forest lock. Locks are always acquired forest
//! first, then tree ids ascending.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-tree mutexes
#[derive(Debug, Default)]
pub struct TreeLocks {
    forest: Arc<Mutex<()>>,
    trees: DashMap<i32, Arc<Mutex<()>>>,
}

/// Held for the lifetime of a write transaction
#[derive(Debug)]
pub struct WriteGuard {
    _forest: Option<OwnedMutexGuard<()>>,
    trees: Vec<(i32, OwnedMutexGuard<()>)>,
}

impl WriteGuard {
    /// Tree ids held by this guard, ascending
    pub fn tree_ids(&self) -> Vec<i32> {
        self.trees.iter().map(|(id, _)| *id).collect()
    }
}

impl TreeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn tree_mutex(&self, tree_id: i32) -> Arc<Mutex<()>> {
        self.trees.entry(tree_id).or_default().clone()
    }

    /// Lock the given trees, plus the forest when `forest` is set
    pub async fn acquire(&self, forest: bool, tree_ids: &[i32]) -> WriteGuard {
        let forest = if forest {
            Some(self.forest.clone().lock_owned().await)
        } else {
            None
        };

        let mut ids = tree_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut trees = Vec::with_capacity(ids.len());
        for id in ids {
            let guard = self.tree_mutex(id).lock_owned().await;
            trees.push((id, guard));
        }

        WriteGuard {
            _forest: forest,
            trees,
        }
    }
}
