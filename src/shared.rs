//! A vector store behind a reader/writer lock.

use std::fmt::Debug;
use std::hash::Hash;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::distance::Metric;
use crate::error::Result;
use crate::flat_index::FlatIndex;
use crate::index::Index;
use crate::storage::{SearchResult, VectorStore};

/// Thread-safe handle over a [`VectorStore`].
///
/// Queries share the lock; inserts and removals take it exclusively. Guards
/// release the lock when dropped, including on early return and unwinding.
/// Wrap in an `Arc` to share across threads.
#[derive(Debug)]
pub struct SharedVectorStore<K, I: Index = FlatIndex> {
    inner: RwLock<VectorStore<K, I>>,
}

impl<K, I> SharedVectorStore<K, I>
where
    K: Hash + Eq + Clone + Debug,
    I: Index,
{
    pub fn new(store: VectorStore<K, I>) -> Self {
        Self {
            inner: RwLock::new(store),
        }
    }

    /// Shared access for a sequence of reads against one consistent state.
    pub fn read(&self) -> RwLockReadGuard<'_, VectorStore<K, I>> {
        self.inner.read()
    }

    /// Exclusive access for a sequence of mutations.
    pub fn write(&self) -> RwLockWriteGuard<'_, VectorStore<K, I>> {
        self.inner.write()
    }

    pub fn insert(&self, id: K, vector: &[f32]) -> Result<()> {
        self.inner.write().insert(id, vector)
    }

    pub fn remove(&self, id: &K) -> Result<()> {
        self.inner.write().remove(id)
    }

    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchResult<K>>> {
        self.inner.read().query(vector, k)
    }

    pub fn query_with_metric(
        &self,
        vector: &[f32],
        k: usize,
        metric: Option<Metric>,
    ) -> Result<Vec<SearchResult<K>>> {
        self.inner.read().query_with_metric(vector, k, metric)
    }

    pub fn size(&self) -> usize {
        self.inner.read().size()
    }

    pub fn into_inner(self) -> VectorStore<K, I> {
        self.inner.into_inner()
    }
}

impl<K, I> From<VectorStore<K, I>> for SharedVectorStore<K, I>
where
    K: Hash + Eq + Clone + Debug,
    I: Index,
{
    fn from(store: VectorStore<K, I>) -> Self {
        Self::new(store)
    }
}
