//! In-memory vector storage

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

use rayon::prelude::*;
use tracing::{info, trace};

use crate::buffer::VectorBuffer;
use crate::config::StoreConfig;
use crate::distance::{Metric, PreparedQuery};
use crate::error::{Result, StoreError};
use crate::flat_index::FlatIndex;
use crate::id_index::IdentifierIndex;
use crate::index::{Index, Rows, SlotMeta};
use crate::kernel::Kernel;

/// Smallest capacity the buffer grows to from empty.
const MIN_GROWTH: usize = 4;

/// A search result containing the identifier and its score.
///
/// `score` is the squared distance for [`Metric::L2Squared`] and the
/// similarity for [`Metric::Cosine`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult<K> {
    pub id: K,
    pub score: f32,
}

/// Fixed-dimension vector store with a pluggable search index.
///
/// The store is synchronous and does no locking. Any number of threads may
/// call [`VectorStore::query`] through a shared reference at once; `insert`
/// and `remove` take `&mut self` and therefore need exclusive access. Wrap
/// the store in [`crate::SharedVectorStore`] for a ready-made reader/writer
/// lock.
#[derive(Debug)]
pub struct VectorStore<K, I: Index = FlatIndex> {
    buffer: VectorBuffer,
    ids: IdentifierIndex<K>,
    /// Metadata per slot handed out so far; `None` marks a free slot.
    slots: Vec<Option<SlotMeta>>,
    index: I,
    kernel: Kernel,
    config: StoreConfig,
    next_seq: u64,
}

impl<K> VectorStore<K, FlatIndex>
where
    K: Hash + Eq + Clone + Debug,
{
    /// Create a store with an exact flat index.
    pub fn new(dimension: usize, metric: Metric, initial_capacity: usize) -> Result<Self> {
        Self::from_config(StoreConfig::new(dimension, metric).with_capacity(initial_capacity))
    }

    /// Create a store with an exact flat index from a full configuration.
    pub fn from_config(config: StoreConfig) -> Result<Self> {
        Self::with_index(config, FlatIndex::new())
    }
}

impl<K, I> VectorStore<K, I>
where
    K: Hash + Eq + Clone + Debug,
    I: Index,
{
    /// Create a store that answers queries through `index`.
    pub fn with_index(config: StoreConfig, mut index: I) -> Result<Self> {
        config.validate()?;
        let buffer = VectorBuffer::allocate(config.initial_capacity, config.dimension)?;
        let kernel = Kernel::select(config.force_scalar);
        index.reserve(buffer.capacity());

        info!(
            dimension = config.dimension,
            metric = %config.metric,
            backend = ?kernel.backend(),
            capacity = buffer.capacity(),
            exact = index.is_exact(),
            "created vector store"
        );

        Ok(Self {
            buffer,
            ids: IdentifierIndex::with_capacity(config.initial_capacity),
            slots: Vec::with_capacity(config.initial_capacity),
            index,
            kernel,
            config,
            next_seq: 0,
        })
    }

    /// Insert `vector` under `id`.
    ///
    /// Fails with [`StoreError::DuplicateIdentifier`] if `id` is present (there
    /// is no implicit upsert) and [`StoreError::DimensionMismatch`] on a wrong
    /// length. A failed insert leaves no trace.
    pub fn insert(&mut self, id: K, vector: &[f32]) -> Result<()> {
        self.check_dimension(vector.len())?;
        if self.ids.contains(&id) {
            return Err(StoreError::duplicate(&id));
        }
        self.insert_unchecked(id, vector)
    }

    /// Insert many records, all or nothing.
    ///
    /// The whole batch is validated (lengths, identifiers already stored,
    /// identifiers repeated within the batch) and room is reserved before the
    /// first row is written. Returns the number of records inserted.
    pub fn insert_batch<V>(&mut self, records: impl IntoIterator<Item = (K, V)>) -> Result<usize>
    where
        V: AsRef<[f32]>,
    {
        let records: Vec<(K, V)> = records.into_iter().collect();

        let mut seen = HashSet::with_capacity(records.len());
        for (id, vector) in &records {
            self.check_dimension(vector.as_ref().len())?;
            if self.ids.contains(id) || !seen.insert(id) {
                return Err(StoreError::duplicate(id));
            }
        }
        drop(seen);

        self.reserve(records.len())?;
        let count = records.len();
        for (id, vector) in records {
            self.insert_unchecked(id, vector.as_ref())?;
        }
        Ok(count)
    }

    /// Remove the record stored under `id`.
    ///
    /// The row's memory is left as is unless `scrub_on_remove` is configured.
    pub fn remove(&mut self, id: &K) -> Result<()> {
        let slot = self.ids.unbind(id)?;
        self.slots[slot] = None;

        let rows = Rows {
            buffer: &self.buffer,
            slots: &self.slots,
            kernel: self.kernel,
            metric: self.config.metric,
        };
        self.index.remove(slot, &rows);

        if self.config.scrub_on_remove {
            self.buffer.scrub(slot);
        }
        Ok(())
    }

    /// The `k` best matches for `vector` under the store's metric.
    ///
    /// Returns fewer than `k` results, without error, when fewer rows are
    /// stored.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchResult<K>>> {
        self.query_with_metric(vector, k, None)
    }

    /// Like [`VectorStore::query`], optionally ranking by another metric.
    pub fn query_with_metric(
        &self,
        vector: &[f32],
        k: usize,
        metric: Option<Metric>,
    ) -> Result<Vec<SearchResult<K>>> {
        self.check_dimension(vector.len())?;
        if k == 0 {
            return Err(StoreError::InvalidK);
        }

        let metric = metric.unwrap_or(self.config.metric);
        let query = PreparedQuery::new(vector, metric, self.kernel);
        let candidates = self.index.search(&self.rows(), &query, k);
        trace!(k, found = candidates.len(), size = self.size(), "query");

        Ok(candidates
            .into_iter()
            .filter_map(|c| {
                self.ids.identifier_at(c.slot).map(|id| SearchResult {
                    id: id.clone(),
                    score: metric.score(c.key),
                })
            })
            .collect())
    }

    /// Answer several queries in parallel on the rayon pool.
    pub fn query_batch<Q>(&self, queries: &[Q], k: usize) -> Result<Vec<Vec<SearchResult<K>>>>
    where
        Q: AsRef<[f32]> + Sync,
        K: Send + Sync,
        I: Sync,
    {
        queries.par_iter().map(|q| self.query(q.as_ref(), k)).collect()
    }

    /// Make room for `additional` more records without further growth.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let fresh_needed = additional.saturating_sub(self.ids.free_slots());
        let required = self
            .slots
            .len()
            .checked_add(fresh_needed)
            .ok_or(StoreError::CapacityOverflow {
                requested: usize::MAX,
            })?;
        if required > self.buffer.capacity() {
            self.buffer.grow(required)?;
            self.index.reserve(required);
        }
        Ok(())
    }

    /// The stored vector for `id`, borrowed from the buffer.
    pub fn get(&self, id: &K) -> Option<&[f32]> {
        self.ids.lookup(id).ok().map(|slot| self.buffer.read(slot))
    }

    pub fn contains(&self, id: &K) -> bool {
        self.ids.contains(id)
    }

    /// All stored identifiers, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = &K> {
        self.ids.iter().map(|(id, _)| id)
    }

    /// Number of stored records.
    pub fn size(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of row slots currently allocated.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    pub fn metric(&self) -> Metric {
        self.config.metric
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Get a reference to the underlying index.
    pub fn index(&self) -> &I {
        &self.index
    }

    fn rows(&self) -> Rows<'_> {
        Rows {
            buffer: &self.buffer,
            slots: &self.slots,
            kernel: self.kernel,
            metric: self.config.metric,
        }
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        if actual != self.config.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.config.dimension,
                actual,
            });
        }
        Ok(())
    }

    /// Insert a record whose length and identifier were already validated.
    fn insert_unchecked(&mut self, id: K, vector: &[f32]) -> Result<()> {
        let recycled = self.ids.peek_free();
        let slot = recycled.unwrap_or(self.slots.len());
        if slot >= self.buffer.capacity() {
            self.grow_for(slot + 1)?;
        }

        self.buffer.write(slot, vector)?;
        let meta = SlotMeta {
            seq: self.next_seq,
            norm: self.kernel.norm(vector),
        };
        if recycled.is_some() {
            self.slots[slot] = Some(meta);
        } else {
            self.slots.push(Some(meta));
        }

        let rows = Rows {
            buffer: &self.buffer,
            slots: &self.slots,
            kernel: self.kernel,
            metric: self.config.metric,
        };
        if let Err(err) = self.index.insert(slot, &rows) {
            if recycled.is_some() {
                self.slots[slot] = None;
            } else {
                self.slots.pop();
            }
            return Err(err);
        }

        if recycled.is_some() {
            self.ids.claim_free(slot);
        }
        self.ids.bind(id, slot)?;
        self.next_seq += 1;
        Ok(())
    }

    /// Grow by doubling until at least `min_capacity` slots exist.
    fn grow_for(&mut self, min_capacity: usize) -> Result<()> {
        let doubled = self.buffer.capacity().saturating_mul(2).max(MIN_GROWTH);
        let target = doubled.max(min_capacity);
        self.buffer.grow(target)?;
        self.index.reserve(target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn l2_store(dimension: usize) -> VectorStore<u64> {
        VectorStore::new(dimension, Metric::L2Squared, 0).unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let mut store = l2_store(3);
        store.insert(1, &[1.0, 2.0, 3.0]).unwrap();

        assert_eq!(store.size(), 1);
        assert_eq!(store.get(&1), Some(&[1.0, 2.0, 3.0][..]));
        assert_eq!(store.get(&2), None);
    }

    #[test]
    fn test_invalid_dimension() {
        assert_eq!(
            VectorStore::<u64>::new(0, Metric::L2Squared, 4).unwrap_err(),
            StoreError::InvalidDimension
        );
    }

    #[test]
    fn test_dimension_consistency() {
        let mut store = l2_store(3);
        store.insert(1, &[1.0, 2.0, 3.0]).unwrap();

        let result = store.insert(2, &[1.0, 2.0]);
        assert!(matches!(
            result,
            Err(StoreError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn test_duplicate_insert_leaves_state() {
        let mut store = l2_store(2);
        store.insert(1, &[1.0, 0.0]).unwrap();
        let capacity = store.capacity();

        assert!(matches!(
            store.insert(1, &[0.0, 1.0]),
            Err(StoreError::DuplicateIdentifier { .. })
        ));
        assert_eq!(store.size(), 1);
        assert_eq!(store.capacity(), capacity);
        assert_eq!(store.get(&1), Some(&[1.0, 0.0][..]));
    }

    #[test]
    fn test_remove() {
        let mut store = l2_store(3);
        store.insert(1, &[1.0, 2.0, 3.0]).unwrap();

        store.remove(&1).unwrap();
        assert_eq!(store.size(), 0);
        assert!(matches!(
            store.remove(&1),
            Err(StoreError::UnknownIdentifier { .. })
        ));
        assert_eq!(store.size(), 0);
    }

    #[test]
    fn test_remove_recycles_slot() {
        let mut store = l2_store(2);
        store.insert(1, &[1.0, 0.0]).unwrap();
        store.insert(2, &[0.0, 1.0]).unwrap();
        let capacity = store.capacity();

        store.remove(&1).unwrap();
        store.insert(3, &[5.0, 5.0]).unwrap();
        assert_eq!(store.capacity(), capacity);
        assert_eq!(store.slots.len(), 2);
        assert_eq!(store.get(&3), Some(&[5.0, 5.0][..]));
    }

    #[test]
    fn test_scrub_on_remove() {
        let config = StoreConfig::new(2, Metric::L2Squared).with_scrub_on_remove(true);
        let mut store: VectorStore<u64> = VectorStore::from_config(config).unwrap();
        store.insert(1, &[3.0, 4.0]).unwrap();
        store.remove(&1).unwrap();
        assert_eq!(store.buffer.read(0), &[0.0, 0.0]);
    }

    #[test]
    fn test_remove_without_scrub_keeps_memory() {
        let mut store = l2_store(2);
        store.insert(1, &[3.0, 4.0]).unwrap();
        store.remove(&1).unwrap();
        assert_eq!(store.buffer.read(0), &[3.0, 4.0]);
    }

    #[test]
    fn test_search() {
        let mut store: VectorStore<String> = VectorStore::new(3, Metric::L2Squared, 0).unwrap();
        store.insert("v1".to_string(), &[1.0, 0.0, 0.0]).unwrap();
        store.insert("v2".to_string(), &[0.0, 1.0, 0.0]).unwrap();
        store.insert("v3".to_string(), &[1.0, 1.0, 0.0]).unwrap();

        let results = store.query(&[1.0, 0.0, 0.0], 2).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "v1");
        assert_relative_eq!(results[0].score, 0.0, epsilon = 1e-6);
        assert_eq!(results[1].id, "v3");
        assert_relative_eq!(results[1].score, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_search_empty_store() {
        let store = l2_store(3);
        let results = store.query(&[1.0, 2.0, 3.0], 5).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_query_validation() {
        let store = l2_store(3);
        assert_eq!(store.query(&[1.0, 2.0, 3.0], 0).unwrap_err(), StoreError::InvalidK);
        assert!(matches!(
            store.query(&[1.0], 1),
            Err(StoreError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_ties_break_by_insertion_order() {
        let mut store = l2_store(1);
        store.insert(10, &[1.0]).unwrap();
        store.insert(20, &[-1.0]).unwrap();
        store.insert(30, &[1.0]).unwrap();

        // Free slot 0, then refill it: the newcomer is still the latest insert.
        store.remove(&10).unwrap();
        store.insert(40, &[-1.0]).unwrap();

        let ids: Vec<u64> = store
            .query(&[0.0], 3)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![20, 30, 40]);
    }

    #[test]
    fn test_query_with_metric_override() {
        let mut store = l2_store(2);
        store.insert(1, &[10.0, 0.0]).unwrap();
        store.insert(2, &[0.5, 0.5]).unwrap();

        let l2 = store.query(&[1.0, 0.0], 1).unwrap();
        assert_eq!(l2[0].id, 2);

        let cos = store.query_with_metric(&[1.0, 0.0], 1, Some(Metric::Cosine)).unwrap();
        assert_eq!(cos[0].id, 1);
        assert_relative_eq!(cos[0].score, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_growth_doubles() {
        let mut store = l2_store(2);
        assert_eq!(store.capacity(), 0);
        store.insert(0, &[0.0, 0.0]).unwrap();
        assert_eq!(store.capacity(), MIN_GROWTH);
        for i in 1..=MIN_GROWTH as u64 {
            store.insert(i, &[i as f32, 0.0]).unwrap();
        }
        assert_eq!(store.capacity(), MIN_GROWTH * 2);
        assert_eq!(store.get(&0), Some(&[0.0, 0.0][..]));
    }

    #[test]
    fn test_reserve() {
        let mut store = l2_store(2);
        store.reserve(100).unwrap();
        assert_eq!(store.capacity(), 100);
        for i in 0..100u64 {
            store.insert(i, &[i as f32, 1.0]).unwrap();
        }
        assert_eq!(store.capacity(), 100);
    }

    #[test]
    fn test_insert_batch() {
        let mut store = l2_store(2);
        let inserted = store
            .insert_batch(vec![(1, vec![0.0, 0.0]), (2, vec![1.0, 1.0])])
            .unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(store.size(), 2);
    }

    #[test]
    fn test_insert_batch_is_all_or_nothing() {
        let mut store = l2_store(2);
        store.insert(1, &[0.0, 0.0]).unwrap();

        let dup_in_store = store.insert_batch(vec![(2, vec![1.0, 1.0]), (1, vec![2.0, 2.0])]);
        assert!(matches!(dup_in_store, Err(StoreError::DuplicateIdentifier { .. })));

        let dup_in_batch = store.insert_batch(vec![(3, vec![1.0, 1.0]), (3, vec![2.0, 2.0])]);
        assert!(matches!(dup_in_batch, Err(StoreError::DuplicateIdentifier { .. })));

        let bad_len = store.insert_batch(vec![(4, vec![1.0, 1.0]), (5, vec![2.0])]);
        assert!(matches!(bad_len, Err(StoreError::DimensionMismatch { .. })));

        assert_eq!(store.size(), 1);
        assert!(!store.contains(&2));
    }

    #[test]
    fn test_query_batch_matches_single_queries() {
        let mut store = l2_store(2);
        for i in 0..20u64 {
            store.insert(i, &[i as f32, (i % 3) as f32]).unwrap();
        }
        let queries = vec![vec![0.0, 0.0], vec![10.0, 1.0], vec![19.0, 2.0]];
        let batched = store.query_batch(&queries, 3).unwrap();

        for (q, results) in queries.iter().zip(&batched) {
            assert_eq!(*results, store.query(q, 3).unwrap());
        }
    }

    #[test]
    fn test_ids() {
        let mut store = l2_store(1);
        store.insert(5, &[1.0]).unwrap();
        store.insert(6, &[2.0]).unwrap();
        let mut ids: Vec<u64> = store.ids().copied().collect();
        ids.sort();
        assert_eq!(ids, vec![5, 6]);
    }
}
