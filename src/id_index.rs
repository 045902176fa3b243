//! Bidirectional identifier <-> row slot mapping with a free list.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{Result, StoreError};

/// Maps caller identifiers to buffer slots and back.
///
/// Invariant: every bound identifier refers to exactly one slot, and that
/// slot maps back to it. Slots released by [`IdentifierIndex::unbind`] are
/// pushed onto a free list and handed out again before fresh slots.
#[derive(Debug, Clone)]
pub struct IdentifierIndex<K> {
    by_id: HashMap<K, usize>,
    by_slot: Vec<Option<K>>,
    free: Vec<usize>,
}

impl<K> IdentifierIndex<K>
where
    K: Hash + Eq + Clone + Debug,
{
    pub fn new() -> Self {
        Self {
            by_id: HashMap::new(),
            by_slot: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            by_id: HashMap::with_capacity(capacity),
            by_slot: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    /// Bind `id` to `slot`.
    pub fn bind(&mut self, id: K, slot: usize) -> Result<()> {
        if self.by_id.contains_key(&id) {
            return Err(StoreError::duplicate(&id));
        }
        if slot >= self.by_slot.len() {
            self.by_slot.resize_with(slot + 1, || None);
        }
        debug_assert!(self.by_slot[slot].is_none(), "slot {} already bound", slot);

        self.by_slot[slot] = Some(id.clone());
        self.by_id.insert(id, slot);
        Ok(())
    }

    pub fn lookup(&self, id: &K) -> Result<usize> {
        self.by_id
            .get(id)
            .copied()
            .ok_or_else(|| StoreError::unknown(id))
    }

    /// Remove the mapping for `id` and return its slot, which becomes
    /// available through [`IdentifierIndex::peek_free`].
    pub fn unbind(&mut self, id: &K) -> Result<usize> {
        let slot = self.by_id.remove(id).ok_or_else(|| StoreError::unknown(id))?;
        self.by_slot[slot] = None;
        self.free.push(slot);
        Ok(slot)
    }

    pub fn contains(&self, id: &K) -> bool {
        self.by_id.contains_key(id)
    }

    /// The identifier occupying `slot`, if any.
    pub fn identifier_at(&self, slot: usize) -> Option<&K> {
        self.by_slot.get(slot).and_then(|id| id.as_ref())
    }

    /// The slot the next insert should reuse, without claiming it.
    pub fn peek_free(&self) -> Option<usize> {
        self.free.last().copied()
    }

    /// Take `slot` off the free list. It must be the value last returned by
    /// [`IdentifierIndex::peek_free`].
    pub fn claim_free(&mut self, slot: usize) {
        let popped = self.free.pop();
        debug_assert_eq!(popped, Some(slot));
    }

    pub fn free_slots(&self) -> usize {
        self.free.len()
    }

    /// Number of bound identifiers.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Iterate over `(identifier, slot)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, usize)> {
        self.by_id.iter().map(|(id, &slot)| (id, slot))
    }
}

impl<K> Default for IdentifierIndex<K>
where
    K: Hash + Eq + Clone + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_and_lookup() {
        let mut index = IdentifierIndex::new();
        index.bind(42u64, 0).unwrap();
        index.bind(7u64, 1).unwrap();

        assert_eq!(index.lookup(&42).unwrap(), 0);
        assert_eq!(index.lookup(&7).unwrap(), 1);
        assert_eq!(index.identifier_at(1), Some(&7));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_bind_duplicate() {
        let mut index = IdentifierIndex::new();
        index.bind("a".to_string(), 0).unwrap();
        assert!(matches!(
            index.bind("a".to_string(), 1),
            Err(StoreError::DuplicateIdentifier { .. })
        ));
        assert_eq!(index.len(), 1);
        assert_eq!(index.identifier_at(1), None);
    }

    #[test]
    fn test_lookup_unknown() {
        let index: IdentifierIndex<u64> = IdentifierIndex::new();
        assert_eq!(
            index.lookup(&3).unwrap_err(),
            StoreError::UnknownIdentifier {
                id: "3".to_string()
            }
        );
    }

    #[test]
    fn test_unbind_recycles_slot() {
        let mut index = IdentifierIndex::new();
        index.bind(1u64, 0).unwrap();
        index.bind(2u64, 1).unwrap();

        assert_eq!(index.unbind(&1).unwrap(), 0);
        assert_eq!(index.identifier_at(0), None);
        assert_eq!(index.peek_free(), Some(0));
        assert!(!index.contains(&1));

        index.claim_free(0);
        index.bind(3u64, 0).unwrap();
        assert_eq!(index.lookup(&3).unwrap(), 0);
        assert_eq!(index.free_slots(), 0);
    }

    #[test]
    fn test_unbind_unknown() {
        let mut index: IdentifierIndex<u64> = IdentifierIndex::new();
        assert!(matches!(
            index.unbind(&9),
            Err(StoreError::UnknownIdentifier { .. })
        ));
    }
}
