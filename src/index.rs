//! Index trait for pluggable search backends

use crate::buffer::VectorBuffer;
use crate::distance::{Metric, PreparedQuery};
use crate::error::Result;
use crate::kernel::Kernel;
use crate::topk::Candidate;

/// Per-slot bookkeeping kept by the store for every occupied row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotMeta {
    /// Monotonic insertion sequence number, used to break score ties.
    pub seq: u64,
    /// Precomputed L2 norm of the row.
    pub norm: f32,
}

/// Read-only view of the stored rows handed to an [`Index`].
///
/// `slots[i]` is `Some` when row `i` of the buffer is occupied. Slots past
/// `slots.len()` have never been used.
#[derive(Debug, Clone, Copy)]
pub struct Rows<'a> {
    pub buffer: &'a VectorBuffer,
    pub slots: &'a [Option<SlotMeta>],
    pub kernel: Kernel,
    /// The store's configured metric, used to build graph indexes.
    pub metric: Metric,
}

impl<'a> Rows<'a> {
    /// Row data and metadata for an occupied slot.
    #[inline]
    pub fn get(&self, slot: usize) -> Option<(&'a [f32], SlotMeta)> {
        match self.slots.get(slot) {
            Some(Some(meta)) => Some((self.buffer.read(slot), *meta)),
            _ => None,
        }
    }

    /// Score an occupied slot against `query`.
    #[inline]
    pub fn candidate(&self, query: &PreparedQuery<'_>, slot: usize) -> Option<Candidate> {
        self.get(slot).map(|(row, meta)| {
            Candidate::new(slot, meta.seq, query.rank_key(self.kernel, row, meta.norm))
        })
    }

    /// A query for the stored row at an occupied `slot`, ranked by the
    /// store's metric.
    #[inline]
    pub fn query_for(&self, slot: usize) -> Option<PreparedQuery<'a>> {
        self.get(slot).map(|(vector, meta)| PreparedQuery {
            vector,
            metric: self.metric,
            norm: meta.norm,
        })
    }

    /// Number of slots ever handed out (occupied or free).
    pub fn high_water(&self) -> usize {
        self.slots.len()
    }
}

/// A search structure over the rows of a [`VectorBuffer`].
///
/// The store owns the rows; an index only sees them through [`Rows`] and is
/// told about every insert and removal by slot number.
pub trait Index {
    /// Row `slot` was just written and is now occupied.
    fn insert(&mut self, slot: usize, rows: &Rows<'_>) -> Result<()>;

    /// Row `slot` was just freed. `rows` no longer lists it as occupied.
    fn remove(&mut self, slot: usize, rows: &Rows<'_>);

    /// The buffer now has room for `capacity` slots.
    fn reserve(&mut self, _capacity: usize) {}

    /// The best `k` occupied rows for `query`, best first.
    fn search(&self, rows: &Rows<'_>, query: &PreparedQuery<'_>, k: usize) -> Vec<Candidate>;

    /// Whether results are exact.
    fn is_exact(&self) -> bool;
}
