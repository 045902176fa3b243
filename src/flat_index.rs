//! Brute-force flat index: exact O(n·d) k-NN search

use crate::distance::{cosine_from_dot, Metric, PreparedQuery};
use crate::error::Result;
use crate::index::{Index, Rows};
use crate::topk::{Candidate, TopK};

/// Rows scored per batched kernel call. The score scratch lives on the stack.
const SCAN_BLOCK: usize = 256;

/// Exhaustive scan over every occupied row.
///
/// Holds no state of its own: the buffer is the index.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatIndex;

impl FlatIndex {
    pub fn new() -> Self {
        FlatIndex
    }
}

impl Index for FlatIndex {
    fn insert(&mut self, _slot: usize, _rows: &Rows<'_>) -> Result<()> {
        Ok(())
    }

    fn remove(&mut self, _slot: usize, _rows: &Rows<'_>) {}

    fn search(&self, rows: &Rows<'_>, query: &PreparedQuery<'_>, k: usize) -> Vec<Candidate> {
        let mut top = TopK::new(k);
        let mut scores = [0.0f32; SCAN_BLOCK];
        let stride = rows.buffer.stride();
        let high_water = rows.high_water();

        let mut first = 0;
        while first < high_water {
            let count = SCAN_BLOCK.min(high_water - first);
            let block = rows.buffer.rows(first, count);
            let out = &mut scores[..count];

            match query.metric {
                Metric::L2Squared => rows.kernel.l2_squared_batch(query.vector, block, stride, out),
                Metric::Cosine => rows.kernel.dot_batch(query.vector, block, stride, out),
            }

            for (i, &raw) in out.iter().enumerate() {
                let slot = first + i;
                let Some(meta) = rows.slots[slot] else {
                    continue;
                };
                let score = match query.metric {
                    Metric::L2Squared => raw,
                    Metric::Cosine => cosine_from_dot(raw, query.norm, meta.norm),
                };
                top.offer(Candidate::new(slot, meta.seq, query.metric.rank_key(score)));
            }

            first += count;
        }

        top.into_sorted_vec()
    }

    fn is_exact(&self) -> bool {
        true
    }
}
