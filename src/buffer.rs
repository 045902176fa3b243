//! Aligned row storage for fixed-dimension vectors.
//!
//! All rows live in one contiguous allocation. Each row starts on a 32-byte
//! boundary: the backing store is a `Vec` of 32-byte aligned lane blocks and
//! the row stride is the dimension rounded up to a whole number of blocks.
//! Padding floats stay zero and are never read by the kernels, which only
//! look at the first `dimension` floats of a row.

use bytemuck::{Pod, Zeroable};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::kernel::LANES;

/// One SIMD register worth of floats, aligned for `_mm256_load_ps`.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C, align(32))]
struct LaneBlock([f32; LANES]);

/// Contiguous, SIMD-aligned storage of `capacity` rows of `dimension` floats.
#[derive(Debug, Clone)]
pub struct VectorBuffer {
    blocks: Vec<LaneBlock>,
    dimension: usize,
    blocks_per_row: usize,
    capacity: usize,
}

impl VectorBuffer {
    /// Reserve zeroed storage for `capacity` rows.
    pub fn allocate(capacity: usize, dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(StoreError::InvalidDimension);
        }

        let mut buffer = Self {
            blocks: Vec::new(),
            dimension,
            blocks_per_row: dimension.div_ceil(LANES),
            capacity: 0,
        };
        buffer.grow(capacity)?;
        Ok(buffer)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of row slots currently allocated.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Distance in floats between the starts of consecutive rows.
    pub fn stride(&self) -> usize {
        self.blocks_per_row * LANES
    }

    /// Copy `vector` into row `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= capacity()`.
    pub fn write(&mut self, slot: usize, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        self.row_mut(slot).copy_from_slice(vector);
        Ok(())
    }

    /// Borrow row `slot` without copying.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= capacity()`.
    pub fn read(&self, slot: usize) -> &[f32] {
        assert!(slot < self.capacity, "slot {} out of range", slot);
        let start = slot * self.stride();
        &self.floats()[start..start + self.dimension]
    }

    /// Zero row `slot`.
    pub fn scrub(&mut self, slot: usize) {
        self.row_mut(slot).fill(0.0);
    }

    /// A contiguous block covering rows `first..first + count`, for the
    /// batched kernels. Row `i` of the block starts at `i * stride()`.
    ///
    /// # Panics
    ///
    /// Panics if the range extends past `capacity()`.
    pub fn rows(&self, first: usize, count: usize) -> &[f32] {
        assert!(first + count <= self.capacity, "row range out of bounds");
        let stride = self.stride();
        &self.floats()[first * stride..(first + count) * stride]
    }

    /// Reallocate to hold `new_capacity` rows, copying existing rows.
    ///
    /// Shrinking is a no-op. On allocation failure the buffer is unchanged.
    pub fn grow(&mut self, new_capacity: usize) -> Result<()> {
        if new_capacity <= self.capacity {
            return Ok(());
        }

        let overflow = StoreError::CapacityOverflow {
            requested: new_capacity,
        };
        let total_blocks = new_capacity
            .checked_mul(self.blocks_per_row)
            .ok_or_else(|| overflow.clone())?;
        let additional = total_blocks - self.blocks.len();
        self.blocks
            .try_reserve_exact(additional)
            .map_err(|_| overflow)?;
        self.blocks.resize(total_blocks, LaneBlock::zeroed());

        debug!(
            from = self.capacity,
            to = new_capacity,
            dimension = self.dimension,
            "grew vector buffer"
        );
        self.capacity = new_capacity;
        Ok(())
    }

    fn floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.blocks)
    }

    fn row_mut(&mut self, slot: usize) -> &mut [f32] {
        assert!(slot < self.capacity, "slot {} out of range", slot);
        let start = slot * self.stride();
        let dimension = self.dimension;
        let floats: &mut [f32] = bytemuck::cast_slice_mut(&mut self.blocks);
        &mut floats[start..start + dimension]
    }
}
