//! Portable kernels.
//!
//! These emulate the AVX2 accumulation exactly: eight independent lane
//! accumulators fed with fused multiply-add, the same horizontal reduction
//! tree, and the same tail loop. Results are bit-identical to the SIMD path.

use super::LANES;

/// Horizontal sum in the order the AVX2 path performs it:
/// fold the high half onto the low half, then pairs, then the final add.
#[inline(always)]
pub(crate) fn reduce(acc: [f32; LANES]) -> f32 {
    let s0 = acc[0] + acc[4];
    let s1 = acc[1] + acc[5];
    let s2 = acc[2] + acc[6];
    let s3 = acc[3] + acc[7];
    (s0 + s1) + (s2 + s3)
}

/// Fold the components past the last full lane group into `sum`.
#[inline(always)]
pub(crate) fn l2_tail(mut sum: f32, a: &[f32], b: &[f32], start: usize) -> f32 {
    for i in start..a.len() {
        let d = a[i] - b[i];
        sum = d.mul_add(d, sum);
    }
    sum
}

#[inline(always)]
pub(crate) fn dot_tail(mut sum: f32, a: &[f32], b: &[f32], start: usize) -> f32 {
    for i in start..a.len() {
        sum = a[i].mul_add(b[i], sum);
    }
    sum
}

pub(crate) fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    let mut acc = [0.0f32; LANES];
    for (ca, cb) in a.chunks_exact(LANES).zip(b.chunks_exact(LANES)) {
        for l in 0..LANES {
            let d = ca[l] - cb[l];
            acc[l] = d.mul_add(d, acc[l]);
        }
    }
    let tail_start = (a.len() / LANES) * LANES;
    l2_tail(reduce(acc), a, b, tail_start)
}

pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    let mut acc = [0.0f32; LANES];
    for (ca, cb) in a.chunks_exact(LANES).zip(b.chunks_exact(LANES)) {
        for l in 0..LANES {
            acc[l] = ca[l].mul_add(cb[l], acc[l]);
        }
    }
    let tail_start = (a.len() / LANES) * LANES;
    dot_tail(reduce(acc), a, b, tail_start)
}

pub(crate) fn l2_squared_batch(query: &[f32], rows: &[f32], stride: usize, out: &mut [f32]) {
    let dim = query.len();
    for (r, slot) in out.iter_mut().enumerate() {
        let start = r * stride;
        *slot = l2_squared(query, &rows[start..start + dim]);
    }
}

pub(crate) fn dot_batch(query: &[f32], rows: &[f32], stride: usize, out: &mut [f32]) {
    let dim = query.len();
    for (r, slot) in out.iter_mut().enumerate() {
        let start = r * stride;
        *slot = dot(query, &rows[start..start + dim]);
    }
}
