//! AVX2 + FMA kernels (x86_64 only, selected at runtime).
//!
//! Every function here requires the caller to have verified `avx2` and `fma`
//! support. The batched kernels additionally require `rows` to hold
//! `(out.len() - 1) * stride + query.len()` floats.

use std::arch::x86_64::*;

use super::scalar::{dot_tail, l2_tail};
use super::LANES;

/// Rows handled per pass of the batched kernels. Each query load is shared
/// across this many accumulators.
const ROW_BLOCK: usize = 4;

#[target_feature(enable = "avx2,fma")]
#[inline]
unsafe fn hsum(acc: __m256) -> f32 {
    let hi = _mm256_extractf128_ps(acc, 1);
    let lo = _mm256_castps256_ps128(acc);
    let sum128 = _mm_add_ps(lo, hi);
    let shuf = _mm_movehdup_ps(sum128);
    let sums = _mm_add_ps(sum128, shuf);
    let shuf2 = _mm_movehl_ps(sums, sums);
    _mm_cvtss_f32(_mm_add_ss(sums, shuf2))
}

#[target_feature(enable = "avx2,fma")]
#[inline]
unsafe fn load<const ALIGNED: bool>(p: *const f32) -> __m256 {
    if ALIGNED {
        _mm256_load_ps(p)
    } else {
        _mm256_loadu_ps(p)
    }
}

#[target_feature(enable = "avx2,fma")]
pub(super) unsafe fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    let chunks = a.len() / LANES;
    let (pa, pb) = (a.as_ptr(), b.as_ptr());

    let mut acc = _mm256_setzero_ps();
    for i in 0..chunks {
        let va = _mm256_loadu_ps(pa.add(i * LANES));
        let vb = _mm256_loadu_ps(pb.add(i * LANES));
        let diff = _mm256_sub_ps(va, vb);
        acc = _mm256_fmadd_ps(diff, diff, acc);
    }

    l2_tail(hsum(acc), a, b, chunks * LANES)
}

#[target_feature(enable = "avx2,fma")]
pub(super) unsafe fn dot(a: &[f32], b: &[f32]) -> f32 {
    let chunks = a.len() / LANES;
    let (pa, pb) = (a.as_ptr(), b.as_ptr());

    let mut acc = _mm256_setzero_ps();
    for i in 0..chunks {
        let va = _mm256_loadu_ps(pa.add(i * LANES));
        let vb = _mm256_loadu_ps(pb.add(i * LANES));
        acc = _mm256_fmadd_ps(va, vb, acc);
    }

    dot_tail(hsum(acc), a, b, chunks * LANES)
}

/// One query against `out.len()` rows spaced `stride` floats apart.
///
/// With `ALIGNED`, every row start must sit on a 32-byte boundary.
#[target_feature(enable = "avx2,fma")]
pub(super) unsafe fn l2_squared_batch<const ALIGNED: bool>(
    query: &[f32],
    rows: &[f32],
    stride: usize,
    out: &mut [f32],
) {
    let dim = query.len();
    let chunks = dim / LANES;
    let q = query.as_ptr();
    let base = rows.as_ptr();
    let n = out.len();

    let mut r = 0;
    while r + ROW_BLOCK <= n {
        let mut acc = [_mm256_setzero_ps(); ROW_BLOCK];
        for c in 0..chunks {
            let vq = _mm256_loadu_ps(q.add(c * LANES));
            for (j, a) in acc.iter_mut().enumerate() {
                let vr = load::<ALIGNED>(base.add((r + j) * stride + c * LANES));
                let diff = _mm256_sub_ps(vq, vr);
                *a = _mm256_fmadd_ps(diff, diff, *a);
            }
        }
        for (j, a) in acc.iter().enumerate() {
            let start = (r + j) * stride;
            out[r + j] = l2_tail(hsum(*a), query, &rows[start..start + dim], chunks * LANES);
        }
        r += ROW_BLOCK;
    }

    for j in r..n {
        let start = j * stride;
        out[j] = l2_squared(query, &rows[start..start + dim]);
    }
}

#[target_feature(enable = "avx2,fma")]
pub(super) unsafe fn dot_batch<const ALIGNED: bool>(
    query: &[f32],
    rows: &[f32],
    stride: usize,
    out: &mut [f32],
) {
    let dim = query.len();
    let chunks = dim / LANES;
    let q = query.as_ptr();
    let base = rows.as_ptr();
    let n = out.len();

    let mut r = 0;
    while r + ROW_BLOCK <= n {
        let mut acc = [_mm256_setzero_ps(); ROW_BLOCK];
        for c in 0..chunks {
            let vq = _mm256_loadu_ps(q.add(c * LANES));
            for (j, a) in acc.iter_mut().enumerate() {
                let vr = load::<ALIGNED>(base.add((r + j) * stride + c * LANES));
                *a = _mm256_fmadd_ps(vq, vr, *a);
            }
        }
        for (j, a) in acc.iter().enumerate() {
            let start = (r + j) * stride;
            out[r + j] = dot_tail(hsum(*a), query, &rows[start..start + dim], chunks * LANES);
        }
        r += ROW_BLOCK;
    }

    for j in r..n {
        let start = j * stride;
        out[j] = dot(query, &rows[start..start + dim]);
    }
}
