//! SIMD distance kernels with runtime dispatch
//!
//! | Backend   | ISA      | Width             | Selected when                          |
//! |-----------|----------|-------------------|----------------------------------------|
//! | `Avx2Fma` | AVX2+FMA | 256-bit (8 x f32) | x86_64 and both features detected      |
//! | `Scalar`  | portable | 8 emulated lanes  | everywhere else, or when forced        |
//!
//! Both backends accumulate in eight lanes with fused multiply-add, reduce the
//! lanes with the same tree, and fold the `len % 8` tail in index order. The
//! scalar backend therefore returns the same bits as the AVX2 backend, and a
//! query against an unchanged buffer always reproduces its scores exactly.

#[cfg(target_arch = "x86_64")]
mod avx2;
mod scalar;

/// Floats per SIMD register (256-bit / 32-bit).
pub const LANES: usize = 8;

/// Byte alignment of a SIMD register.
pub const ALIGNMENT: usize = LANES * std::mem::size_of::<f32>();

/// The instruction set a [`Kernel`] runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Scalar,
    Avx2Fma,
}

/// Distance kernel bound to a backend that is known to be supported.
///
/// A `Kernel` can only be obtained through [`Kernel::detect`] or
/// [`Kernel::scalar`], so holding one proves the backend is safe to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kernel {
    backend: Backend,
}

impl Kernel {
    /// Pick the fastest backend the running CPU supports.
    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
                return Self {
                    backend: Backend::Avx2Fma,
                };
            }
        }

        Self::scalar()
    }

    /// The portable backend.
    pub fn scalar() -> Self {
        Self {
            backend: Backend::Scalar,
        }
    }

    /// `detect()` unless `force_scalar` is set.
    pub fn select(force_scalar: bool) -> Self {
        if force_scalar {
            Self::scalar()
        } else {
            Self::detect()
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Squared Euclidean distance `||a - b||²`.
    ///
    /// # Panics
    ///
    /// Panics if `a` and `b` differ in length.
    #[inline]
    pub fn l2_squared(self, a: &[f32], b: &[f32]) -> f32 {
        assert_eq!(a.len(), b.len(), "vector length mismatch");

        match self.backend {
            #[cfg(target_arch = "x86_64")]
            // SAFETY: an Avx2Fma kernel is only constructed after runtime detection.
            Backend::Avx2Fma => unsafe { avx2::l2_squared(a, b) },
            _ => scalar::l2_squared(a, b),
        }
    }

    /// Dot product `a · b`.
    ///
    /// # Panics
    ///
    /// Panics if `a` and `b` differ in length.
    #[inline]
    pub fn dot(self, a: &[f32], b: &[f32]) -> f32 {
        assert_eq!(a.len(), b.len(), "vector length mismatch");

        match self.backend {
            #[cfg(target_arch = "x86_64")]
            // SAFETY: see `l2_squared`.
            Backend::Avx2Fma => unsafe { avx2::dot(a, b) },
            _ => scalar::dot(a, b),
        }
    }

    /// L2 norm `||v||`.
    #[inline]
    pub fn norm(self, v: &[f32]) -> f32 {
        self.dot(v, v).sqrt()
    }

    /// Squared Euclidean distance from `query` to each of `out.len()` rows.
    ///
    /// Row `i` starts at `rows[i * stride]` and is `query.len()` floats long.
    ///
    /// # Panics
    ///
    /// Panics if `stride < query.len()` or `rows` is too short for
    /// `out.len()` rows.
    pub fn l2_squared_batch(self, query: &[f32], rows: &[f32], stride: usize, out: &mut [f32]) {
        check_block(query.len(), rows.len(), stride, out.len());

        match self.backend {
            #[cfg(target_arch = "x86_64")]
            // SAFETY: backend detected at construction; block bounds checked above,
            // alignment checked before choosing aligned loads.
            Backend::Avx2Fma => unsafe {
                if is_block_aligned(rows, stride) {
                    avx2::l2_squared_batch::<true>(query, rows, stride, out)
                } else {
                    avx2::l2_squared_batch::<false>(query, rows, stride, out)
                }
            },
            _ => scalar::l2_squared_batch(query, rows, stride, out),
        }
    }

    /// Dot product of `query` with each of `out.len()` rows. Layout as in
    /// [`Kernel::l2_squared_batch`].
    pub fn dot_batch(self, query: &[f32], rows: &[f32], stride: usize, out: &mut [f32]) {
        check_block(query.len(), rows.len(), stride, out.len());

        match self.backend {
            #[cfg(target_arch = "x86_64")]
            // SAFETY: see `l2_squared_batch`.
            Backend::Avx2Fma => unsafe {
                if is_block_aligned(rows, stride) {
                    avx2::dot_batch::<true>(query, rows, stride, out)
                } else {
                    avx2::dot_batch::<false>(query, rows, stride, out)
                }
            },
            _ => scalar::dot_batch(query, rows, stride, out),
        }
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::detect()
    }
}

fn check_block(dim: usize, rows_len: usize, stride: usize, n: usize) {
    assert!(stride >= dim, "row stride {} shorter than dimension {}", stride, dim);
    if n > 0 {
        assert!(
            rows_len >= (n - 1) * stride + dim,
            "row block of {} floats cannot hold {} rows",
            rows_len,
            n
        );
    }
}

#[cfg(target_arch = "x86_64")]
fn is_block_aligned(rows: &[f32], stride: usize) -> bool {
    rows.as_ptr() as usize % ALIGNMENT == 0 && stride % LANES == 0
}
