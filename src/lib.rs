//! # flatvec
//!
//! An in-memory, fixed-dimension vector store with exact k-nearest-neighbor
//! search.
//!
//! This library provides:
//! - A 32-byte aligned row buffer with slot recycling
//! - AVX2/FMA distance kernels with a bit-identical scalar fallback
//! - Squared Euclidean and cosine ranking with deterministic tie-breaks
//! - An exact flat scan by default and an optional HNSW index
//!
//! ## Example
//!
//! ```rust
//! use flatvec::{Metric, VectorStore};
//!
//! let mut store: VectorStore<u64> = VectorStore::new(4, Metric::L2Squared, 16)?;
//! store.insert(1, &[0.0, 0.0, 0.0, 0.0])?;
//! store.insert(2, &[1.0, 1.0, 1.0, 1.0])?;
//!
//! let results = store.query(&[0.0; 4], 2)?;
//! assert_eq!(results[0].id, 1);
//! assert_eq!(results[1].score, 4.0);
//! # Ok::<(), flatvec::StoreError>(())
//! ```

pub mod buffer;
pub mod config;
pub mod distance;
pub mod error;
pub mod flat_index;
pub mod hnsw;
pub mod id_index;
pub mod index;
pub mod kernel;
pub mod metrics;
pub mod shared;
pub mod storage;
pub mod topk;
pub mod vector;

pub use config::{HnswParams, StoreConfig};
pub use distance::Metric;
pub use error::{Result, StoreError};
pub use flat_index::FlatIndex;
pub use hnsw::HnswIndex;
pub use index::Index;
pub use kernel::{Backend, Kernel};
pub use shared::SharedVectorStore;
pub use storage::{SearchResult, VectorStore};
pub use vector::Vector;
