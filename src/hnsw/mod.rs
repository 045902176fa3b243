//! HNSW (Hierarchical Navigable Small World) index module.

pub mod graph;

pub use crate::config::HnswParams;
pub use graph::HnswGraph;

use crate::distance::PreparedQuery;
use crate::error::Result;
use crate::index::{Index, Rows};
use crate::topk::Candidate;

/// An HNSW-based approximate nearest neighbor index.
///
/// The graph is built under the store's metric. Queries that override the
/// metric still walk that graph, so their results are a best effort.
#[derive(Debug)]
pub struct HnswIndex {
    graph: HnswGraph,
}

impl HnswIndex {
    /// Create a new HNSW index with default parameters.
    pub fn new() -> Self {
        Self {
            graph: HnswGraph::new(HnswParams::default()),
        }
    }

    /// Create a new HNSW index with custom parameters.
    pub fn with_params(params: HnswParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            graph: HnswGraph::new(params),
        })
    }

    pub fn params(&self) -> &HnswParams {
        self.graph.params()
    }

    pub fn graph(&self) -> &HnswGraph {
        &self.graph
    }
}

impl Default for HnswIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl Index for HnswIndex {
    fn insert(&mut self, slot: usize, rows: &Rows<'_>) -> Result<()> {
        self.graph.insert(slot, rows)
    }

    fn remove(&mut self, slot: usize, rows: &Rows<'_>) {
        self.graph.remove(slot, rows)
    }

    fn reserve(&mut self, capacity: usize) {
        self.graph.reserve(capacity)
    }

    fn search(&self, rows: &Rows<'_>, query: &PreparedQuery<'_>, k: usize) -> Vec<Candidate> {
        self.graph
            .search_knn(rows, query, k, self.graph.params().ef_search)
    }

    fn is_exact(&self) -> bool {
        false
    }
}
