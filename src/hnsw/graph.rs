//! HNSW graph: core data structures and algorithms.
//!
//! Implements the Hierarchical Navigable Small World graph from:
//! "Efficient and robust approximate nearest neighbor search using
//!  Hierarchical Navigable Small World graphs" (Malkov & Yashunin, 2016/2018).
//!
//! Nodes are keyed by buffer row slot. The graph stores only adjacency; row
//! data, norms and insertion order come from the store through [`Rows`].

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::HnswParams;
use crate::distance::PreparedQuery;
use crate::error::{Result, StoreError};
use crate::index::Rows;
use crate::topk::{Candidate, Frontier, TopK};

/// A node in the HNSW graph.
#[derive(Debug, Clone)]
struct HnswNode {
    /// Neighbors per layer. neighbors[l] is the list of neighbor slots at layer l.
    neighbors: Vec<Vec<usize>>,
    /// The maximum layer this node was inserted into.
    level: usize,
}

/// The HNSW graph structure.
#[derive(Debug)]
pub struct HnswGraph {
    /// Nodes indexed by row slot. `None` for free or never-used slots.
    nodes: Vec<Option<HnswNode>>,
    /// Entry point slot (highest-level node).
    entry_point: Option<usize>,
    /// Current maximum level in the graph.
    max_level: usize,
    params: HnswParams,
    /// RNG for level generation.
    rng: StdRng,
    /// Count of linked nodes.
    count: usize,
}

impl HnswGraph {
    /// Create an empty graph. `params` are expected to be validated.
    pub fn new(params: HnswParams) -> Self {
        Self {
            nodes: Vec::new(),
            entry_point: None,
            max_level: 0,
            rng: StdRng::seed_from_u64(params.seed),
            params,
            count: 0,
        }
    }

    pub fn params(&self) -> &HnswParams {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn entry_point(&self) -> Option<usize> {
        self.entry_point
    }

    pub fn reserve(&mut self, capacity: usize) {
        self.nodes.reserve(capacity.saturating_sub(self.nodes.len()));
    }

    /// Neighbor slots of `slot` at `layer`.
    pub fn neighbors(&self, slot: usize, layer: usize) -> &[usize] {
        self.nodes
            .get(slot)
            .and_then(|n| n.as_ref())
            .and_then(|n| n.neighbors.get(layer))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Generate a random level for a new node.
    fn random_level(&mut self) -> usize {
        let r: f64 = self.rng.gen();
        let level = (-r.ln() * self.params.level_factor()).floor() as usize;
        level.min(self.params.max_layers - 1)
    }

    fn max_connections(&self, layer: usize) -> usize {
        if layer == 0 {
            self.params.m_max0
        } else {
            self.params.m
        }
    }

    fn node_level(&self, slot: usize) -> Option<usize> {
        self.nodes.get(slot).and_then(|n| n.as_ref()).map(|n| n.level)
    }

    /// SEARCH-LAYER: Algorithm 2 from the HNSW paper.
    ///
    /// Beam search of width `ef` over one layer, starting from `entry`.
    /// Returns the closest candidates found, best first.
    fn search_layer(
        &self,
        rows: &Rows<'_>,
        query: &PreparedQuery<'_>,
        entry: &[Candidate],
        ef: usize,
        layer: usize,
    ) -> Vec<Candidate> {
        let mut visited = HashSet::new();
        let mut candidates = Frontier::new(); // closest candidate on top
        let mut results = TopK::new(ef); // furthest result on top

        for &ep in entry {
            if visited.insert(ep.slot) {
                candidates.push(ep);
                results.offer(ep);
            }
        }

        while let Some(c) = candidates.pop() {
            // If the closest candidate is further than the furthest result, stop
            if let Some(furthest) = results.threshold() {
                if c > *furthest {
                    break;
                }
            }

            for &neighbor in self.neighbors(c.slot, layer) {
                if !visited.insert(neighbor) {
                    continue;
                }
                // Skip links to slots that were freed.
                if self.node_level(neighbor).is_none() {
                    continue;
                }
                let Some(candidate) = rows.candidate(query, neighbor) else {
                    continue;
                };
                if results.offer(candidate) {
                    candidates.push(candidate);
                }
            }
        }

        results.into_sorted_vec()
    }

    /// Greedy descent from the entry point down to `target_layer + 1`.
    fn descend(
        &self,
        rows: &Rows<'_>,
        query: &PreparedQuery<'_>,
        target_layer: usize,
    ) -> Option<Candidate> {
        let entry = self.entry_point?;
        let mut ep = rows.candidate(query, entry)?;
        for layer in (target_layer + 1..=self.max_level).rev() {
            if let Some(best) = self.search_layer(rows, query, &[ep], 1, layer).first() {
                ep = *best;
            }
        }
        Some(ep)
    }

    /// Keep the `m` closest neighbors of `slot` at `layer`.
    fn prune_neighbors(&mut self, rows: &Rows<'_>, slot: usize, layer: usize, m: usize) {
        let Some(query) = rows.query_for(slot) else {
            return;
        };
        let Some(node) = self.nodes.get_mut(slot).and_then(|n| n.as_mut()) else {
            return;
        };
        if layer >= node.neighbors.len() {
            return;
        }

        let mut scored: Vec<Candidate> = node.neighbors[layer]
            .iter()
            .filter_map(|&n| rows.candidate(&query, n))
            .collect();
        scored.sort();
        scored.truncate(m);
        node.neighbors[layer] = scored.into_iter().map(|c| c.slot).collect();
    }

    /// INSERT: Algorithm 1 from the HNSW paper.
    ///
    /// `slot` must already be occupied in `rows`.
    pub fn insert(&mut self, slot: usize, rows: &Rows<'_>) -> Result<()> {
        let query = rows.query_for(slot).ok_or_else(|| StoreError::InvalidParameter {
            reason: format!("slot {} is not occupied", slot),
        })?;
        let level = self.random_level();

        if slot >= self.nodes.len() {
            self.nodes.resize_with(slot + 1, || None);
        }

        let ep = self.descend(rows, &query, level);
        self.nodes[slot] = Some(HnswNode {
            neighbors: vec![Vec::new(); level + 1],
            level,
        });
        self.count += 1;

        let Some(mut ep) = ep else {
            self.entry_point = Some(slot);
            self.max_level = level;
            return Ok(());
        };

        let insert_from = level.min(self.max_level);
        for layer in (0..=insert_from).rev() {
            let m = self.max_connections(layer);
            let nearest =
                self.search_layer(rows, &query, &[ep], self.params.ef_construction, layer);

            // Select M closest neighbors (simple selection, Algorithm 3)
            let neighbors: Vec<usize> = nearest
                .iter()
                .filter(|c| c.slot != slot)
                .take(m)
                .map(|c| c.slot)
                .collect();

            for &neighbor in &neighbors {
                let needs_pruning = match self.nodes.get_mut(neighbor).and_then(|n| n.as_mut()) {
                    Some(node) if layer < node.neighbors.len() => {
                        node.neighbors[layer].push(slot);
                        node.neighbors[layer].len() > m
                    }
                    _ => false,
                };
                if needs_pruning {
                    self.prune_neighbors(rows, neighbor, layer, m);
                }
            }

            if let Some(node) = self.nodes[slot].as_mut() {
                node.neighbors[layer] = neighbors;
            }

            if let Some(best) = nearest.first() {
                ep = *best;
            }
        }

        if level > self.max_level {
            self.entry_point = Some(slot);
            self.max_level = level;
        }

        Ok(())
    }

    /// Unlink `slot` from the graph.
    ///
    /// Former neighbors at each layer are offered each other as replacement
    /// links so that removing a hub does not split the graph.
    pub fn remove(&mut self, slot: usize, rows: &Rows<'_>) {
        let Some(node) = self.nodes.get_mut(slot).and_then(Option::take) else {
            return;
        };
        self.count -= 1;

        for (layer, former) in node.neighbors.iter().enumerate() {
            let m = self.max_connections(layer);
            for &n in former {
                let needs_pruning = match self.nodes.get_mut(n).and_then(|x| x.as_mut()) {
                    Some(neighbor) if layer < neighbor.neighbors.len() => {
                        let links = &mut neighbor.neighbors[layer];
                        links.retain(|&x| x != slot);
                        for &other in former {
                            if other != n && !links.contains(&other) {
                                links.push(other);
                            }
                        }
                        links.len() > m
                    }
                    _ => false,
                };
                if needs_pruning {
                    self.prune_neighbors(rows, n, layer, m);
                }
            }
        }

        if self.entry_point == Some(slot) {
            self.entry_point = self
                .nodes
                .iter()
                .enumerate()
                .filter_map(|(i, n)| n.as_ref().map(|n| (i, n.level)))
                .max_by_key(|&(i, level)| (level, std::cmp::Reverse(i)))
                .map(|(i, _)| i);
            self.max_level = self
                .entry_point
                .and_then(|ep| self.node_level(ep))
                .unwrap_or(0);
            debug!(removed = slot, entry_point = ?self.entry_point, "re-elected hnsw entry point");
        }
    }

    /// SEARCH: Algorithm 5 from the HNSW paper.
    ///
    /// Search for the k nearest neighbors, using ef candidates.
    pub fn search_knn(
        &self,
        rows: &Rows<'_>,
        query: &PreparedQuery<'_>,
        k: usize,
        ef: usize,
    ) -> Vec<Candidate> {
        let Some(ep) = self.descend(rows, query, 0) else {
            return Vec::new();
        };

        let mut results = self.search_layer(rows, query, &[ep], ef.max(k), 0);
        results.truncate(k);
        results
    }
}
