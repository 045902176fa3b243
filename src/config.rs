//! Store and index configuration

use serde::{Deserialize, Serialize};

use crate::distance::Metric;
use crate::error::{Result, StoreError};

/// Construction parameters for a [`crate::VectorStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Vector length; fixed for the store's lifetime.
    pub dimension: usize,
    pub metric: Metric,
    /// Row slots allocated up front.
    pub initial_capacity: usize,
    /// Zero a row's memory when its record is removed.
    pub scrub_on_remove: bool,
    /// Use the portable kernels even when AVX2 is available.
    pub force_scalar: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dimension: 0,
            metric: Metric::L2Squared,
            initial_capacity: 0,
            scrub_on_remove: false,
            force_scalar: false,
        }
    }
}

impl StoreConfig {
    pub fn new(dimension: usize, metric: Metric) -> Self {
        Self {
            dimension,
            metric,
            ..Self::default()
        }
    }

    pub fn with_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    pub fn with_scrub_on_remove(mut self, scrub: bool) -> Self {
        self.scrub_on_remove = scrub;
        self
    }

    pub fn with_force_scalar(mut self, force_scalar: bool) -> Self {
        self.force_scalar = force_scalar;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(StoreError::InvalidDimension);
        }
        Ok(())
    }
}

/// Configuration parameters for the HNSW index.
///
/// When deserialized, omitted fields take their defaults except `m_max0`,
/// which follows the configured `m` as `2 * m`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PartialHnswParams")]
pub struct HnswParams {
    /// Max number of connections per node (layers > 0).
    pub m: usize,
    /// Max connections at layer 0 (typically 2 * m).
    pub m_max0: usize,
    /// Number of candidates during construction.
    pub ef_construction: usize,
    /// Number of candidates during search.
    pub ef_search: usize,
    /// Maximum number of layers.
    pub max_layers: usize,
    /// Seed for level generation, so identical insert sequences build
    /// identical graphs.
    pub seed: u64,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self::new(16, 200, 50)
    }
}

/// Wire form of [`HnswParams`] with every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PartialHnswParams {
    m: Option<usize>,
    m_max0: Option<usize>,
    ef_construction: Option<usize>,
    ef_search: Option<usize>,
    max_layers: Option<usize>,
    seed: Option<u64>,
}

impl From<PartialHnswParams> for HnswParams {
    fn from(raw: PartialHnswParams) -> Self {
        let defaults = HnswParams::default();
        let m = raw.m.unwrap_or(defaults.m);
        Self {
            m,
            m_max0: raw.m_max0.unwrap_or(2 * m),
            ef_construction: raw.ef_construction.unwrap_or(defaults.ef_construction),
            ef_search: raw.ef_search.unwrap_or(defaults.ef_search),
            max_layers: raw.max_layers.unwrap_or(defaults.max_layers),
            seed: raw.seed.unwrap_or(defaults.seed),
        }
    }
}

impl HnswParams {
    pub fn new(m: usize, ef_construction: usize, ef_search: usize) -> Self {
        Self {
            m,
            m_max0: 2 * m,
            ef_construction,
            ef_search,
            max_layers: 16,
            seed: 0x5EED,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Level generation factor: 1 / ln(m).
    pub fn level_factor(&self) -> f64 {
        1.0 / (self.m as f64).ln()
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| {
            Err(StoreError::InvalidParameter {
                reason: reason.to_string(),
            })
        };
        if self.m < 2 {
            return invalid("m must be at least 2");
        }
        if self.m_max0 < self.m {
            return invalid("m_max0 must be at least m");
        }
        if self.ef_construction == 0 || self.ef_search == 0 {
            return invalid("ef_construction and ef_search must be positive");
        }
        if self.max_layers == 0 {
            return invalid("max_layers must be positive");
        }
        Ok(())
    }
}
