//! Distance metrics for vector similarity

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::kernel::Kernel;

/// Similarity metric, fixed when a store is built.
///
/// Internally every score is turned into a ranking key where smaller is
/// better, so one selection routine serves both metrics.
///
/// Serde goes through [`Metric::from_str`], so configuration files accept the
/// same names as the command line and reject unknown ones with
/// [`StoreError::UnsupportedMetric`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Metric {
    /// Squared Euclidean distance, smaller is closer.
    L2Squared,
    /// Cosine similarity, larger is closer.
    Cosine,
}

impl Metric {
    /// Canonical name, as accepted by [`Metric::from_str`].
    pub fn name(&self) -> &'static str {
        match self {
            Metric::L2Squared => "l2_squared",
            Metric::Cosine => "cosine",
        }
    }

    /// Convert a caller-facing score into a ranking key (smaller is better).
    ///
    /// `+ 0.0` folds `-0.0` into `+0.0` so that equal scores compare equal
    /// under `total_cmp`.
    #[inline]
    pub fn rank_key(&self, score: f32) -> f32 {
        match self {
            Metric::L2Squared => score + 0.0,
            Metric::Cosine => -score + 0.0,
        }
    }

    /// Inverse of [`Metric::rank_key`].
    #[inline]
    pub fn score(&self, key: f32) -> f32 {
        match self {
            Metric::L2Squared => key,
            Metric::Cosine => -key,
        }
    }

    /// The score a vector gets against itself.
    pub fn identity_score(&self) -> f32 {
        match self {
            Metric::L2Squared => 0.0,
            Metric::Cosine => 1.0,
        }
    }
}

impl Default for Metric {
    fn default() -> Self {
        Metric::L2Squared
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l2_squared" | "l2" | "euclidean_squared" => Ok(Metric::L2Squared),
            "cosine" => Ok(Metric::Cosine),
            _ => Err(StoreError::UnsupportedMetric {
                name: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Metric {
    type Error = StoreError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

impl From<Metric> for String {
    fn from(metric: Metric) -> Self {
        metric.name().to_string()
    }
}

/// Cosine similarity from a dot product and the two norms. Zero-norm
/// vectors have similarity 0 with everything.
#[inline]
pub fn cosine_from_dot(dot: f32, norm_a: f32, norm_b: f32) -> f32 {
    let denom = norm_a * norm_b;
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

/// A validated query vector with everything precomputed once per query.
#[derive(Debug, Clone, Copy)]
pub struct PreparedQuery<'a> {
    pub vector: &'a [f32],
    pub metric: Metric,
    /// L2 norm of `vector`, used by cosine.
    pub norm: f32,
}

impl<'a> PreparedQuery<'a> {
    pub fn new(vector: &'a [f32], metric: Metric, kernel: Kernel) -> Self {
        let norm = match metric {
            Metric::Cosine => kernel.norm(vector),
            Metric::L2Squared => 0.0,
        };
        Self {
            vector,
            metric,
            norm,
        }
    }

    /// Ranking key of this query against one stored row.
    #[inline]
    pub fn rank_key(&self, kernel: Kernel, row: &[f32], row_norm: f32) -> f32 {
        let score = match self.metric {
            Metric::L2Squared => kernel.l2_squared(self.vector, row),
            Metric::Cosine => cosine_from_dot(kernel.dot(self.vector, row), self.norm, row_norm),
        };
        self.metric.rank_key(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_metric() {
        assert_eq!("l2_squared".parse::<Metric>().unwrap(), Metric::L2Squared);
        assert_eq!("L2".parse::<Metric>().unwrap(), Metric::L2Squared);
        assert_eq!(" cosine ".parse::<Metric>().unwrap(), Metric::Cosine);
    }

    #[test]
    fn test_parse_unsupported_metric() {
        assert_eq!(
            "manhattan".parse::<Metric>().unwrap_err(),
            StoreError::UnsupportedMetric {
                name: "manhattan".to_string()
            }
        );
    }

    #[test]
    fn test_display_roundtrips_through_parse() {
        for metric in [Metric::L2Squared, Metric::Cosine] {
            assert_eq!(metric.to_string().parse::<Metric>().unwrap(), metric);
        }
    }

    #[test]
    fn test_rank_key_orders_best_first() {
        assert!(Metric::L2Squared.rank_key(1.0) < Metric::L2Squared.rank_key(2.0));
        assert!(Metric::Cosine.rank_key(0.9) < Metric::Cosine.rank_key(0.1));
        assert_eq!(Metric::Cosine.score(Metric::Cosine.rank_key(0.25)), 0.25);
    }

    #[test]
    fn test_rank_key_folds_negative_zero() {
        let key = Metric::Cosine.rank_key(0.0);
        assert_eq!(key.to_bits(), 0.0f32.to_bits());
    }

    #[test]
    fn test_cosine_identity() {
        let kernel = Kernel::detect();
        let v = [1.0, 2.0, 3.0];
        let q = PreparedQuery::new(&v, Metric::Cosine, kernel);
        let key = q.rank_key(kernel, &v, kernel.norm(&v));
        assert_relative_eq!(Metric::Cosine.score(key), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_and_opposite() {
        assert_relative_eq!(cosine_from_dot(0.0, 1.0, 1.0), 0.0);
        assert_relative_eq!(cosine_from_dot(-2.0, 1.0, 2.0), -1.0);
    }

    #[test]
    fn test_cosine_zero_norm() {
        assert_eq!(cosine_from_dot(0.0, 0.0, 3.0), 0.0);
    }

    #[test]
    fn test_serde_accepts_aliases() {
        assert_eq!(serde_json::from_str::<Metric>("\"l2\"").unwrap(), Metric::L2Squared);
        assert_eq!(
            serde_json::from_str::<Metric>("\"Euclidean_Squared\"").unwrap(),
            Metric::L2Squared
        );
    }

    #[test]
    fn test_serde_unknown_metric_is_unsupported() {
        let err = serde_json::from_str::<Metric>("\"hamming\"").unwrap_err();
        let expected = StoreError::UnsupportedMetric {
            name: "hamming".to_string(),
        };
        assert!(err.to_string().starts_with(&expected.to_string()), "{}", err);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Metric::L2Squared).unwrap(), "\"l2_squared\"");
        assert_eq!(
            serde_json::from_str::<Metric>("\"cosine\"").unwrap(),
            Metric::Cosine
        );
    }
}
