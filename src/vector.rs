//! Owned vector value type

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::kernel::Kernel;

/// A vector in n-dimensional space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vector {
    data: Vec<f32>,
}

impl Vector {
    /// Create a new vector from a Vec<f32>
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    /// Get the dimension of the vector
    pub fn dimension(&self) -> usize {
        self.data.len()
    }

    /// Get the underlying data as a slice
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// L2 norm, computed with the given kernel.
    pub fn norm(&self, kernel: Kernel) -> f32 {
        kernel.norm(&self.data)
    }

    /// Scale to unit length.
    pub fn normalize(&mut self, kernel: Kernel) -> Result<()> {
        let norm = self.norm(kernel);
        if norm == 0.0 {
            return Err(StoreError::InvalidVector {
                reason: "cannot normalize zero vector".to_string(),
            });
        }
        for x in &mut self.data {
            *x /= norm;
        }
        Ok(())
    }
}

impl FromStr for Vector {
    type Err = StoreError;

    /// Parse comma-separated floats, e.g. `"1.0, 2.5, -3"`.
    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Err(StoreError::InvalidVector {
                reason: "empty vector".to_string(),
            });
        }
        let data: Result<Vec<f32>> = s
            .split(',')
            .map(|x| {
                x.trim()
                    .parse::<f32>()
                    .map_err(|_| StoreError::InvalidVector {
                        reason: format!("invalid float: {:?}", x.trim()),
                    })
            })
            .collect();
        Ok(Vector::new(data?))
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, x) in self.data.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", x)?;
        }
        Ok(())
    }
}

impl From<Vec<f32>> for Vector {
    fn from(data: Vec<f32>) -> Self {
        Self::new(data)
    }
}

impl AsRef<[f32]> for Vector {
    fn as_ref(&self) -> &[f32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vector_creation() {
        let v = Vector::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(v.dimension(), 3);
        assert_eq!(v.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_vector_norm() {
        let v = Vector::new(vec![3.0, 4.0]);
        assert_relative_eq!(v.norm(Kernel::detect()), 5.0, epsilon = 1e-6);
    }

    #[test]
    fn test_vector_normalize() {
        let kernel = Kernel::detect();
        let mut v = Vector::new(vec![3.0, 4.0]);
        v.normalize(kernel).unwrap();
        assert_relative_eq!(v.norm(kernel), 1.0, epsilon = 1e-6);
        assert_relative_eq!(v.as_slice()[0], 0.6, epsilon = 1e-6);
        assert_relative_eq!(v.as_slice()[1], 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector() {
        let mut v = Vector::new(vec![0.0, 0.0]);
        assert!(matches!(
            v.normalize(Kernel::scalar()),
            Err(StoreError::InvalidVector { .. })
        ));
    }

    #[test]
    fn test_from_str() {
        let v: Vector = "1.0, 2.0, 3.0".parse().unwrap();
        assert_eq!(v.dimension(), 3);
        assert_eq!(v.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        assert!("1.0, x".parse::<Vector>().is_err());
        assert!("".parse::<Vector>().is_err());
        assert!("1.0,,2.0".parse::<Vector>().is_err());
    }

    #[test]
    fn test_display_parses_back() {
        let v = Vector::new(vec![1.5, -2.0, 0.25]);
        assert_eq!(v.to_string(), "1.5,-2,0.25");
        assert_eq!(v.to_string().parse::<Vector>().unwrap(), v);
    }

    #[test]
    fn test_serde_transparent() {
        let v: Vector = serde_json::from_str("[1.0, 2.0]").unwrap();
        assert_eq!(v.as_slice(), &[1.0, 2.0]);
    }
}
