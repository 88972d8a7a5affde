//! Dense f64 arrays for custom weight patterns and custom inputs

use crate::error::{DynfieldError, Result};
use serde::{Deserialize, Serialize};

/// Row-major dense array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    /// Shape (empty for a scalar)
    pub shape: Vec<usize>,
    /// Data, `shape.iter().product()` entries
    pub data: Vec<f64>,
}

impl Tensor {
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(DynfieldError::InvalidArgument(format!(
                "tensor of shape {:?} needs {} values, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn zeros(shape: Vec<usize>) -> Self {
        let size: usize = shape.iter().product();
        Self {
            data: vec![0.0; size],
            shape,
        }
    }

    /// One-dimensional tensor
    pub fn from_vec(data: Vec<f64>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    /// Two-dimensional tensor from rows. Ragged rows are rejected.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != cols) {
            return Err(DynfieldError::InvalidArgument(
                "ragged rows in tensor literal".to_string(),
            ));
        }
        let shape = vec![rows.len(), cols];
        let data = rows.into_iter().flatten().collect();
        Ok(Self { shape, data })
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }
}

impl From<Vec<f64>> for Tensor {
    fn from(data: Vec<f64>) -> Self {
        Self::from_vec(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_must_match_data() {
        assert!(Tensor::new(vec![2, 3], vec![0.0; 6]).is_ok());
        assert!(Tensor::new(vec![2, 3], vec![0.0; 5]).is_err());
    }

    #[test]
    fn test_from_rows() {
        let t = Tensor::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        assert_eq!(t.shape, vec![3, 2]);
        assert_eq!(t.rank(), 2);
        assert_eq!(t.data[4], 5.0);

        assert!(Tensor::from_rows(vec![vec![1.0], vec![2.0, 3.0]]).is_err());
    }
}
