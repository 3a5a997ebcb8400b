//! Sparse feature tensors in coordinate (indices/values/bounds) form.

use ndarray::{Array2, ArrayD, Axis, IxDyn};

use crate::error::{RankDataError, Result};
use crate::tensor::dense::DenseTensor;
use crate::tensor::dtype::{DType, Scalar};

/// A sparse tensor: `indices` is `[nnz, rank]`, `values` is a rank-1 dense
/// tensor of length `nnz`, and `dense_shape` bounds every axis.
///
/// Coordinates that are not listed are implicitly zero (or empty).
#[derive(Debug, Clone, PartialEq)]
pub struct SparseTensor {
    indices: Array2<usize>,
    values: DenseTensor,
    dense_shape: Vec<usize>,
}

impl SparseTensor {
    pub fn new(indices: Array2<usize>, values: DenseTensor, dense_shape: Vec<usize>) -> Result<Self> {
        if values.ndim() != 1 {
            return Err(RankDataError::shape_contract(format!(
                "sparse values must be rank 1, got shape {:?}",
                values.shape()
            )));
        }
        if indices.nrows() != values.shape()[0] {
            return Err(RankDataError::shape_contract(format!(
                "{} indices for {} values",
                indices.nrows(),
                values.shape()[0]
            )));
        }
        if indices.ncols() != dense_shape.len() {
            return Err(RankDataError::shape_contract(format!(
                "index rank {} does not match dense shape {dense_shape:?}",
                indices.ncols()
            )));
        }
        for index in indices.outer_iter() {
            if index.iter().zip(&dense_shape).any(|(i, bound)| i >= bound) {
                return Err(RankDataError::shape_contract(format!(
                    "index {:?} out of bounds for dense shape {dense_shape:?}",
                    index.to_vec()
                )));
            }
        }
        Ok(Self {
            indices,
            values,
            dense_shape,
        })
    }

    pub fn indices(&self) -> &Array2<usize> {
        &self.indices
    }

    pub fn values(&self) -> &DenseTensor {
        &self.values
    }

    pub fn dense_shape(&self) -> &[usize] {
        &self.dense_shape
    }

    pub fn dtype(&self) -> DType {
        self.values.dtype()
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.indices.nrows()
    }

    /// Bound of the position axis, if the tensor has one.
    pub fn positions(&self) -> Option<usize> {
        self.dense_shape.get(1).copied()
    }

    /// Drop every entry whose position index is `>= target` and clamp the
    /// position bound to `target`.
    pub fn truncate_positions(&self, target: usize) -> Result<Self> {
        let current = self.require_position_axis()?;
        let keep: Vec<usize> = self
            .indices
            .outer_iter()
            .enumerate()
            .filter(|(_, index)| index[1] < target)
            .map(|(row, _)| row)
            .collect();

        let mut dense_shape = self.dense_shape.clone();
        dense_shape[1] = current.min(target);

        Ok(Self {
            indices: self.indices.select(Axis(0), &keep),
            values: self.values.select_rows(&keep),
            dense_shape,
        })
    }

    /// Raise the position bound to `target` without adding entries.
    pub fn pad_positions(&self, target: usize) -> Result<Self> {
        let current = self.require_position_axis()?;
        if target < current {
            return Err(RankDataError::invalid_argument(format!(
                "cannot pad {current} positions down to {target}"
            )));
        }
        let mut padded = self.clone();
        padded.dense_shape[1] = target;
        Ok(padded)
    }

    /// Materialise as a dense tensor, using `fill` for absent coordinates.
    pub fn to_dense(&self, fill: &Scalar) -> Result<DenseTensor> {
        let mut dense = DenseTensor::filled(self.dtype(), &self.dense_shape, fill)?;
        match (&mut dense, &self.values) {
            (DenseTensor::Float32(out), DenseTensor::Float32(values)) => {
                scatter(out, &self.indices, values)
            }
            (DenseTensor::Int64(out), DenseTensor::Int64(values)) => scatter(out, &self.indices, values),
            (DenseTensor::Bytes(out), DenseTensor::Bytes(values)) => scatter(out, &self.indices, values),
            _ => return Err(RankDataError::other("dense and sparse dtypes diverged")),
        }
        Ok(dense)
    }

    fn require_position_axis(&self) -> Result<usize> {
        self.positions().ok_or_else(|| {
            RankDataError::shape_contract(format!(
                "expected at least rank 2, got dense shape {:?}",
                self.dense_shape
            ))
        })
    }
}

fn scatter<T: Clone>(out: &mut ArrayD<T>, indices: &Array2<usize>, values: &ArrayD<T>) {
    for (index, value) in indices.outer_iter().zip(values.iter()) {
        let index = index.to_vec();
        out[IxDyn(&index)] = value.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Two records; record 0 has entries at positions 0 and 2, record 1 at 1.
    fn sample() -> SparseTensor {
        let indices = array![[0, 0, 0], [0, 2, 0], [0, 2, 1], [1, 1, 0]];
        let values = DenseTensor::Int64(ArrayD::from_shape_vec(IxDyn(&[4]), vec![10, 20, 21, 30]).unwrap());
        SparseTensor::new(indices, values, vec![2, 3, 2]).unwrap()
    }

    #[test]
    fn test_truncate_drops_entries_beyond_target() {
        let truncated = sample().truncate_positions(2).unwrap();
        assert_eq!(truncated.dense_shape(), &[2, 2, 2]);
        assert_eq!(truncated.nnz(), 2);
        assert_eq!(truncated.indices(), &array![[0usize, 0, 0], [1, 1, 0]]);
        let values: Vec<i64> = truncated.values().as_i64().unwrap().iter().copied().collect();
        assert_eq!(values, vec![10, 30]);
    }

    #[test]
    fn test_pad_raises_bound_only() {
        let padded = sample().pad_positions(5).unwrap();
        assert_eq!(padded.dense_shape(), &[2, 5, 2]);
        assert_eq!(padded.nnz(), 4);
        assert_eq!(padded.indices(), sample().indices());
    }

    #[test]
    fn test_new_rejects_out_of_bounds() {
        let indices = array![[0usize, 3]];
        let values = DenseTensor::Float32(ArrayD::from_elem(IxDyn(&[1]), 1.0));
        assert!(SparseTensor::new(indices, values, vec![1, 3]).is_err());
    }

    #[test]
    fn test_to_dense() {
        let dense = sample().to_dense(&Scalar::Int64(0)).unwrap();
        let values: Vec<i64> = dense.as_i64().unwrap().iter().copied().collect();
        assert_eq!(values, vec![10, 0, 0, 0, 20, 21, 0, 0, 30, 0, 0, 0]);
    }
}
