//! Dense n-dimensional feature tensors.

use ndarray::{ArrayD, Axis, IxDyn, Slice};

use crate::error::{RankDataError, Result};
use crate::tensor::dtype::{DType, Scalar};

/// A dense tensor of one of the supported element types.
///
/// Per-position fields are laid out `[batch, positions, *shape]`; axis 1 is
/// the position (list) axis that truncation and padding operate on.
#[derive(Debug, Clone, PartialEq)]
pub enum DenseTensor {
    Float32(ArrayD<f32>),
    Int64(ArrayD<i64>),
    Bytes(ArrayD<Vec<u8>>),
}

macro_rules! map_array {
    ($tensor:expr, $array:ident => $body:expr) => {
        match $tensor {
            DenseTensor::Float32($array) => DenseTensor::Float32($body),
            DenseTensor::Int64($array) => DenseTensor::Int64($body),
            DenseTensor::Bytes($array) => DenseTensor::Bytes($body),
        }
    };
}

impl DenseTensor {
    /// A tensor of `shape` with every element set to `fill`.
    pub fn filled(dtype: DType, shape: &[usize], fill: &Scalar) -> Result<Self> {
        let shape = IxDyn(shape);
        Ok(match fill.cast(dtype)? {
            Scalar::Float32(v) => DenseTensor::Float32(ArrayD::from_elem(shape, v)),
            Scalar::Int64(v) => DenseTensor::Int64(ArrayD::from_elem(shape, v)),
            Scalar::Bytes(v) => DenseTensor::Bytes(ArrayD::from_elem(shape, v)),
        })
    }

    pub fn dtype(&self) -> DType {
        match self {
            DenseTensor::Float32(_) => DType::Float32,
            DenseTensor::Int64(_) => DType::Int64,
            DenseTensor::Bytes(_) => DType::String,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            DenseTensor::Float32(a) => a.shape(),
            DenseTensor::Int64(a) => a.shape(),
            DenseTensor::Bytes(a) => a.shape(),
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Size of the position axis, if the tensor has one.
    pub fn positions(&self) -> Option<usize> {
        self.shape().get(1).copied()
    }

    pub fn as_f32(&self) -> Option<&ArrayD<f32>> {
        match self {
            DenseTensor::Float32(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<&ArrayD<i64>> {
        match self {
            DenseTensor::Int64(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&ArrayD<Vec<u8>>> {
        match self {
            DenseTensor::Bytes(a) => Some(a),
            _ => None,
        }
    }

    /// Keep positions `[0, target)` along axis 1.
    pub fn truncate_positions(&self, target: usize) -> Result<Self> {
        let current = self.require_position_axis()?;
        let end = target.min(current);
        Ok(map_array!(self, a => a.slice_axis(Axis(1), Slice::from(0..end)).to_owned()))
    }

    /// Grow axis 1 to `target`, filling the new positions with `fill`.
    pub fn pad_positions(&self, target: usize, fill: &Scalar) -> Result<Self> {
        let current = self.require_position_axis()?;
        if target < current {
            return Err(RankDataError::invalid_argument(format!(
                "cannot pad {current} positions down to {target}"
            )));
        }
        Ok(match (self, fill.cast(self.dtype())?) {
            (DenseTensor::Float32(a), Scalar::Float32(v)) => DenseTensor::Float32(pad_axis1(a, target, v)),
            (DenseTensor::Int64(a), Scalar::Int64(v)) => DenseTensor::Int64(pad_axis1(a, target, v)),
            (DenseTensor::Bytes(a), Scalar::Bytes(v)) => DenseTensor::Bytes(pad_axis1(a, target, v)),
            _ => return Err(mismatched_fill(self.dtype(), fill)),
        })
    }

    /// Overwrite, row by row, every position at or beyond `lengths[row]`.
    pub fn fill_positions_from(&mut self, lengths: &[usize], fill: &Scalar) -> Result<()> {
        self.require_position_axis()?;
        let batch = self.shape()[0];
        if lengths.len() != batch {
            return Err(RankDataError::shape_contract(format!(
                "{} lengths for a batch of {batch}",
                lengths.len()
            )));
        }
        let dtype = self.dtype();
        match (self, fill.cast(dtype)?) {
            (DenseTensor::Float32(a), Scalar::Float32(v)) => fill_beyond(a, lengths, v),
            (DenseTensor::Int64(a), Scalar::Int64(v)) => fill_beyond(a, lengths, v),
            (DenseTensor::Bytes(a), Scalar::Bytes(v)) => fill_beyond(a, lengths, v),
            _ => return Err(mismatched_fill(dtype, fill)),
        }
        Ok(())
    }

    /// Rows `rows` of axis 0, in the given order.
    pub(crate) fn select_rows(&self, rows: &[usize]) -> Self {
        map_array!(self, a => a.select(Axis(0), rows))
    }

    fn require_position_axis(&self) -> Result<usize> {
        self.positions().ok_or_else(|| {
            RankDataError::shape_contract(format!(
                "expected at least rank 2, got shape {:?}",
                self.shape()
            ))
        })
    }
}

fn pad_axis1<T: Clone>(array: &ArrayD<T>, target: usize, fill: T) -> ArrayD<T> {
    let mut shape = array.shape().to_vec();
    let current = shape[1];
    shape[1] = target;
    let mut padded = ArrayD::from_elem(IxDyn(&shape), fill);
    padded
        .slice_axis_mut(Axis(1), Slice::from(0..current))
        .assign(array);
    padded
}

fn fill_beyond<T: Clone>(array: &mut ArrayD<T>, lengths: &[usize], fill: T) {
    let positions = array.shape()[1];
    for (mut row, &length) in array.axis_iter_mut(Axis(0)).zip(lengths) {
        row.slice_axis_mut(Axis(0), Slice::from(length.min(positions)..))
            .fill(fill.clone());
    }
}

fn mismatched_fill(dtype: DType, fill: &Scalar) -> RankDataError {
    RankDataError::config(format!("fill value {fill} does not match dtype {dtype}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    fn ragged() -> DenseTensor {
        // [2, 3, 1]: row 0 has 3 positions, row 1 has 1.
        DenseTensor::Float32(
            ArrayD::from_shape_vec(IxDyn(&[2, 3, 1]), vec![1.0, 2.0, 3.0, 4.0, 0.0, 0.0]).unwrap(),
        )
    }

    #[test]
    fn test_truncate_keeps_leading_positions() {
        let truncated = ragged().truncate_positions(2).unwrap();
        assert_eq!(truncated.shape(), &[2, 2, 1]);
        let values: Vec<f32> = truncated.as_f32().unwrap().iter().copied().collect();
        assert_eq!(values, vec![1.0, 2.0, 4.0, 0.0]);
    }

    #[test]
    fn test_pad_appends_fill() {
        let padded = ragged().pad_positions(4, &Scalar::Int64(-1)).unwrap();
        assert_eq!(padded.shape(), &[2, 4, 1]);
        let values: Vec<f32> = padded.as_f32().unwrap().iter().copied().collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, -1.0, 4.0, 0.0, 0.0, -1.0]);
    }

    #[test]
    fn test_pad_to_same_length_is_identity() {
        let tensor = ragged();
        assert_eq!(tensor.pad_positions(3, &Scalar::Float32(9.0)).unwrap(), tensor);
    }

    #[test]
    fn test_fill_positions_from_lengths() {
        let mut tensor = ragged();
        tensor
            .fill_positions_from(&[3, 1], &Scalar::Float32(-1.0))
            .unwrap();
        let values: Vec<f32> = tensor.as_f32().unwrap().iter().copied().collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, -1.0, -1.0]);
    }

    #[test]
    fn test_fill_rejects_wrong_length_count() {
        let mut tensor = ragged();
        assert!(matches!(
            tensor.fill_positions_from(&[1], &Scalar::Float32(-1.0)),
            Err(RankDataError::ShapeContract(_))
        ));
    }

    #[test]
    fn test_string_padding() {
        let tensor = DenseTensor::Bytes(
            ArrayD::from_shape_vec(IxDyn(&[1, 1]), vec![b"a".to_vec()]).unwrap(),
        );
        let padded = tensor
            .pad_positions(2, &Scalar::Bytes(b"<pad>".to_vec()))
            .unwrap();
        let values: Vec<Vec<u8>> = padded.as_bytes().unwrap().iter().cloned().collect();
        assert_eq!(values, vec![b"a".to_vec(), b"<pad>".to_vec()]);
    }

    #[test]
    fn test_rank_one_has_no_position_axis() {
        let tensor = DenseTensor::Int64(ArrayD::from_elem(IxDyn(&[3]), 0));
        assert!(tensor.truncate_positions(1).is_err());
    }
}
