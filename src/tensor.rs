//! Tensor model shared by the decoder, reconciler and normalizer.
//!
//! Every feature in a batch is either a [`DenseTensor`] (an `ndarray`
//! n-d array) or a [`SparseTensor`] (indices/values/bounds triple). Per-position
//! features use axis 1 as the list axis.

pub mod dense;
pub mod dtype;
pub mod sparse;

pub use dense::DenseTensor;
pub use dtype::{DType, Scalar};
pub use sparse::SparseTensor;

/// A decoded feature: dense or sparse.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureTensor {
    Dense(DenseTensor),
    Sparse(SparseTensor),
}

impl FeatureTensor {
    pub fn dtype(&self) -> DType {
        match self {
            FeatureTensor::Dense(t) => t.dtype(),
            FeatureTensor::Sparse(t) => t.dtype(),
        }
    }

    /// Full shape (dense) or bounds (sparse).
    pub fn shape(&self) -> &[usize] {
        match self {
            FeatureTensor::Dense(t) => t.shape(),
            FeatureTensor::Sparse(t) => t.dense_shape(),
        }
    }

    /// Size of the position axis, if the tensor has one.
    pub fn positions(&self) -> Option<usize> {
        match self {
            FeatureTensor::Dense(t) => t.positions(),
            FeatureTensor::Sparse(t) => t.positions(),
        }
    }

    pub fn as_dense(&self) -> Option<&DenseTensor> {
        match self {
            FeatureTensor::Dense(t) => Some(t),
            FeatureTensor::Sparse(_) => None,
        }
    }

    pub fn as_sparse(&self) -> Option<&SparseTensor> {
        match self {
            FeatureTensor::Dense(_) => None,
            FeatureTensor::Sparse(t) => Some(t),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, FeatureTensor::Sparse(_))
    }
}

impl From<DenseTensor> for FeatureTensor {
    fn from(tensor: DenseTensor) -> Self {
        FeatureTensor::Dense(tensor)
    }
}

impl From<SparseTensor> for FeatureTensor {
    fn from(tensor: SparseTensor) -> Self {
        FeatureTensor::Sparse(tensor)
    }
}
