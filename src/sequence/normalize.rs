//! Truncate or pad every per-position field of a batch to one list size.

use std::collections::HashMap;

use crate::error::{RankDataError, Result};
use crate::feature::padding::{PaddingPolicy, PaddingRegistry};
use crate::sequence::decoder::ParsedBatch;
use crate::tensor::FeatureTensor;

/// How the list size of a batch is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetLength {
    /// The largest position count among the batch's per-position fields.
    Dynamic,
    /// A caller-specified size, known before any batch is seen.
    Static(usize),
}

impl TargetLength {
    /// `None` and `Some(0)` both mean dynamic.
    pub fn from_list_size(list_size: Option<usize>) -> Self {
        match list_size {
            Some(size) if size > 0 => TargetLength::Static(size),
            _ => TargetLength::Dynamic,
        }
    }

    pub fn static_size(&self) -> Option<usize> {
        match self {
            TargetLength::Dynamic => None,
            TargetLength::Static(size) => Some(*size),
        }
    }
}

/// What to do with one field's position axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAction {
    Truncate { target: usize },
    /// Equal lengths land here with `added == 0`.
    Pad { target: usize, added: usize },
}

impl ResizeAction {
    pub fn plan(current: usize, target: usize) -> Self {
        if current > target {
            ResizeAction::Truncate { target }
        } else {
            ResizeAction::Pad {
                target,
                added: target - current,
            }
        }
    }
}

/// A batch whose per-position fields all share one list size.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBatch {
    pub batch_size: usize,
    /// The realised list size of this batch.
    pub list_size: usize,
    /// Set only when the list size was fixed ahead of time.
    pub static_list_size: Option<usize>,
    /// Context fields verbatim plus every resized per-position field.
    pub features: HashMap<String, FeatureTensor>,
}

impl NormalizedBatch {
    pub fn get(&self, name: &str) -> Option<&FeatureTensor> {
        self.features.get(name)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Resizes per-position fields along axis 1.
///
/// Dense fields grow with the field's registered padding value, or the
/// policy's implicit default when unregistered. Sparse fields only have
/// their position bound moved; no entries are added.
#[derive(Debug, Clone, Copy)]
pub struct ListNormalizer<'a> {
    target: TargetLength,
    registry: &'a PaddingRegistry,
    policy: &'a dyn PaddingPolicy,
}

impl<'a> ListNormalizer<'a> {
    pub fn new(target: TargetLength, registry: &'a PaddingRegistry, policy: &'a dyn PaddingPolicy) -> Self {
        Self {
            target,
            registry,
            policy,
        }
    }

    pub fn target(&self) -> TargetLength {
        self.target
    }

    /// The list size `batch` would be normalized to.
    pub fn target_for(&self, batch: &ParsedBatch) -> Result<usize> {
        match self.target {
            TargetLength::Static(size) => Ok(size),
            TargetLength::Dynamic => {
                let mut max = 0;
                for (name, tensor) in &batch.sequence {
                    max = max.max(position_count(name, tensor)?);
                }
                Ok(max)
            }
        }
    }

    pub fn normalize(&self, batch: ParsedBatch) -> Result<NormalizedBatch> {
        let list_size = self.target_for(&batch)?;
        let ParsedBatch {
            batch_size,
            context,
            sequence,
            ..
        } = batch;

        let mut features = context;
        features.reserve(sequence.len());
        for (name, tensor) in sequence {
            let resized = self.resize(&name, tensor, list_size)?;
            if features.insert(name.clone(), resized).is_some() {
                return Err(RankDataError::config(format!(
                    "feature '{name}' is both a context and a per-position field"
                )));
            }
        }

        Ok(NormalizedBatch {
            batch_size,
            list_size,
            static_list_size: self.target.static_size(),
            features,
        })
    }

    fn resize(&self, name: &str, tensor: FeatureTensor, target: usize) -> Result<FeatureTensor> {
        let current = position_count(name, &tensor)?;
        match (ResizeAction::plan(current, target), tensor) {
            (ResizeAction::Pad { added: 0, .. }, tensor) => Ok(tensor),
            (ResizeAction::Truncate { target }, FeatureTensor::Dense(dense)) => {
                Ok(dense.truncate_positions(target)?.into())
            }
            (ResizeAction::Truncate { target }, FeatureTensor::Sparse(sparse)) => {
                Ok(sparse.truncate_positions(target)?.into())
            }
            (ResizeAction::Pad { target, .. }, FeatureTensor::Dense(dense)) => {
                let fill = self.registry.fill_value(name, dense.dtype(), self.policy)?;
                Ok(dense.pad_positions(target, &fill)?.into())
            }
            (ResizeAction::Pad { target, .. }, FeatureTensor::Sparse(sparse)) => {
                Ok(sparse.pad_positions(target)?.into())
            }
        }
    }
}

fn position_count(name: &str, tensor: &FeatureTensor) -> Result<usize> {
    tensor.positions().ok_or_else(|| {
        RankDataError::shape_contract(format!(
            "per-position feature '{name}' has no position axis, shape {:?}",
            tensor.shape()
        ))
    })
}
