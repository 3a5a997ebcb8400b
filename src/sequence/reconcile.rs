//! Restore declared padding values in freshly decoded per-position fields.

use log::trace;

use crate::error::{RankDataError, Result};
use crate::feature::padding::PaddingRegistry;
use crate::sequence::decoder::ParsedBatch;
use crate::tensor::FeatureTensor;

/// Overwrites the decoder's implicit fill with each registered field's
/// declared default.
///
/// For every row of a registered field, positions at or beyond the row's true
/// length take the registered value; earlier positions keep the decoded data.
/// This keeps sentinel padding (e.g. `-1` labels) distinguishable from real
/// zero-valued positions.
#[derive(Debug, Clone, Copy)]
pub struct PaddingReconciler<'a> {
    registry: &'a PaddingRegistry,
}

impl<'a> PaddingReconciler<'a> {
    pub fn new(registry: &'a PaddingRegistry) -> Self {
        Self { registry }
    }

    /// Correct every registered field of `batch`.
    ///
    /// All registered fields are checked before any is modified, so an error
    /// never leaves a half-corrected batch behind.
    pub fn reconcile(&self, mut batch: ParsedBatch) -> Result<ParsedBatch> {
        for (name, _) in self.registry.iter() {
            let tensor = batch
                .sequence
                .get(name)
                .ok_or_else(|| RankDataError::shape_contract(format!("registered feature '{name}' was not decoded")))?;
            match tensor {
                FeatureTensor::Dense(dense) if dense.ndim() == 3 => {}
                FeatureTensor::Dense(dense) => {
                    return Err(RankDataError::shape_contract(format!(
                        "feature '{name}' must be rank 3 [batch, positions, width], got shape {:?}",
                        dense.shape()
                    )));
                }
                FeatureTensor::Sparse(_) => {
                    return Err(RankDataError::shape_contract(format!(
                        "feature '{name}' has a padding value but decoded sparse"
                    )));
                }
            }
            if !batch.lengths.contains_key(name) {
                return Err(RankDataError::shape_contract(format!(
                    "no true lengths decoded for feature '{name}'"
                )));
            }
        }

        for (name, value) in self.registry.iter() {
            let lengths = &batch.lengths[name];
            if let Some(FeatureTensor::Dense(dense)) = batch.sequence.get_mut(name) {
                trace!("resetting padding of '{name}' to {value}");
                dense.fill_positions_from(lengths, value)?;
            }
        }
        Ok(batch)
    }
}
