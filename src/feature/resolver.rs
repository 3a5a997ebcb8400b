//! Derive decode specs for per-position fields and collect padding values.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::error::{RankDataError, Result};
use crate::feature::padding::{PaddingPolicy, PaddingRegistry};
use crate::feature::spec::{DefaultValue, FeatureSpec, FeatureSpecs, SequenceFeatureSpec};
use crate::tensor::{DType, Scalar};

/// Decode specs plus the padding registry for a set of per-position specs.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSpecs {
    pub decode_specs: HashMap<String, SequenceFeatureSpec>,
    pub registry: PaddingRegistry,
}

/// Reduce a declared default to the single scalar used for padding.
///
/// An absent default resolves to the policy's implicit default. A scalar or a
/// one-element list resolves to that value cast to `dtype`. Anything else is
/// a configuration error.
pub fn scalar_default(
    dtype: DType,
    default_value: Option<&DefaultValue>,
    policy: &dyn PaddingPolicy,
) -> Result<Scalar> {
    match default_value {
        None => Ok(policy.implicit_default(dtype)),
        Some(DefaultValue::Scalar(value)) => value.cast(dtype),
        Some(DefaultValue::List(values)) if values.len() == 1 => values[0].cast(dtype),
        Some(DefaultValue::List(values)) => Err(RankDataError::config(format!(
            "only a scalar or single-element default is allowed, got {} values",
            values.len()
        ))),
    }
}

/// Turns declared per-position specs into what the decoder accepts.
///
/// Decoders refuse non-trivial defaults for variable-position fields, so each
/// fixed spec is decoded as an allow-missing sequence without a default and
/// its real default is kept in the registry for later correction.
#[derive(Debug, Clone)]
pub struct SpecResolver {
    policy: Arc<dyn PaddingPolicy>,
}

impl SpecResolver {
    pub fn new(policy: Arc<dyn PaddingPolicy>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &Arc<dyn PaddingPolicy> {
        &self.policy
    }

    pub fn resolve(&self, example_specs: &FeatureSpecs) -> Result<ResolvedSpecs> {
        let mut decode_specs = HashMap::with_capacity(example_specs.len());
        let mut registry = PaddingRegistry::new();

        for (name, spec) in example_specs {
            let decode_spec = match spec {
                FeatureSpec::Fixed(fixed) => {
                    let scalar = scalar_default(fixed.dtype, fixed.default_value.as_ref(), self.policy.as_ref())
                        .map_err(|e| RankDataError::config(format!("feature '{name}': {e}")))?;
                    if !self.policy.is_implicit(&scalar) {
                        debug!("feature '{name}' pads with {scalar}");
                        registry.register(name.clone(), scalar);
                    }
                    SequenceFeatureSpec::FixedSequence {
                        shape: fixed.shape.clone(),
                        dtype: fixed.dtype,
                        allow_missing: true,
                    }
                }
                FeatureSpec::Variable(var) => SequenceFeatureSpec::Variable { dtype: var.dtype },
            };
            decode_specs.insert(name.clone(), decode_spec);
        }

        Ok(ResolvedSpecs {
            decode_specs,
            registry,
        })
    }
}

impl Default for SpecResolver {
    fn default() -> Self {
        Self::new(Arc::new(crate::feature::padding::ZeroPadding))
    }
}
