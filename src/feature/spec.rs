//! Declared feature specs and the decode-time specs derived from them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::tensor::{DType, Scalar};

/// Declared specs keyed by feature name.
pub type FeatureSpecs = HashMap<String, FeatureSpec>;

/// How a feature is declared.
///
/// ```
/// use rankdata::feature::spec::{FeatureSpec, FixedLenFeature};
/// use rankdata::tensor::DType;
///
/// let label = FeatureSpec::Fixed(FixedLenFeature::new(vec![1], DType::Float32).with_default(-1));
/// let json = serde_json::to_string(&label).unwrap();
/// assert_eq!(json, r#"{"kind":"fixed","shape":[1],"dtype":"float32","default_value":-1}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureSpec {
    /// Fixed element shape per record (context) or per position (list).
    Fixed(FixedLenFeature),
    /// Variable element count; decoded as a sparse tensor.
    Variable(VarLenFeature),
}

impl FeatureSpec {
    pub fn fixed(shape: Vec<usize>, dtype: DType) -> Self {
        FeatureSpec::Fixed(FixedLenFeature::new(shape, dtype))
    }

    pub fn variable(dtype: DType) -> Self {
        FeatureSpec::Variable(VarLenFeature { dtype })
    }

    pub fn dtype(&self) -> DType {
        match self {
            FeatureSpec::Fixed(spec) => spec.dtype,
            FeatureSpec::Variable(spec) => spec.dtype,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedLenFeature {
    #[serde(default)]
    pub shape: Vec<usize>,
    pub dtype: DType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<DefaultValue>,
}

impl FixedLenFeature {
    pub fn new(shape: Vec<usize>, dtype: DType) -> Self {
        Self {
            shape,
            dtype,
            default_value: None,
        }
    }

    pub fn with_default<V: Into<DefaultValue>>(mut self, default_value: V) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    /// Number of values one record (or one position) carries.
    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarLenFeature {
    pub dtype: DType,
}

/// A declared default: one scalar or a list of scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
}

impl From<Scalar> for DefaultValue {
    fn from(value: Scalar) -> Self {
        DefaultValue::Scalar(value)
    }
}

impl From<f32> for DefaultValue {
    fn from(value: f32) -> Self {
        DefaultValue::Scalar(Scalar::Float32(value))
    }
}

impl From<i64> for DefaultValue {
    fn from(value: i64) -> Self {
        DefaultValue::Scalar(Scalar::Int64(value))
    }
}

impl From<i32> for DefaultValue {
    fn from(value: i32) -> Self {
        DefaultValue::Scalar(Scalar::Int64(value as i64))
    }
}

impl From<&str> for DefaultValue {
    fn from(value: &str) -> Self {
        DefaultValue::Scalar(Scalar::Bytes(value.as_bytes().to_vec()))
    }
}

impl From<Vec<Scalar>> for DefaultValue {
    fn from(values: Vec<Scalar>) -> Self {
        DefaultValue::List(values)
    }
}

impl From<Vec<f32>> for DefaultValue {
    fn from(values: Vec<f32>) -> Self {
        DefaultValue::List(values.into_iter().map(Scalar::Float32).collect())
    }
}

/// The spec actually handed to a [`SequenceDecoder`](crate::sequence::SequenceDecoder)
/// for a per-position field.
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceFeatureSpec {
    /// `shape` values per position, a variable number of positions per record.
    /// With `allow_missing`, records without the feature list get zero positions.
    FixedSequence {
        shape: Vec<usize>,
        dtype: DType,
        allow_missing: bool,
    },
    Variable { dtype: DType },
}

impl SequenceFeatureSpec {
    pub fn dtype(&self) -> DType {
        match self {
            SequenceFeatureSpec::FixedSequence { dtype, .. } => *dtype,
            SequenceFeatureSpec::Variable { dtype } => *dtype,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_from_json() {
        let specs: FeatureSpecs = serde_json::from_str(
            r#"{
                "label": {"kind": "fixed", "shape": [1], "dtype": "float32", "default_value": -1},
                "unigrams": {"kind": "variable", "dtype": "string"},
                "weights": {"kind": "fixed", "shape": [2], "dtype": "float32", "default_value": [0.5]}
            }"#,
        )
        .unwrap();

        assert_eq!(
            specs["label"],
            FeatureSpec::Fixed(FixedLenFeature::new(vec![1], DType::Float32).with_default(-1i64))
        );
        assert_eq!(specs["unigrams"], FeatureSpec::variable(DType::String));
        match &specs["weights"] {
            FeatureSpec::Fixed(spec) => {
                assert_eq!(
                    spec.default_value,
                    Some(DefaultValue::List(vec![Scalar::Float32(0.5)]))
                );
                assert_eq!(spec.num_elements(), 2);
            }
            other => panic!("unexpected spec {other:?}"),
        }
    }

    #[test]
    fn test_scalar_shape_has_one_element() {
        assert_eq!(FixedLenFeature::new(vec![], DType::Int64).num_elements(), 1);
    }
}
