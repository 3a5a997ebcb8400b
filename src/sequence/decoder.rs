//! Decoding serialized records into a [`ParsedBatch`].
//!
//! [`SequenceDecoder`] is the seam between the normalization engine and the
//! wire format. [`ProtoSequenceDecoder`] implements it for TensorFlow
//! `SequenceExample` protos.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ndarray::{Array2, ArrayD, IxDyn};
use prost::Message;
use rayon::prelude::*;

use crate::error::{RankDataError, Result};
use crate::feature::padding::{PaddingPolicy, ZeroPadding};
use crate::feature::spec::{DefaultValue, FeatureSpec, FeatureSpecs, FixedLenFeature, SequenceFeatureSpec};
use crate::sequence::proto::{Feature, FeatureList, SequenceExample, feature::Kind};
use crate::tensor::{DType, DenseTensor, FeatureTensor, Scalar, SparseTensor};

/// Direct decoder output for one batch of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedBatch {
    pub batch_size: usize,
    /// Per-record fields, `[batch, *shape]` or sparse `[batch, values]`.
    pub context: HashMap<String, FeatureTensor>,
    /// Per-position fields, `[batch, positions, *shape]` or sparse
    /// `[batch, positions, values]`; `positions` is the batch maximum.
    pub sequence: HashMap<String, FeatureTensor>,
    /// True number of positions of every per-position field, per record.
    pub lengths: HashMap<String, Vec<usize>>,
}

/// Parses a batch of serialized records against context and per-position specs.
pub trait SequenceDecoder: Send + Sync + fmt::Debug {
    fn decode(
        &self,
        serialized: &[Vec<u8>],
        context_specs: &FeatureSpecs,
        sequence_specs: &HashMap<String, SequenceFeatureSpec>,
    ) -> Result<ParsedBatch>;
}

/// Resolve a context feature's declared default to exactly one value per
/// element of its shape. A scalar default broadcasts; a list must match the
/// element count.
pub fn context_default(spec: &FixedLenFeature) -> Result<Option<Vec<Scalar>>> {
    let count = spec.num_elements();
    match &spec.default_value {
        None => Ok(None),
        Some(DefaultValue::Scalar(value)) => Ok(Some(vec![value.cast(spec.dtype)?; count])),
        Some(DefaultValue::List(values)) if values.len() == count => values
            .iter()
            .map(|v| v.cast(spec.dtype))
            .collect::<Result<Vec<_>>>()
            .map(Some),
        Some(DefaultValue::List(values)) => Err(RankDataError::config(format!(
            "default has {} values but shape {:?} needs {count}",
            values.len(),
            spec.shape
        ))),
    }
}

/// Element types that can be read out of a proto [`Feature`].
trait ListElement: Clone + Send + Sync + Sized {
    const DTYPE: DType;

    /// The feature's values, or `None` if it holds another element type.
    fn values(feature: &Feature) -> Option<&[Self]>;

    fn from_scalar(scalar: &Scalar) -> Option<Self>;

    fn into_tensor(array: ArrayD<Self>) -> DenseTensor;
}

impl ListElement for f32 {
    const DTYPE: DType = DType::Float32;

    fn values(feature: &Feature) -> Option<&[Self]> {
        match &feature.kind {
            None => Some(&[][..]),
            Some(Kind::FloatList(list)) => Some(list.value.as_slice()),
            Some(_) => None,
        }
    }

    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        scalar.as_f32()
    }

    fn into_tensor(array: ArrayD<Self>) -> DenseTensor {
        DenseTensor::Float32(array)
    }
}

impl ListElement for i64 {
    const DTYPE: DType = DType::Int64;

    fn values(feature: &Feature) -> Option<&[Self]> {
        match &feature.kind {
            None => Some(&[][..]),
            Some(Kind::Int64List(list)) => Some(list.value.as_slice()),
            Some(_) => None,
        }
    }

    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        scalar.as_i64()
    }

    fn into_tensor(array: ArrayD<Self>) -> DenseTensor {
        DenseTensor::Int64(array)
    }
}

impl ListElement for Vec<u8> {
    const DTYPE: DType = DType::String;

    fn values(feature: &Feature) -> Option<&[Self]> {
        match &feature.kind {
            None => Some(&[][..]),
            Some(Kind::BytesList(list)) => Some(list.value.as_slice()),
            Some(_) => None,
        }
    }

    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        scalar.as_bytes().map(<[u8]>::to_vec)
    }

    fn into_tensor(array: ArrayD<Self>) -> DenseTensor {
        DenseTensor::Bytes(array)
    }
}

macro_rules! with_element {
    ($dtype:expr, $t:ident => $body:expr) => {
        match $dtype {
            DType::Float32 => {
                type $t = f32;
                $body
            }
            DType::Int64 => {
                type $t = i64;
                $body
            }
            DType::String => {
                type $t = Vec<u8>;
                $body
            }
        }
    };
}

fn typed_values<'a, T: ListElement>(name: &str, feature: &'a Feature) -> Result<&'a [T]> {
    T::values(feature).ok_or_else(|| {
        RankDataError::decode(format!("feature '{name}' does not hold {} values", T::DTYPE))
    })
}

fn typed_scalar<T: ListElement>(scalar: &Scalar) -> Result<T> {
    T::from_scalar(&scalar.cast(T::DTYPE)?)
        .ok_or_else(|| RankDataError::other(format!("{scalar} is not a {} value", T::DTYPE)))
}

/// Decoder for serialized TensorFlow `SequenceExample` protos.
///
/// Records are decoded in parallel; missing positions of fixed per-position
/// fields are filled with the padding policy's implicit default.
#[derive(Debug, Clone)]
pub struct ProtoSequenceDecoder {
    policy: Arc<dyn PaddingPolicy>,
}

impl Default for ProtoSequenceDecoder {
    fn default() -> Self {
        Self::new(Arc::new(ZeroPadding))
    }
}

impl ProtoSequenceDecoder {
    pub fn new(policy: Arc<dyn PaddingPolicy>) -> Self {
        Self { policy }
    }

    fn decode_context(
        &self,
        name: &str,
        spec: &FeatureSpec,
        examples: &[SequenceExample],
    ) -> Result<FeatureTensor> {
        let features: Vec<Option<&Feature>> = examples.iter().map(|ex| ex.context_feature(name)).collect();
        match spec {
            FeatureSpec::Fixed(fixed) => {
                let default = context_default(fixed)?;
                with_element!(fixed.dtype, T => {
                    let default = default
                        .map(|values| values.iter().map(typed_scalar::<T>).collect::<Result<Vec<T>>>())
                        .transpose()?;
                    dense_context::<T>(name, fixed, &features, default.as_deref())
                })
                .map(FeatureTensor::Dense)
            }
            FeatureSpec::Variable(var) => {
                with_element!(var.dtype, T => sparse_context::<T>(name, &features)).map(FeatureTensor::Sparse)
            }
        }
    }

    fn decode_sequence(
        &self,
        name: &str,
        spec: &SequenceFeatureSpec,
        lists: &[Option<&FeatureList>],
        lengths: &[usize],
    ) -> Result<FeatureTensor> {
        match spec {
            SequenceFeatureSpec::FixedSequence {
                shape,
                dtype,
                allow_missing,
            } => {
                if !allow_missing && lists.iter().any(Option::is_none) {
                    return Err(RankDataError::decode(format!(
                        "feature list '{name}' is required but missing"
                    )));
                }
                let fill = self.policy.implicit_default(*dtype);
                with_element!(*dtype, T => {
                    let fill = typed_scalar::<T>(&fill)?;
                    dense_sequence::<T>(name, shape, lists, lengths, fill)
                })
                .map(FeatureTensor::Dense)
            }
            SequenceFeatureSpec::Variable { dtype } => {
                with_element!(*dtype, T => sparse_sequence::<T>(name, lists, lengths)).map(FeatureTensor::Sparse)
            }
        }
    }
}

impl SequenceDecoder for ProtoSequenceDecoder {
    fn decode(
        &self,
        serialized: &[Vec<u8>],
        context_specs: &FeatureSpecs,
        sequence_specs: &HashMap<String, SequenceFeatureSpec>,
    ) -> Result<ParsedBatch> {
        let examples: Vec<SequenceExample> = serialized
            .par_iter()
            .enumerate()
            .map(|(i, bytes)| {
                SequenceExample::decode(bytes.as_slice()).map_err(|e| RankDataError::proto(i, e))
            })
            .collect::<Result<_>>()?;

        let mut context = HashMap::with_capacity(context_specs.len());
        for (name, spec) in context_specs {
            context.insert(name.clone(), self.decode_context(name, spec, &examples)?);
        }

        let mut sequence = HashMap::with_capacity(sequence_specs.len());
        let mut lengths = HashMap::with_capacity(sequence_specs.len());
        for (name, spec) in sequence_specs {
            let lists: Vec<Option<&FeatureList>> = examples.iter().map(|ex| ex.feature_list(name)).collect();
            let row_lengths: Vec<usize> = lists
                .iter()
                .map(|list| list.map_or(0, |list| list.feature.len()))
                .collect();
            sequence.insert(
                name.clone(),
                self.decode_sequence(name, spec, &lists, &row_lengths)?,
            );
            lengths.insert(name.clone(), row_lengths);
        }

        Ok(ParsedBatch {
            batch_size: examples.len(),
            context,
            sequence,
            lengths,
        })
    }
}

fn dense_context<T: ListElement>(
    name: &str,
    spec: &FixedLenFeature,
    features: &[Option<&Feature>],
    default: Option<&[T]>,
) -> Result<DenseTensor> {
    let count = spec.num_elements();
    let mut data: Vec<T> = Vec::with_capacity(features.len() * count);
    for (row, feature) in features.iter().enumerate() {
        let values = match (feature, default) {
            (Some(feature), _) => typed_values::<T>(name, feature)?,
            (None, Some(default)) => default,
            (None, None) => {
                return Err(RankDataError::decode(format!(
                    "record {row}: required context feature '{name}' is missing"
                )));
            }
        };
        if values.len() != count {
            return Err(RankDataError::decode(format!(
                "record {row}: context feature '{name}' has {} values, expected {count}",
                values.len()
            )));
        }
        data.extend_from_slice(values);
    }

    let mut dims = vec![features.len()];
    dims.extend_from_slice(&spec.shape);
    Ok(T::into_tensor(ArrayD::from_shape_vec(IxDyn(&dims), data)?))
}

fn sparse_context<T: ListElement>(name: &str, features: &[Option<&Feature>]) -> Result<SparseTensor> {
    let mut coords = Vec::new();
    let mut values: Vec<T> = Vec::new();
    let mut max_values = 0;
    for (row, feature) in features.iter().enumerate() {
        let Some(feature) = feature else { continue };
        let row_values = typed_values::<T>(name, feature)?;
        max_values = max_values.max(row_values.len());
        for (i, value) in row_values.iter().enumerate() {
            coords.extend_from_slice(&[row, i]);
            values.push(value.clone());
        }
    }
    build_sparse(coords, values, vec![features.len(), max_values])
}

fn dense_sequence<T: ListElement>(
    name: &str,
    shape: &[usize],
    lists: &[Option<&FeatureList>],
    lengths: &[usize],
    fill: T,
) -> Result<DenseTensor> {
    let per_position: usize = shape.iter().product();
    let max_positions = lengths.iter().copied().max().unwrap_or(0);
    let mut data = vec![fill; lists.len() * max_positions * per_position];

    for (row, list) in lists.iter().enumerate() {
        let Some(list) = list else { continue };
        for (position, feature) in list.feature.iter().enumerate() {
            let values = typed_values::<T>(name, feature)?;
            if values.len() != per_position {
                return Err(RankDataError::decode(format!(
                    "record {row}, position {position}: feature '{name}' has {} values, expected {per_position}",
                    values.len()
                )));
            }
            let start = (row * max_positions + position) * per_position;
            data[start..start + per_position].clone_from_slice(values);
        }
    }

    let mut dims = vec![lists.len(), max_positions];
    dims.extend_from_slice(shape);
    Ok(T::into_tensor(ArrayD::from_shape_vec(IxDyn(&dims), data)?))
}

fn sparse_sequence<T: ListElement>(
    name: &str,
    lists: &[Option<&FeatureList>],
    lengths: &[usize],
) -> Result<SparseTensor> {
    let max_positions = lengths.iter().copied().max().unwrap_or(0);
    let mut coords = Vec::new();
    let mut values: Vec<T> = Vec::new();
    let mut max_values = 0;
    for (row, list) in lists.iter().enumerate() {
        let Some(list) = list else { continue };
        for (position, feature) in list.feature.iter().enumerate() {
            let position_values = typed_values::<T>(name, feature)?;
            max_values = max_values.max(position_values.len());
            for (i, value) in position_values.iter().enumerate() {
                coords.extend_from_slice(&[row, position, i]);
                values.push(value.clone());
            }
        }
    }
    build_sparse(coords, values, vec![lists.len(), max_positions, max_values])
}

fn build_sparse<T: ListElement>(coords: Vec<usize>, values: Vec<T>, dense_shape: Vec<usize>) -> Result<SparseTensor> {
    let nnz = values.len();
    let indices = Array2::from_shape_vec((nnz, dense_shape.len()), coords)?;
    let values = T::into_tensor(ArrayD::from_shape_vec(IxDyn(&[nnz]), values)?);
    SparseTensor::new(indices, values, dense_shape)
}
