//! Element types and scalar values.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RankDataError, Result};

/// Element type of a feature tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Float32,
    Int64,
    String,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Float32 => write!(f, "float32"),
            DType::Int64 => write!(f, "int64"),
            DType::String => write!(f, "string"),
        }
    }
}

/// A single value of one of the supported element types.
///
/// In configuration files scalars are written as plain JSON numbers or
/// strings; integers deserialize as [`Scalar::Int64`] and are cast to the
/// field's dtype when specs are resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawScalar", into = "RawScalar")]
pub enum Scalar {
    Float32(f32),
    Int64(i64),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<RawScalar> for Scalar {
    fn from(raw: RawScalar) -> Self {
        match raw {
            RawScalar::Int(v) => Scalar::Int64(v),
            RawScalar::Float(v) => Scalar::Float32(v as f32),
            RawScalar::Text(v) => Scalar::Bytes(v.into_bytes()),
        }
    }
}

impl From<Scalar> for RawScalar {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Float32(v) => RawScalar::Float(v as f64),
            Scalar::Int64(v) => RawScalar::Int(v),
            Scalar::Bytes(v) => RawScalar::Text(String::from_utf8_lossy(&v).into_owned()),
        }
    }
}

impl Scalar {
    /// The dtype this value naturally belongs to.
    pub fn dtype(&self) -> DType {
        match self {
            Scalar::Float32(_) => DType::Float32,
            Scalar::Int64(_) => DType::Int64,
            Scalar::Bytes(_) => DType::String,
        }
    }

    /// The zero value of `dtype`: `0`, `0.0` or the empty string.
    pub fn zero(dtype: DType) -> Self {
        match dtype {
            DType::Float32 => Scalar::Float32(0.0),
            DType::Int64 => Scalar::Int64(0),
            DType::String => Scalar::Bytes(Vec::new()),
        }
    }

    /// Whether this is the zero value of its own dtype.
    pub fn is_zero(&self) -> bool {
        match self {
            Scalar::Float32(v) => *v == 0.0,
            Scalar::Int64(v) => *v == 0,
            Scalar::Bytes(v) => v.is_empty(),
        }
    }

    /// Convert to `dtype`.
    ///
    /// Integers widen to floats; floats narrow to integers only when they are
    /// integral. Numbers and strings never convert into each other.
    pub fn cast(&self, dtype: DType) -> Result<Scalar> {
        match (self, dtype) {
            (Scalar::Float32(v), DType::Float32) => Ok(Scalar::Float32(*v)),
            (Scalar::Int64(v), DType::Int64) => Ok(Scalar::Int64(*v)),
            (Scalar::Bytes(v), DType::String) => Ok(Scalar::Bytes(v.clone())),
            (Scalar::Int64(v), DType::Float32) => Ok(Scalar::Float32(*v as f32)),
            (Scalar::Float32(v), DType::Int64) if v.fract() == 0.0 => Ok(Scalar::Int64(*v as i64)),
            _ => Err(RankDataError::config(format!(
                "cannot use {self} as a {dtype} value"
            ))),
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Scalar::Float32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Scalar::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Float32(v) => write!(f, "{v}"),
            Scalar::Int64(v) => write!(f, "{v}"),
            Scalar::Bytes(v) => write!(f, "{:?}", String::from_utf8_lossy(v)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_widens_integers() {
        assert_eq!(
            Scalar::Int64(-1).cast(DType::Float32).unwrap(),
            Scalar::Float32(-1.0)
        );
        assert_eq!(
            Scalar::Float32(3.0).cast(DType::Int64).unwrap(),
            Scalar::Int64(3)
        );
    }

    #[test]
    fn test_cast_rejects_lossy_and_cross_kind() {
        assert!(Scalar::Float32(0.5).cast(DType::Int64).is_err());
        assert!(Scalar::Int64(1).cast(DType::String).is_err());
        assert!(Scalar::Bytes(b"x".to_vec()).cast(DType::Float32).is_err());
    }

    #[test]
    fn test_zero() {
        assert!(Scalar::zero(DType::Float32).is_zero());
        assert!(Scalar::zero(DType::String).is_zero());
        assert!(!Scalar::Float32(-1.0).is_zero());
    }

    #[test]
    fn test_json_scalars() {
        let values: Vec<Scalar> = serde_json::from_str(r#"[-1, 0.5, "pad"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Scalar::Int64(-1),
                Scalar::Float32(0.5),
                Scalar::Bytes(b"pad".to_vec())
            ]
        );
    }
}
