//! Padding policy and the registry of non-trivial padding values.
//!
//! A decoder fills positions a record does not have with an implicit value.
//! [`PaddingPolicy`] names that value explicitly so that the resolver, the
//! decoder and the normalizer agree on it; [`PaddingRegistry`] records the
//! per-position fields whose declared default differs from it and therefore
//! need correcting after decoding.

use std::collections::HashMap;
use std::fmt;

use crate::error::Result;
use crate::tensor::{DType, Scalar};

/// Source of the implicit value for missing positions.
pub trait PaddingPolicy: Send + Sync + fmt::Debug {
    /// Value a decoder writes into positions that a record does not have.
    fn implicit_default(&self, dtype: DType) -> Scalar;

    /// Whether `value` is indistinguishable from the implicit default, so a
    /// field declaring it needs no correction.
    fn is_implicit(&self, value: &Scalar) -> bool {
        *value == self.implicit_default(value.dtype())
    }
}

/// Zero for numbers, the empty string for strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZeroPadding;

impl PaddingPolicy for ZeroPadding {
    fn implicit_default(&self, dtype: DType) -> Scalar {
        Scalar::zero(dtype)
    }

    fn is_implicit(&self, value: &Scalar) -> bool {
        value.is_zero()
    }
}

/// Field name to padding value, for per-position fields whose declared
/// default is not the implicit one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaddingRegistry {
    values: HashMap<String, Scalar>,
}

impl PaddingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: Into<String>>(&mut self, name: S, value: Scalar) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Scalar)> {
        self.values.iter()
    }

    /// The value new positions of `name` are filled with: the registered
    /// value, or the policy's implicit default when unregistered.
    pub fn fill_value(&self, name: &str, dtype: DType, policy: &dyn PaddingPolicy) -> Result<Scalar> {
        match self.values.get(name) {
            Some(value) => value.cast(dtype),
            None => Ok(policy.implicit_default(dtype)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_padding_is_implicit() {
        let policy = ZeroPadding;
        assert!(policy.is_implicit(&Scalar::Float32(0.0)));
        assert!(policy.is_implicit(&Scalar::Bytes(Vec::new())));
        assert!(!policy.is_implicit(&Scalar::Int64(-1)));
    }

    #[test]
    fn test_fill_value() {
        let mut registry = PaddingRegistry::new();
        registry.register("label", Scalar::Int64(-1));

        assert_eq!(
            registry.fill_value("label", DType::Float32, &ZeroPadding).unwrap(),
            Scalar::Float32(-1.0)
        );
        assert_eq!(
            registry.fill_value("title", DType::String, &ZeroPadding).unwrap(),
            Scalar::Bytes(Vec::new())
        );
    }

    #[derive(Debug)]
    struct SentinelPadding;

    impl PaddingPolicy for SentinelPadding {
        fn implicit_default(&self, dtype: DType) -> Scalar {
            match dtype {
                DType::String => Scalar::Bytes(b"<pad>".to_vec()),
                _ => Scalar::zero(dtype),
            }
        }
    }

    #[test]
    fn test_custom_policy_default_comparison() {
        assert!(SentinelPadding.is_implicit(&Scalar::Bytes(b"<pad>".to_vec())));
        assert!(!SentinelPadding.is_implicit(&Scalar::Bytes(Vec::new())));
    }
}
