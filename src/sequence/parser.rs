//! Serialized records to a [`NormalizedBatch`]: decode, reconcile, normalize.

use std::sync::Arc;

use log::debug;

use crate::error::{RankDataError, Result};
use crate::feature::config::FeatureConfig;
use crate::feature::padding::{PaddingPolicy, PaddingRegistry, ZeroPadding};
use crate::feature::resolver::{ResolvedSpecs, SpecResolver};
use crate::feature::spec::{FeatureSpec, FeatureSpecs};
use crate::sequence::decoder::{ProtoSequenceDecoder, SequenceDecoder, context_default};
use crate::sequence::normalize::{ListNormalizer, NormalizedBatch, TargetLength};
use crate::sequence::reconcile::PaddingReconciler;

/// Parses batches of serialized `SequenceExample` records.
///
/// Specs are validated and resolved once, at construction, so a bad default
/// fails before any record is decoded.
///
/// ```
/// use rankdata::feature::{FeatureSpec, FeatureSpecs, FixedLenFeature};
/// use rankdata::sequence::SequenceExampleParser;
/// use rankdata::tensor::DType;
///
/// let mut example_specs = FeatureSpecs::new();
/// example_specs.insert(
///     "relevance".to_string(),
///     FeatureSpec::Fixed(FixedLenFeature::new(vec![1], DType::Float32).with_default(-1)),
/// );
/// let parser = SequenceExampleParser::new(FeatureSpecs::new(), example_specs, Some(10)).unwrap();
/// assert!(parser.registry().contains("relevance"));
/// ```
#[derive(Debug, Clone)]
pub struct SequenceExampleParser {
    context_specs: FeatureSpecs,
    resolved: ResolvedSpecs,
    target: TargetLength,
    policy: Arc<dyn PaddingPolicy>,
    decoder: Arc<dyn SequenceDecoder>,
}

impl SequenceExampleParser {
    /// A parser using zero padding and the protobuf decoder.
    pub fn new(context_specs: FeatureSpecs, example_specs: FeatureSpecs, list_size: Option<usize>) -> Result<Self> {
        let policy: Arc<dyn PaddingPolicy> = Arc::new(ZeroPadding);
        let decoder = Arc::new(ProtoSequenceDecoder::new(policy.clone()));
        Self::with_components(context_specs, example_specs, list_size, policy, decoder)
    }

    pub fn from_config(config: &FeatureConfig) -> Result<Self> {
        Self::new(
            config.context_features.clone(),
            config.example_features.clone(),
            config.list_size,
        )
    }

    /// A parser with an explicit padding policy and decoder. The decoder must
    /// fill missing positions with `policy`'s implicit default.
    pub fn with_components(
        context_specs: FeatureSpecs,
        example_specs: FeatureSpecs,
        list_size: Option<usize>,
        policy: Arc<dyn PaddingPolicy>,
        decoder: Arc<dyn SequenceDecoder>,
    ) -> Result<Self> {
        validate_specs(&context_specs, &example_specs)?;
        let resolved = SpecResolver::new(policy.clone()).resolve(&example_specs)?;
        let target = TargetLength::from_list_size(list_size);
        debug!(
            "parser ready: {} context features, {} example features, {} padded, list size {:?}",
            context_specs.len(),
            resolved.decode_specs.len(),
            resolved.registry.len(),
            target
        );
        Ok(Self {
            context_specs,
            resolved,
            target,
            policy,
            decoder,
        })
    }

    pub fn context_specs(&self) -> &FeatureSpecs {
        &self.context_specs
    }

    pub fn resolved(&self) -> &ResolvedSpecs {
        &self.resolved
    }

    pub fn registry(&self) -> &PaddingRegistry {
        &self.resolved.registry
    }

    pub fn target(&self) -> TargetLength {
        self.target
    }

    pub fn parse(&self, serialized: &[Vec<u8>]) -> Result<NormalizedBatch> {
        let parsed = self
            .decoder
            .decode(serialized, &self.context_specs, &self.resolved.decode_specs)?;
        let reconciled = PaddingReconciler::new(&self.resolved.registry).reconcile(parsed)?;
        let normalized =
            ListNormalizer::new(self.target, &self.resolved.registry, self.policy.as_ref()).normalize(reconciled)?;
        debug!(
            "normalized {} records to list size {}",
            normalized.batch_size, normalized.list_size
        );
        Ok(normalized)
    }
}

fn validate_specs(context_specs: &FeatureSpecs, example_specs: &FeatureSpecs) -> Result<()> {
    if example_specs.is_empty() {
        return Err(RankDataError::config("no example features declared"));
    }
    if let Some(name) = context_specs.keys().find(|name| example_specs.contains_key(*name)) {
        return Err(RankDataError::config(format!(
            "feature '{name}' is declared as both context and example feature"
        )));
    }
    for (name, spec) in context_specs {
        if let FeatureSpec::Fixed(fixed) = spec {
            context_default(fixed).map_err(|e| RankDataError::config(format!("context feature '{name}': {e}")))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::spec::FixedLenFeature;
    use crate::sequence::proto::{Feature, SequenceExample};
    use crate::tensor::DType;
    use prost::Message;

    fn specs(entries: Vec<(&str, FeatureSpec)>) -> FeatureSpecs {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn label_spec() -> FeatureSpec {
        FeatureSpec::Fixed(FixedLenFeature::new(vec![1], DType::Float32).with_default(-1))
    }

    #[test]
    fn test_parse_pads_labels_with_sentinel() {
        let parser = SequenceExampleParser::new(FeatureSpecs::new(), specs(vec![("label", label_spec())]), Some(3))
            .unwrap();
        let records: Vec<Vec<u8>> = [
            SequenceExample::new().with_feature_list(
                "label",
                vec![Feature::floats(vec![1.0]), Feature::floats(vec![0.0])],
            ),
            SequenceExample::new().with_feature_list("label", vec![Feature::floats(vec![2.0])]),
        ]
        .iter()
        .map(Message::encode_to_vec)
        .collect();

        let batch = parser.parse(&records).unwrap();
        assert_eq!(batch.list_size, 3);
        let values: Vec<f32> = batch.features["label"]
            .as_dense()
            .unwrap()
            .as_f32()
            .unwrap()
            .iter()
            .copied()
            .collect();
        assert_eq!(values, vec![1.0, 0.0, -1.0, 2.0, -1.0, -1.0]);
    }

    #[test]
    fn test_overlapping_keys_are_rejected() {
        let context = specs(vec![("label", FeatureSpec::fixed(vec![1], DType::Float32))]);
        let result = SequenceExampleParser::new(context, specs(vec![("label", label_spec())]), None);
        assert!(matches!(result, Err(RankDataError::Config(_))));
    }

    #[test]
    fn test_empty_example_specs_are_rejected() {
        assert!(SequenceExampleParser::new(FeatureSpecs::new(), FeatureSpecs::new(), None).is_err());
    }

    #[test]
    fn test_bad_defaults_fail_at_construction() {
        let ambiguous = FeatureSpec::Fixed(FixedLenFeature::new(vec![1], DType::Float32).with_default(vec![1.0f32, 2.0]));
        assert!(matches!(
            SequenceExampleParser::new(FeatureSpecs::new(), specs(vec![("label", ambiguous)]), None),
            Err(RankDataError::Config(_))
        ));

        let context = specs(vec![(
            "query",
            FeatureSpec::Fixed(FixedLenFeature::new(vec![1], DType::Int64).with_default("none")),
        )]);
        assert!(matches!(
            SequenceExampleParser::new(context, specs(vec![("label", label_spec())]), None),
            Err(RankDataError::Config(_))
        ));
    }
}
