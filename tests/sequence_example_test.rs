//! Integration tests for SequenceExample parsing end to end

use std::collections::HashMap;
use std::sync::Arc;

use prost::Message;
use rankdata::feature::{FeatureConfig, PaddingPolicy};
use rankdata::prelude::*;
use rankdata::sequence::ProtoSequenceDecoder;
use rankdata::sequence::proto::{Feature, SequenceExample};
use rankdata::serving::SEQUENCE_EXAMPLE_INPUT;

fn ranking_specs() -> (FeatureSpecs, FeatureSpecs) {
    let context = FeatureSpecs::from([(
        "query_length".to_string(),
        FeatureSpec::fixed(vec![1], DType::Int64),
    )]);
    let examples = FeatureSpecs::from([
        ("unigrams".to_string(), FeatureSpec::variable(DType::String)),
        (
            "utility".to_string(),
            FeatureSpec::Fixed(FixedLenFeature::new(vec![1], DType::Float32).with_default(-1.0f32)),
        ),
    ]);
    (context, examples)
}

fn tensorflow_example() -> Vec<u8> {
    SequenceExample::new()
        .with_context("query_length", Feature::int64s(vec![3]))
        .with_feature_list(
            "unigrams",
            vec![
                Feature::bytes(["tensorflow"]),
                Feature::bytes(["learning", "to", "rank"]),
            ],
        )
        .with_feature_list(
            "utility",
            vec![Feature::floats(vec![0.0]), Feature::floats(vec![1.0])],
        )
        .encode_to_vec()
}

fn f32_values(tensor: &FeatureTensor) -> Vec<f32> {
    tensor.as_dense().unwrap().as_f32().unwrap().iter().copied().collect()
}

#[test]
fn test_documented_example() -> Result<()> {
    let (context, examples) = ranking_specs();
    let parser = SequenceExampleParser::new(context, examples, Some(3))?;
    let batch = parser.parse(&[tensorflow_example()])?;

    assert_eq!(batch.batch_size, 1);
    assert_eq!(batch.list_size, 3);
    assert_eq!(batch.static_list_size, Some(3));

    let query_length = batch.get("query_length").unwrap().as_dense().unwrap();
    assert_eq!(query_length.shape(), &[1, 1]);
    assert_eq!(query_length.as_i64().unwrap().iter().copied().collect::<Vec<_>>(), vec![3]);

    let utility = batch.get("utility").unwrap();
    assert_eq!(utility.shape(), &[1, 3, 1]);
    assert_eq!(f32_values(utility), vec![0.0, 1.0, -1.0]);

    let unigrams = batch.get("unigrams").unwrap().as_sparse().unwrap();
    assert_eq!(unigrams.dense_shape(), &[1, 3, 3]);
    let indices: Vec<Vec<usize>> = unigrams.indices().outer_iter().map(|row| row.to_vec()).collect();
    assert_eq!(
        indices,
        vec![vec![0, 0, 0], vec![0, 1, 0], vec![0, 1, 1], vec![0, 1, 2]]
    );
    let words: Vec<Vec<u8>> = unigrams.values().as_bytes().unwrap().iter().cloned().collect();
    assert_eq!(
        words,
        vec![b"tensorflow".to_vec(), b"learning".to_vec(), b"to".to_vec(), b"rank".to_vec()]
    );
    Ok(())
}

#[test]
fn test_dynamic_list_size_follows_longest_record() -> Result<()> {
    let (context, examples) = ranking_specs();
    let parser = SequenceExampleParser::new(context, examples, None)?;

    let short = SequenceExample::new()
        .with_context("query_length", Feature::int64s(vec![1]))
        .with_feature_list("utility", vec![Feature::floats(vec![2.0])])
        .encode_to_vec();
    let batch = parser.parse(&[tensorflow_example(), short])?;

    assert_eq!(batch.list_size, 2);
    assert_eq!(batch.static_list_size, None);
    assert_eq!(f32_values(batch.get("utility").unwrap()), vec![0.0, 1.0, 2.0, -1.0]);
    // The short record has no unigrams at all.
    assert_eq!(batch.get("unigrams").unwrap().shape(), &[2, 2, 3]);
    Ok(())
}

#[test]
fn test_static_list_size_truncates() -> Result<()> {
    let (context, examples) = ranking_specs();
    let parser = SequenceExampleParser::new(context, examples, Some(1))?;
    let batch = parser.parse(&[tensorflow_example()])?;

    assert_eq!(f32_values(batch.get("utility").unwrap()), vec![0.0]);
    let unigrams = batch.get("unigrams").unwrap().as_sparse().unwrap();
    assert_eq!(unigrams.dense_shape(), &[1, 1, 3]);
    assert_eq!(unigrams.nnz(), 1);
    Ok(())
}

#[test]
fn test_serving_receiver_matches_parser() -> Result<()> {
    let (context, examples) = ranking_specs();
    let parser = SequenceExampleParser::new(context.clone(), examples.clone(), Some(3))?;
    let receiver = build_serving_input_receiver(Some(3), context, examples, None)?;

    let inputs = HashMap::from([(SEQUENCE_EXAMPLE_INPUT.to_string(), vec![tensorflow_example()])]);
    assert_eq!(receiver.receive(&inputs)?, parser.parse(&[tensorflow_example()])?);
    Ok(())
}

#[test]
fn test_config_file_drives_parser() -> Result<()> {
    let config = FeatureConfig::from_json(
        r#"{
            "context_features": {"query_length": {"kind": "fixed", "shape": [1], "dtype": "int64"}},
            "example_features": {
                "unigrams": {"kind": "variable", "dtype": "string"},
                "utility": {"kind": "fixed", "shape": [1], "dtype": "float32", "default_value": [-1]}
            },
            "list_size": 3
        }"#,
    )?;
    let parser = SequenceExampleParser::from_config(&config)?;
    assert_eq!(parser.registry().get("utility"), Some(&Scalar::Float32(-1.0)));

    let batch = parser.parse(&[tensorflow_example()])?;
    assert_eq!(f32_values(batch.get("utility").unwrap()), vec![0.0, 1.0, -1.0]);
    Ok(())
}

/// Pads numbers with a large negative value instead of zero.
#[derive(Debug)]
struct NegativePadding;

impl PaddingPolicy for NegativePadding {
    fn implicit_default(&self, dtype: DType) -> Scalar {
        match dtype {
            DType::Float32 => Scalar::Float32(-100.0),
            DType::Int64 => Scalar::Int64(-100),
            DType::String => Scalar::Bytes(Vec::new()),
        }
    }
}

#[test]
fn test_injected_padding_policy() -> Result<()> {
    let policy: Arc<dyn PaddingPolicy> = Arc::new(NegativePadding);
    let examples = FeatureSpecs::from([
        ("score".to_string(), FeatureSpec::fixed(vec![1], DType::Float32)),
        (
            "label".to_string(),
            FeatureSpec::Fixed(FixedLenFeature::new(vec![1], DType::Float32).with_default(-1.0f32)),
        ),
    ]);
    let parser = SequenceExampleParser::with_components(
        FeatureSpecs::new(),
        examples,
        Some(2),
        policy.clone(),
        Arc::new(ProtoSequenceDecoder::new(policy)),
    )?;
    // Only the label differs from the policy's implicit value.
    assert_eq!(parser.registry().len(), 1);

    let record = SequenceExample::new()
        .with_feature_list("score", vec![Feature::floats(vec![0.5])])
        .with_feature_list("label", vec![Feature::floats(vec![1.0])])
        .encode_to_vec();
    let batch = parser.parse(&[record])?;
    assert_eq!(f32_values(batch.get("score").unwrap()), vec![0.5, -100.0]);
    assert_eq!(f32_values(batch.get("label").unwrap()), vec![1.0, -1.0]);
    Ok(())
}

#[test]
fn test_decode_failures() {
    let (context, examples) = ranking_specs();
    let parser = SequenceExampleParser::new(context, examples, None).unwrap();

    // Missing required context feature.
    let record = SequenceExample::new()
        .with_feature_list("utility", vec![Feature::floats(vec![1.0])])
        .encode_to_vec();
    assert!(matches!(parser.parse(&[record]), Err(RankDataError::Decode(_))));

    // Not a protobuf at all.
    assert!(matches!(
        parser.parse(&[b"\xff\xff".to_vec()]),
        Err(RankDataError::Proto { index: 0, .. })
    ));
}
