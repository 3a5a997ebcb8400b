//! # rankdata
//!
//! Learning-to-rank input preparation: serialized per-query records in,
//! fixed-shape batches out.
//!
//! ## Features
//!
//! - `SequenceExample` decoding into dense and sparse tensors
//! - Declared padding values restored after decoding (e.g. `-1` label padding)
//! - Static or per-batch dynamic list sizes
//! - LibSVM text aggregation per query
//! - Repeat, shuffle, batch and prefetch pipeline
//! - Serving-time input receiver

pub mod cli;
pub mod error;
pub mod feature;
pub mod libsvm;
pub mod pipeline;
pub mod sequence;
pub mod serving;
pub mod tensor;

pub mod prelude {
    pub use crate::error::{RankDataError, Result};
    pub use crate::feature::{
        DefaultValue, FeatureConfig, FeatureSpec, FeatureSpecs, FixedLenFeature, PaddingPolicy, PaddingRegistry,
        SpecResolver, ZeroPadding,
    };
    pub use crate::libsvm::{LibSvmDataset, QueryAggregate};
    pub use crate::pipeline::{InMemorySource, PipelineConfig, RankingDataset, RecordSource, TfRecordSource};
    pub use crate::sequence::{NormalizedBatch, SequenceExampleParser, TargetLength};
    pub use crate::serving::{ServingInputReceiver, build_serving_input_receiver};
    pub use crate::tensor::{DType, DenseTensor, FeatureTensor, Scalar, SparseTensor};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
