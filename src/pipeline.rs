//! Batch pipeline: record sources to prefetched [`NormalizedBatch`]es.
//!
//! [`NormalizedBatch`]: crate::sequence::NormalizedBatch

pub mod config;
pub mod dataset;
pub mod source;
pub mod stages;
pub mod tfrecord;

pub use config::PipelineConfig;
pub use dataset::{Batches, RankingDataset};
pub use source::{InMemorySource, InterleavedSource, RecordIter, RecordSource};
pub use stages::{Batcher, RepeatedRecords, ShuffleBuffer};
pub use tfrecord::{TfRecordReader, TfRecordSource, TfRecordWriter};
