//! LibSVM learning-to-rank text format.
//!
//! Lines look like `<label> qid:<id> <fid>:<value> ...` and must be sorted by
//! query id. [`LibSvmGenerator`] groups each query's lines and turns them into
//! a [`QueryAggregate`] of fixed-size label and feature arrays: documents are
//! shuffled, cut to the list size, and missing slots are padded with
//! [`PADDING_LABEL`] (labels) or zero (features).

pub mod aggregate;
pub mod generator;
pub mod line;

pub use aggregate::{QueryAggregate, finalize};
pub use generator::{LibSvmDataset, LibSvmGenerator};
pub use line::{QueryDocument, parse_line};

/// Reserved feature id holding the relevance label.
pub const LABEL_FEATURE: &str = "label";

/// Label of padded list slots; never a valid relevance grade.
pub const PADDING_LABEL: f32 = -1.0;
