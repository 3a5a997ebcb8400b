//! `SequenceExample` records to fixed-shape batches.
//!
//! The flow for one batch is decode ([`SequenceDecoder`]), restore declared
//! padding values ([`PaddingReconciler`]), then resize every per-position
//! field to one list size ([`ListNormalizer`]). [`SequenceExampleParser`]
//! runs the three steps.

pub mod decoder;
pub mod normalize;
pub mod parser;
pub mod proto;
pub mod reconcile;

pub use decoder::{ParsedBatch, ProtoSequenceDecoder, SequenceDecoder};
pub use normalize::{ListNormalizer, NormalizedBatch, ResizeAction, TargetLength};
pub use parser::SequenceExampleParser;
pub use reconcile::PaddingReconciler;
