//! Serving-time entry point: one slot of serialized records in, one
//! normalized batch out.

use std::collections::HashMap;

use log::debug;

use crate::error::{RankDataError, Result};
use crate::feature::spec::FeatureSpecs;
use crate::sequence::normalize::NormalizedBatch;
use crate::sequence::parser::SequenceExampleParser;

/// Name of the single input slot a receiver accepts.
pub const SEQUENCE_EXAMPLE_INPUT: &str = "sequence_example";

/// Receives serialized `SequenceExample` records at serving time.
///
/// Context and example specs should only hold features available at serving
/// time (no labels or weights).
#[derive(Debug, Clone)]
pub struct ServingInputReceiver {
    parser: SequenceExampleParser,
    default_batch_size: Option<usize>,
}

/// Build a receiver. `input_size` of `None` keeps the list size dynamic;
/// `default_batch_size` of `None` accepts any batch size.
pub fn build_serving_input_receiver(
    input_size: Option<usize>,
    context_specs: FeatureSpecs,
    example_specs: FeatureSpecs,
    default_batch_size: Option<usize>,
) -> Result<ServingInputReceiver> {
    let parser = SequenceExampleParser::new(context_specs, example_specs, input_size)?;
    Ok(ServingInputReceiver::new(parser, default_batch_size))
}

impl ServingInputReceiver {
    pub fn new(parser: SequenceExampleParser, default_batch_size: Option<usize>) -> Self {
        Self {
            parser,
            default_batch_size,
        }
    }

    /// The names of the slots `receive` expects.
    pub fn input_names(&self) -> [&'static str; 1] {
        [SEQUENCE_EXAMPLE_INPUT]
    }

    pub fn default_batch_size(&self) -> Option<usize> {
        self.default_batch_size
    }

    pub fn parser(&self) -> &SequenceExampleParser {
        &self.parser
    }

    pub fn receive(&self, inputs: &HashMap<String, Vec<Vec<u8>>>) -> Result<NormalizedBatch> {
        if let Some(name) = inputs.keys().find(|name| name.as_str() != SEQUENCE_EXAMPLE_INPUT) {
            return Err(RankDataError::invalid_argument(format!("unexpected input '{name}'")));
        }
        let serialized = inputs.get(SEQUENCE_EXAMPLE_INPUT).ok_or_else(|| {
            RankDataError::invalid_argument(format!("missing input '{SEQUENCE_EXAMPLE_INPUT}'"))
        })?;
        self.receive_serialized(serialized)
    }

    /// Same as [`receive`](Self::receive) with the slot already unpacked.
    pub fn receive_serialized(&self, serialized: &[Vec<u8>]) -> Result<NormalizedBatch> {
        if let Some(expected) = self.default_batch_size {
            if serialized.len() != expected {
                return Err(RankDataError::invalid_argument(format!(
                    "expected a batch of {expected} records, got {}",
                    serialized.len()
                )));
            }
        }
        debug!("serving {} records", serialized.len());
        self.parser.parse(serialized)
    }
}
