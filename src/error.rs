//! Error types for the rankdata library.
//!
//! All fallible operations return [`RankDataError`] through the crate-wide
//! [`Result`] alias. Configuration problems are reported when a parser or
//! receiver is constructed; data problems are reported per batch or per line.
//!
//! # Examples
//!
//! ```
//! use rankdata::error::{RankDataError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(RankDataError::config("default_value must be a scalar"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for rankdata operations.
#[derive(Error, Debug)]
pub enum RankDataError {
    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid feature specification or parser configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A tensor did not have the shape its spec promised.
    #[error("Shape contract violation: {0}")]
    ShapeContract(String),

    /// Serialized record could not be mapped to the declared specs.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Malformed text-format input.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A serialized record is not valid protobuf.
    #[error("Protobuf decode error in record {index}: {source}")]
    Proto {
        index: usize,
        #[source]
        source: prost::DecodeError,
    },

    /// Array construction errors
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// Batch pipeline errors (worker failures, closed channels)
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

}

/// Result type alias for operations that may fail with RankDataError.
pub type Result<T> = std::result::Result<T, RankDataError>;

impl RankDataError {
    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        RankDataError::Config(msg.into())
    }

    /// Create a new shape contract error.
    pub fn shape_contract<S: Into<String>>(msg: S) -> Self {
        RankDataError::ShapeContract(msg.into())
    }

    /// Create a new decode error.
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        RankDataError::Decode(msg.into())
    }

    /// Create a new protobuf error for the record at `index`.
    pub fn proto(index: usize, source: prost::DecodeError) -> Self {
        RankDataError::Proto { index, source }
    }

    /// Create a new parse error.
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        RankDataError::Parse(msg.into())
    }

    /// Create a new pipeline error.
    pub fn pipeline<S: Into<String>>(msg: S) -> Self {
        RankDataError::Pipeline(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        RankDataError::InvalidArgument(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        RankDataError::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = RankDataError::config("bad default");
        assert_eq!(error.to_string(), "Configuration error: bad default");

        let error = RankDataError::shape_contract("rank 2");
        assert_eq!(error.to_string(), "Shape contract violation: rank 2");

        let error = RankDataError::parse("line 3: missing qid");
        assert_eq!(error.to_string(), "Parse error: line 3: missing qid");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = RankDataError::from(io_error);

        match error {
            RankDataError::Io(_) => {} // Expected
            _ => panic!("Expected IO error variant"),
        }
    }
}
