//! Parsing of single LibSVM lines.

use crate::error::{RankDataError, Result};
use crate::libsvm::LABEL_FEATURE;

/// One document of a query: its relevance label and `(feature id, value)`
/// pairs in line order.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDocument {
    pub label: f32,
    pub features: Vec<(String, f32)>,
}

impl QueryDocument {
    pub fn new(label: f32) -> Self {
        Self {
            label,
            features: Vec::new(),
        }
    }

    pub fn with_feature<S: Into<String>>(mut self, id: S, value: f32) -> Self {
        self.features.push((id.into(), value));
        self
    }

    /// The last value recorded for `id`.
    pub fn get(&self, id: &str) -> Option<f32> {
        self.features
            .iter()
            .rev()
            .find(|(fid, _)| fid == id)
            .map(|(_, value)| *value)
    }
}

/// Everything before a `#` (LETOR-style `# docid = ...` trailers).
pub fn strip_comment(line: &str) -> &str {
    line.split_once('#').map_or(line, |(content, _)| content)
}

/// Parse `<label> qid:<id> <fid>:<value> ...` into the query id and document.
///
/// A `label:<value>` pair overrides the leading label.
///
/// ```
/// use rankdata::libsvm::parse_line;
///
/// let (qid, doc) = parse_line("2 qid:10 1:0.5 3:1.25 # docid = 7").unwrap();
/// assert_eq!(qid, 10);
/// assert_eq!(doc.label, 2.0);
/// assert_eq!(doc.get("3"), Some(1.25));
/// ```
pub fn parse_line(line: &str) -> Result<(i64, QueryDocument)> {
    let mut tokens = strip_comment(line).split_whitespace();
    let (Some(label), Some(qid)) = (tokens.next(), tokens.next()) else {
        return Err(RankDataError::parse(format!(
            "expected '<label> qid:<id> ...', got '{}'",
            line.trim()
        )));
    };

    let label = parse_value(label)?;
    let qid = match qid.split_once(':') {
        Some(("qid", id)) => id
            .parse::<i64>()
            .map_err(|_| RankDataError::parse(format!("invalid query id '{id}'")))?,
        _ => {
            return Err(RankDataError::parse(format!(
                "expected 'qid:<id>' as second token, got '{qid}'"
            )));
        }
    };

    let mut document = QueryDocument::new(label);
    for pair in tokens {
        let (id, value) = pair
            .split_once(':')
            .ok_or_else(|| RankDataError::parse(format!("feature '{pair}' is not '<id>:<value>'")))?;
        let value = parse_value(value)?;
        if id == LABEL_FEATURE {
            document.label = value;
        } else {
            document.features.push((id.to_string(), value));
        }
    }
    Ok((qid, document))
}

fn parse_value(token: &str) -> Result<f32> {
    token
        .parse::<f32>()
        .map_err(|_| RankDataError::parse(format!("'{token}' is not a number")))
}
