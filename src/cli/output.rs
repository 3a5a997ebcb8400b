//! Output formatting for CLI commands.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cli::args::{OutputFormat, RankDataArgs};
use crate::error::Result;
use crate::libsvm::QueryAggregate;

/// One query aggregate as a JSON line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub qid: i64,
    pub num_documents: usize,
    pub labels: Vec<f32>,
    pub features: BTreeMap<String, Vec<f32>>,
}

impl From<&QueryAggregate> for AggregateRecord {
    fn from(aggregate: &QueryAggregate) -> Self {
        Self {
            qid: aggregate.qid,
            num_documents: aggregate.num_documents,
            labels: aggregate.labels.to_vec(),
            features: aggregate
                .features
                .iter()
                .map(|(id, column)| (id.clone(), column.iter().copied().collect()))
                .collect(),
        }
    }
}

/// Result structure for LibSVM aggregation.
#[derive(Debug, Serialize, Deserialize)]
pub struct LibsvmSummary {
    pub queries: usize,
    pub documents: usize,
    pub list_size: usize,
    pub lines_read: usize,
    pub duration_ms: u64,
}

/// Result structure for spec resolution.
#[derive(Debug, Serialize, Deserialize)]
pub struct SpecsSummary {
    pub list_size: Option<usize>,
    pub context_features: BTreeMap<String, String>,
    pub example_features: BTreeMap<String, String>,
    pub padding: BTreeMap<String, String>,
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &RankDataArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

fn output_human<T: Serialize>(message: &str, result: &T, args: &RankDataArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }
    let value = serde_json::to_value(result)?;
    print_value(&value, 0);
    Ok(())
}

fn print_value(value: &serde_json::Value, indent: usize) {
    let pad = "  ".repeat(indent);
    match value {
        serde_json::Value::Object(map) => {
            for (key, value) in map {
                match value {
                    serde_json::Value::Object(inner) if inner.is_empty() => println!("{pad}{key}: (none)"),
                    serde_json::Value::Object(_) => {
                        println!("{pad}{key}:");
                        print_value(value, indent + 1);
                    }
                    serde_json::Value::String(s) => println!("{pad}{key}: {s}"),
                    serde_json::Value::Null => println!("{pad}{key}: -"),
                    other => println!("{pad}{key}: {other}"),
                }
            }
        }
        other => println!("{pad}{other}"),
    }
}

fn output_json<T: Serialize>(result: &T, args: &RankDataArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libsvm::finalize;
    use crate::libsvm::line::QueryDocument;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_aggregate_record_json() {
        let aggregate = finalize(
            3,
            vec![QueryDocument::new(2.0).with_feature("1", 0.25)],
            1,
            2,
            &mut StdRng::seed_from_u64(0),
        );
        let json = serde_json::to_string(&AggregateRecord::from(&aggregate)).unwrap();
        assert_eq!(
            json,
            r#"{"qid":3,"num_documents":1,"labels":[2.0,-1.0],"features":{"1":[0.25,0.0]}}"#
        );
    }
}
