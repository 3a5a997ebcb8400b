//! Command implementations for the rankdata CLI.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::time::Instant;

use log::info;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::error::Result;
use crate::feature::config::FeatureConfig;
use crate::feature::spec::{FeatureSpec, SequenceFeatureSpec};
use crate::libsvm::LibSvmDataset;
use crate::sequence::parser::SequenceExampleParser;

/// Execute a CLI command.
pub fn execute_command(args: RankDataArgs) -> Result<()> {
    match &args.command {
        Command::Libsvm(libsvm_args) => aggregate_libsvm(libsvm_args.clone(), &args),
        Command::Specs(specs_args) => show_specs(specs_args.clone(), &args),
    }
}

/// Write one JSON line per query.
fn aggregate_libsvm(args: LibsvmArgs, cli_args: &RankDataArgs) -> Result<()> {
    let mut dataset = LibSvmDataset::new(&args.input, args.num_features, args.list_size);
    if let Some(seed) = args.seed {
        dataset = dataset.with_seed(seed);
    }
    info!("aggregating {}", args.input.display());

    let start_time = Instant::now();
    // Open the input before touching the output file.
    let mut generator = dataset.generate()?;
    let mut sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut queries = 0;
    let mut documents = 0;
    for aggregate in generator.by_ref().take(args.limit.unwrap_or(usize::MAX)) {
        let aggregate = aggregate?;
        queries += 1;
        documents += aggregate.num_documents;
        serde_json::to_writer(&mut sink, &AggregateRecord::from(&aggregate))?;
        writeln!(sink)?;
    }
    sink.flush()?;
    drop(sink);

    // With aggregates on stdout, only a file target leaves room for a summary.
    if args.output.is_some() {
        output_result(
            "LibSVM aggregation finished",
            &LibsvmSummary {
                queries,
                documents,
                list_size: args.list_size,
                lines_read: generator.line_number(),
                duration_ms: start_time.elapsed().as_millis() as u64,
            },
            cli_args,
        )?;
    }
    Ok(())
}

/// Show how a feature config resolves.
fn show_specs(args: SpecsArgs, cli_args: &RankDataArgs) -> Result<()> {
    let mut config = FeatureConfig::from_file(&args.config)?;
    if args.list_size.is_some() {
        config.list_size = args.list_size;
    }
    let parser = SequenceExampleParser::from_config(&config)?;

    let context_features = parser
        .context_specs()
        .iter()
        .map(|(name, spec)| (name.clone(), describe_spec(spec)))
        .collect();
    let example_features = parser
        .resolved()
        .decode_specs
        .iter()
        .map(|(name, spec)| (name.clone(), describe_decode_spec(spec)))
        .collect();
    let padding: BTreeMap<String, String> = parser
        .registry()
        .iter()
        .map(|(name, value)| (name.clone(), value.to_string()))
        .collect();

    output_result(
        &format!("Resolved {}", args.config.display()),
        &SpecsSummary {
            list_size: parser.target().static_size(),
            context_features,
            example_features,
            padding,
        },
        cli_args,
    )
}

fn describe_spec(spec: &FeatureSpec) -> String {
    match spec {
        FeatureSpec::Fixed(fixed) => match &fixed.default_value {
            Some(default) => format!(
                "fixed {} {:?} default {}",
                fixed.dtype,
                fixed.shape,
                serde_json::to_string(default).unwrap_or_default()
            ),
            None => format!("fixed {} {:?}", fixed.dtype, fixed.shape),
        },
        FeatureSpec::Variable(var) => format!("variable {}", var.dtype),
    }
}

fn describe_decode_spec(spec: &SequenceFeatureSpec) -> String {
    match spec {
        SequenceFeatureSpec::FixedSequence {
            shape,
            dtype,
            allow_missing,
        } => {
            let missing = if *allow_missing { ", missing allowed" } else { "" };
            format!("fixed sequence {dtype} {shape:?}{missing}")
        }
        SequenceFeatureSpec::Variable { dtype } => format!("variable {dtype}"),
    }
}
