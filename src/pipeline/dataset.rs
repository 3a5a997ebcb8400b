//! Record source to prefetched, normalized batches.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, bounded};
use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::{RankDataError, Result};
use crate::feature::spec::FeatureSpecs;
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::source::{InterleavedSource, RecordIter, RecordSource};
use crate::pipeline::stages::{Batcher, RepeatedRecords, ShuffleBuffer};
use crate::pipeline::tfrecord::TfRecordSource;
use crate::sequence::normalize::NormalizedBatch;
use crate::sequence::parser::SequenceExampleParser;

/// A batched, normalized view of a record source.
///
/// Records are repeated, shuffled and batched, then parsed on a producer
/// thread that runs up to `prefetch_buffer_size` batches ahead.
#[derive(Debug, Clone)]
pub struct RankingDataset {
    source: Arc<dyn RecordSource>,
    parser: Arc<SequenceExampleParser>,
    config: PipelineConfig,
}

impl RankingDataset {
    /// A dataset parsing with the protobuf decoder and `config.list_size`.
    pub fn new(
        source: Arc<dyn RecordSource>,
        context_specs: FeatureSpecs,
        example_specs: FeatureSpecs,
        config: PipelineConfig,
    ) -> Result<Self> {
        let parser = SequenceExampleParser::new(context_specs, example_specs, config.list_size)?;
        Self::with_parser(source, Arc::new(parser), config)
    }

    /// A dataset over several sources, read `reader_num_threads` at a time.
    /// When shuffling, the source order is shuffled too.
    pub fn from_sources(
        mut sources: Vec<Arc<dyn RecordSource>>,
        context_specs: FeatureSpecs,
        example_specs: FeatureSpecs,
        config: PipelineConfig,
    ) -> Result<Self> {
        if config.shuffle {
            match config.shuffle_seed {
                Some(seed) => sources.shuffle(&mut StdRng::seed_from_u64(seed)),
                None => sources.shuffle(&mut rand::rng()),
            }
        }
        let interleaved = InterleavedSource::new(sources, config.reader_num_threads)
            .with_sloppy(config.sloppy_ordering)
            .with_buffer_size(config.batch_size.max(1) * 2);
        Self::new(Arc::new(interleaved), context_specs, example_specs, config)
    }

    /// A dataset over TFRecord files, one source per file.
    pub fn from_tfrecord_files(
        paths: Vec<PathBuf>,
        context_specs: FeatureSpecs,
        example_specs: FeatureSpecs,
        config: PipelineConfig,
    ) -> Result<Self> {
        if paths.is_empty() {
            return Err(RankDataError::invalid_argument("no TFRecord files given"));
        }
        let sources = paths
            .into_iter()
            .map(|path| Arc::new(TfRecordSource::new(path)) as Arc<dyn RecordSource>)
            .collect();
        Self::from_sources(sources, context_specs, example_specs, config)
    }

    /// A dataset using an existing parser; the parser's own list size applies.
    pub fn with_parser(
        source: Arc<dyn RecordSource>,
        parser: Arc<SequenceExampleParser>,
        config: PipelineConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            parser,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn parser(&self) -> &SequenceExampleParser {
        &self.parser
    }

    /// Records after repeating and shuffling, before batching.
    pub fn records(&self) -> Result<RecordIter> {
        let records: RecordIter = match self.config.num_epochs {
            Some(1) => self.source.open()?,
            epochs => Box::new(RepeatedRecords::new(Arc::clone(&self.source), epochs)),
        };
        if !self.config.shuffle {
            return Ok(records);
        }
        Ok(Box::new(ShuffleBuffer::new(
            records,
            self.config.shuffle_buffer_size,
            self.config.shuffle_seed,
        )))
    }

    /// Start producing batches. Dropping the returned iterator stops the
    /// producer.
    pub fn batches(&self) -> Result<Batches> {
        let records = self.records()?;
        let batcher = Batcher::new(records, self.config.batch_size, self.config.drops_remainder());
        let parser = Arc::clone(&self.parser);
        let (sender, receiver) = bounded(self.config.prefetch_buffer_size);

        info!(
            "starting pipeline: batch size {}, epochs {:?}, shuffle {}",
            self.config.batch_size, self.config.num_epochs, self.config.shuffle
        );
        let producer = thread::Builder::new()
            .name("batch-producer".to_string())
            .spawn(move || {
                for (index, records) in batcher.enumerate() {
                    let batch = records.and_then(|records| parser.parse(&records));
                    let failed = batch.is_err();
                    if sender.send(batch).is_err() {
                        debug!("batch consumer went away after {index} batches");
                        return;
                    }
                    if failed {
                        return;
                    }
                }
            })?;

        Ok(Batches {
            receiver: Some(receiver),
            producer: Some(producer),
        })
    }
}

/// Prefetched batches from [`RankingDataset::batches`].
#[derive(Debug)]
pub struct Batches {
    receiver: Option<Receiver<Result<NormalizedBatch>>>,
    producer: Option<thread::JoinHandle<()>>,
}

impl Iterator for Batches {
    type Item = Result<NormalizedBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.as_ref()?.recv().ok()
    }
}

impl Drop for Batches {
    fn drop(&mut self) {
        self.receiver.take();
        if let Some(producer) = self.producer.take() {
            if producer.join().is_err() {
                warn!("batch producer panicked");
            }
        }
    }
}
