//! Configuration for batch pipelines.

use serde::{Deserialize, Serialize};

use crate::error::{RankDataError, Result};

/// Configuration for a [`RankingDataset`](crate::pipeline::RankingDataset).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of records per batch.
    pub batch_size: usize,

    /// List size per query; `None` or zero keeps it dynamic per batch.
    pub list_size: Option<usize>,

    /// Passes over the input; `None` repeats forever.
    pub num_epochs: Option<usize>,

    /// Whether sources and records are shuffled.
    pub shuffle: bool,

    /// Capacity of the record shuffle buffer.
    pub shuffle_buffer_size: usize,

    /// Seed for every shuffle; unseeded when `None`.
    pub shuffle_seed: Option<u64>,

    /// Number of parsed batches buffered ahead of the consumer.
    pub prefetch_buffer_size: usize,

    /// Number of sources read concurrently.
    pub reader_num_threads: usize,

    /// Trade deterministic record order for throughput when interleaving.
    pub sloppy_ordering: bool,

    /// Drop a final batch smaller than `batch_size`.
    /// Always done when repeating forever.
    pub drop_final_batch: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            list_size: None,
            num_epochs: None,
            shuffle: true,
            shuffle_buffer_size: 1000,
            shuffle_seed: None,
            prefetch_buffer_size: 32,
            reader_num_threads: 10,
            sloppy_ordering: true,
            drop_final_batch: false,
        }
    }
}

impl PipelineConfig {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            ..Default::default()
        }
    }

    pub fn with_list_size(mut self, list_size: usize) -> Self {
        self.list_size = Some(list_size);
        self
    }

    pub fn with_num_epochs(mut self, num_epochs: usize) -> Self {
        self.num_epochs = Some(num_epochs);
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    pub fn with_sloppy_ordering(mut self, sloppy: bool) -> Self {
        self.sloppy_ordering = sloppy;
        self
    }

    pub fn with_drop_final_batch(mut self, drop: bool) -> Self {
        self.drop_final_batch = drop;
        self
    }

    /// Whether a short final batch is discarded.
    pub fn drops_remainder(&self) -> bool {
        self.drop_final_batch || self.num_epochs.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(RankDataError::invalid_argument("batch_size must be positive"));
        }
        if self.shuffle && self.shuffle_buffer_size == 0 {
            return Err(RankDataError::invalid_argument(
                "shuffle_buffer_size must be positive when shuffling",
            ));
        }
        if self.reader_num_threads == 0 {
            return Err(RankDataError::invalid_argument("reader_num_threads must be positive"));
        }
        Ok(())
    }
}
