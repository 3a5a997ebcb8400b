//! Iterator stages between a record source and the parser: repeat, shuffle
//! and batch.
//!
//! Each stage ends its stream after passing on the first error.

use std::sync::Arc;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::pipeline::source::{RecordIter, RecordSource};

/// Reopens a source once per epoch.
pub struct RepeatedRecords {
    source: Arc<dyn RecordSource>,
    num_epochs: Option<usize>,
    epoch: usize,
    current: Option<RecordIter>,
    yielded_this_epoch: bool,
    done: bool,
}

impl RepeatedRecords {
    /// `None` repeats until an epoch comes back empty.
    pub fn new(source: Arc<dyn RecordSource>, num_epochs: Option<usize>) -> Self {
        Self {
            source,
            num_epochs,
            epoch: 0,
            current: None,
            yielded_this_epoch: false,
            done: false,
        }
    }

    /// Number of epochs started so far.
    pub fn epoch(&self) -> usize {
        self.epoch
    }
}

impl Iterator for RepeatedRecords {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let Some(records) = self.current.as_mut() else {
                if self.num_epochs.is_some_and(|limit| self.epoch >= limit) {
                    self.done = true;
                    break;
                }
                match self.source.open() {
                    Ok(records) => {
                        self.epoch += 1;
                        self.yielded_this_epoch = false;
                        debug!("starting epoch {}", self.epoch);
                        self.current = Some(records);
                    }
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                }
                continue;
            };

            match records.next() {
                Some(record) => {
                    self.yielded_this_epoch = true;
                    self.done = record.is_err();
                    return Some(record);
                }
                None => {
                    self.current = None;
                    if !self.yielded_this_epoch {
                        debug!("epoch {} was empty, stopping", self.epoch);
                        self.done = true;
                    }
                }
            }
        }
        None
    }
}

/// Yields items in random order from a bounded buffer.
///
/// The buffer is filled to capacity, then each output is a uniformly chosen
/// buffered item whose slot is refilled from the input.
pub struct ShuffleBuffer<I, T, R = StdRng> {
    inner: I,
    buffer: Vec<T>,
    capacity: usize,
    rng: R,
    exhausted: bool,
}

impl<I, T> ShuffleBuffer<I, T>
where
    I: Iterator<Item = Result<T>>,
{
    /// A buffer seeded with `seed`, or from the thread-local generator.
    pub fn new(inner: I, capacity: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Self::with_rng(inner, capacity, rng)
    }
}

impl<I, T, R> ShuffleBuffer<I, T, R>
where
    I: Iterator<Item = Result<T>>,
    R: Rng,
{
    pub fn with_rng(inner: I, capacity: usize, rng: R) -> Self {
        Self {
            inner,
            buffer: Vec::with_capacity(capacity.min(4096)),
            capacity: capacity.max(1),
            rng,
            exhausted: false,
        }
    }
}

impl<I, T, R> Iterator for ShuffleBuffer<I, T, R>
where
    I: Iterator<Item = Result<T>>,
    R: Rng,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.exhausted && self.buffer.len() < self.capacity {
            match self.inner.next() {
                Some(Ok(item)) => self.buffer.push(item),
                Some(Err(e)) => {
                    self.exhausted = true;
                    self.buffer.clear();
                    return Some(Err(e));
                }
                None => self.exhausted = true,
            }
        }
        if self.buffer.is_empty() {
            return None;
        }
        let index = self.rng.random_range(0..self.buffer.len());
        Some(Ok(self.buffer.swap_remove(index)))
    }
}

/// Groups items into vectors of `batch_size`.
pub struct Batcher<I> {
    inner: I,
    batch_size: usize,
    drop_remainder: bool,
    done: bool,
}

impl<I, T> Batcher<I>
where
    I: Iterator<Item = Result<T>>,
{
    pub fn new(inner: I, batch_size: usize, drop_remainder: bool) -> Self {
        Self {
            inner,
            batch_size: batch_size.max(1),
            drop_remainder,
            done: false,
        }
    }
}

impl<I, T> Iterator for Batcher<I>
where
    I: Iterator<Item = Result<T>>,
{
    type Item = Result<Vec<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            match self.inner.next() {
                Some(Ok(item)) => batch.push(item),
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }
        if batch.len() == self.batch_size {
            return Some(Ok(batch));
        }
        if batch.is_empty() {
            return None;
        }
        if self.drop_remainder {
            debug!("dropping final batch of {} records", batch.len());
            return None;
        }
        Some(Ok(batch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RankDataError;
    use crate::pipeline::source::InMemorySource;

    fn records(count: u8) -> Arc<dyn RecordSource> {
        Arc::new(InMemorySource::new((0..count).map(|i| vec![i]).collect()))
    }

    fn ok_items(count: u32) -> impl Iterator<Item = Result<u32>> {
        (0..count).map(Ok)
    }

    #[test]
    fn test_repeat_fixed_epochs() {
        let repeated = RepeatedRecords::new(records(2), Some(3));
        let all: Vec<Vec<u8>> = repeated.collect::<Result<_>>().unwrap();
        assert_eq!(all.len(), 6);
        assert_eq!(all[2], vec![0]);
    }

    #[test]
    fn test_repeat_forever_is_unbounded() {
        let repeated = RepeatedRecords::new(records(2), None);
        assert_eq!(repeated.take(101).count(), 101);
    }

    #[test]
    fn test_repeat_forever_stops_on_empty_source() {
        assert_eq!(RepeatedRecords::new(records(0), None).count(), 0);
    }

    #[test]
    fn test_shuffle_is_a_seeded_permutation() {
        let first: Vec<u32> = ShuffleBuffer::new(ok_items(100), 10, Some(42))
            .collect::<Result<_>>()
            .unwrap();
        let second: Vec<u32> = ShuffleBuffer::new(ok_items(100), 10, Some(42))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(first, second);
        assert_ne!(first, (0..100).collect::<Vec<_>>());

        let mut sorted = first;
        sorted.sort();
        assert_eq!(sorted, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffle_buffer_of_one_keeps_order() {
        let items: Vec<u32> = ShuffleBuffer::new(ok_items(5), 1, None).collect::<Result<_>>().unwrap();
        assert_eq!(items, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_batcher_remainder() {
        let batches: Vec<Vec<u32>> = Batcher::new(ok_items(5), 2, false).collect::<Result<_>>().unwrap();
        assert_eq!(batches, vec![vec![0, 1], vec![2, 3], vec![4]]);

        let batches: Vec<Vec<u32>> = Batcher::new(ok_items(5), 2, true).collect::<Result<_>>().unwrap();
        assert_eq!(batches, vec![vec![0, 1], vec![2, 3]]);
    }

    #[test]
    fn test_batcher_stops_after_error() {
        let items = vec![Ok(1u32), Err(RankDataError::pipeline("boom")), Ok(2)];
        let results: Vec<_> = Batcher::new(items.into_iter(), 2, false).collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }
}
