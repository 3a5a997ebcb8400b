//! Record sources and multi-source interleaving.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, bounded, unbounded};
use log::{debug, warn};

use crate::error::Result;

/// A stream of serialized records.
pub type RecordIter = Box<dyn Iterator<Item = Result<Vec<u8>>> + Send>;

/// Produces serialized records. Every call to `open` starts a fresh pass.
pub trait RecordSource: Send + Sync + fmt::Debug {
    fn open(&self) -> Result<RecordIter>;
}

/// Records held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    records: Arc<Vec<Vec<u8>>>,
}

impl InMemorySource {
    pub fn new(records: Vec<Vec<u8>>) -> Self {
        Self {
            records: Arc::new(records),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSource for InMemorySource {
    fn open(&self) -> Result<RecordIter> {
        let records = Arc::clone(&self.records);
        Ok(Box::new(
            (0..records.len()).map(move |i| Ok(records[i].clone())),
        ))
    }
}

/// Reads several sources at once.
///
/// Deterministic mode cycles through up to `cycle_length` open sources,
/// taking one record from each in turn; an exhausted source is replaced in
/// its slot by the next unopened one. Sloppy mode reads the sources on
/// `cycle_length` worker threads and yields records as they arrive.
#[derive(Debug, Clone)]
pub struct InterleavedSource {
    sources: Vec<Arc<dyn RecordSource>>,
    cycle_length: usize,
    sloppy: bool,
    buffer_size: usize,
}

impl InterleavedSource {
    pub fn new(sources: Vec<Arc<dyn RecordSource>>, cycle_length: usize) -> Self {
        Self {
            sources,
            cycle_length: cycle_length.max(1),
            sloppy: false,
            buffer_size: 256,
        }
    }

    pub fn with_sloppy(mut self, sloppy: bool) -> Self {
        self.sloppy = sloppy;
        self
    }

    /// Records buffered between sloppy workers and the consumer.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn num_sources(&self) -> usize {
        self.sources.len()
    }

    fn open_sloppy(&self) -> Result<RecordIter> {
        let (source_sender, source_receiver) = unbounded::<Arc<dyn RecordSource>>();
        for source in &self.sources {
            // The receiver is alive, so this cannot fail.
            let _ = source_sender.send(Arc::clone(source));
        }
        drop(source_sender);

        let (record_sender, record_receiver) = bounded(self.buffer_size);
        let workers = self.cycle_length.min(self.sources.len());
        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let sources = source_receiver.clone();
            let records = record_sender.clone();
            let handle = thread::Builder::new()
                .name(format!("record-reader-{worker_id}"))
                .spawn(move || {
                    for source in sources.iter() {
                        let iter = match source.open() {
                            Ok(iter) => iter,
                            Err(e) => {
                                let _ = records.send(Err(e));
                                return;
                            }
                        };
                        for record in iter {
                            let failed = record.is_err();
                            if records.send(record).is_err() {
                                debug!("record reader {worker_id} cancelled");
                                return;
                            }
                            if failed {
                                return;
                            }
                        }
                    }
                })?;
            handles.push(handle);
        }

        Ok(Box::new(SloppyRecords {
            receiver: Some(record_receiver),
            workers: handles,
        }))
    }
}

impl RecordSource for InterleavedSource {
    fn open(&self) -> Result<RecordIter> {
        if self.sloppy {
            return self.open_sloppy();
        }
        Ok(Box::new(RoundRobin {
            pending: self.sources.iter().cloned().collect(),
            active: Vec::with_capacity(self.cycle_length),
            cycle_length: self.cycle_length,
            cursor: 0,
            failed: false,
        }))
    }
}

struct RoundRobin {
    pending: VecDeque<Arc<dyn RecordSource>>,
    active: Vec<RecordIter>,
    cycle_length: usize,
    cursor: usize,
    failed: bool,
}

impl Iterator for RoundRobin {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        while self.active.len() < self.cycle_length {
            let Some(source) = self.pending.pop_front() else { break };
            match source.open() {
                Ok(iter) => self.active.push(iter),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }

        while !self.active.is_empty() {
            if self.cursor >= self.active.len() {
                self.cursor = 0;
            }
            match self.active[self.cursor].next() {
                Some(record) => {
                    self.failed = record.is_err();
                    self.cursor += 1;
                    return Some(record);
                }
                None => match self.pending.pop_front().map(|source| source.open()) {
                    Some(Ok(iter)) => self.active[self.cursor] = iter,
                    Some(Err(e)) => {
                        self.failed = true;
                        return Some(Err(e));
                    }
                    None => drop(self.active.remove(self.cursor)),
                },
            }
        }
        None
    }
}

/// Records arriving from sloppy reader threads.
struct SloppyRecords {
    receiver: Option<Receiver<Result<Vec<u8>>>>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl Iterator for SloppyRecords {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.receiver.as_ref()?.recv().ok()?;
        if record.is_err() {
            // Disconnect so the remaining workers stop at their next send.
            self.receiver.take();
        }
        Some(record)
    }
}

impl Drop for SloppyRecords {
    fn drop(&mut self) {
        // Disconnect first so blocked workers see a failed send and exit.
        self.receiver.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("record reader panicked");
            }
        }
    }
}
