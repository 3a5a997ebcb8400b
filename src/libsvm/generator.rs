//! Single-pass aggregation of a qid-sorted LibSVM stream.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::mem;
use std::path::{Path, PathBuf};

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{RankDataError, Result};
use crate::libsvm::aggregate::{QueryAggregate, finalize};
use crate::libsvm::line::{QueryDocument, parse_line, strip_comment};

#[derive(Debug)]
enum State {
    /// No line seen yet.
    Start,
    Accumulating {
        qid: i64,
        documents: Vec<QueryDocument>,
    },
    /// Input exhausted or an error was reported.
    Done,
}

/// Groups consecutive lines with the same query id and yields one
/// [`QueryAggregate`] per group.
///
/// Input must be sorted by query id; a query id that reappears later starts a
/// new group. After an error the iterator yields nothing more.
#[derive(Debug)]
pub struct LibSvmGenerator<R, G = StdRng> {
    reader: R,
    rng: G,
    num_features: usize,
    list_size: usize,
    line_number: usize,
    line: String,
    state: State,
}

impl<R: BufRead, G: Rng> LibSvmGenerator<R, G> {
    pub fn new(reader: R, num_features: usize, list_size: usize, rng: G) -> Self {
        Self {
            reader,
            rng,
            num_features,
            list_size,
            line_number: 0,
            line: String::new(),
            state: State::Start,
        }
    }

    /// Number of lines read so far.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    fn emit(&mut self, qid: i64, documents: Vec<QueryDocument>) -> QueryAggregate {
        let total = documents.len();
        let aggregate = finalize(qid, documents, self.num_features, self.list_size, &mut self.rng);
        debug!(
            "query {qid}: {total} documents, kept {}",
            aggregate.num_documents
        );
        aggregate
    }

    fn fail(&mut self, error: RankDataError) -> Option<Result<QueryAggregate>> {
        self.state = State::Done;
        Some(Err(error))
    }
}

impl<R: BufRead, G: Rng> Iterator for LibSvmGenerator<R, G> {
    type Item = Result<QueryAggregate>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if matches!(self.state, State::Done) {
                return None;
            }

            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => {
                    return match mem::replace(&mut self.state, State::Done) {
                        State::Accumulating { qid, documents } => Some(Ok(self.emit(qid, documents))),
                        State::Start | State::Done => None,
                    };
                }
                Ok(_) => self.line_number += 1,
                Err(e) => return self.fail(e.into()),
            }

            if strip_comment(&self.line).trim().is_empty() {
                continue;
            }
            let (qid, document) = match parse_line(&self.line) {
                Ok(parsed) => parsed,
                Err(RankDataError::Parse(msg)) => {
                    let error = RankDataError::parse(format!("line {}: {msg}", self.line_number));
                    return self.fail(error);
                }
                Err(e) => return self.fail(e),
            };

            if let State::Accumulating { qid: current, documents } = &mut self.state {
                if *current == qid {
                    documents.push(document);
                    continue;
                }
            }
            let previous = mem::replace(
                &mut self.state,
                State::Accumulating {
                    qid,
                    documents: vec![document],
                },
            );
            if let State::Accumulating { qid, documents } = previous {
                return Some(Ok(self.emit(qid, documents)));
            }
        }
    }
}

/// A LibSVM file that can be aggregated any number of times.
///
/// ```no_run
/// use rankdata::libsvm::LibSvmDataset;
///
/// let dataset = LibSvmDataset::new("train.txt", 136, 100).with_seed(42);
/// for aggregate in dataset.generate().unwrap() {
///     let aggregate = aggregate.unwrap();
///     println!("{}: {} documents", aggregate.qid, aggregate.num_documents);
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibSvmDataset {
    path: PathBuf,
    num_features: usize,
    list_size: usize,
    seed: Option<u64>,
}

impl LibSvmDataset {
    pub fn new<P: AsRef<Path>>(path: P, num_features: usize, list_size: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            num_features,
            list_size,
            seed: None,
        }
    }

    /// Shuffle reproducibly; every `generate` restarts from `seed`.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn list_size(&self) -> usize {
        self.list_size
    }

    /// Open the file and start a fresh pass over it. The file is closed when
    /// the returned generator is dropped.
    pub fn generate(&self) -> Result<LibSvmGenerator<BufReader<File>>> {
        if self.list_size == 0 {
            return Err(RankDataError::invalid_argument("list_size must be positive"));
        }
        let file = File::open(&self.path).map_err(|e| {
            RankDataError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to open {}: {e}", self.path.display()),
            ))
        })?;
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Ok(LibSvmGenerator::new(
            BufReader::new(file),
            self.num_features,
            self.list_size,
            rng,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libsvm::PADDING_LABEL;
    use std::io::Cursor;

    fn generator(input: &str, list_size: usize) -> LibSvmGenerator<Cursor<Vec<u8>>> {
        LibSvmGenerator::new(
            Cursor::new(input.as_bytes().to_vec()),
            1,
            list_size,
            StdRng::seed_from_u64(0),
        )
    }

    #[test]
    fn test_groups_consecutive_query_ids() {
        let aggregates: Vec<QueryAggregate> = generator("1 qid:5 1:0.1\n0 qid:5 1:0.2\n2 qid:7 1:0.3\n", 3)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(aggregates.len(), 2);
        assert_eq!((aggregates[0].qid, aggregates[0].num_documents), (5, 2));
        assert_eq!((aggregates[1].qid, aggregates[1].num_documents), (7, 1));
        assert_eq!(aggregates[1].labels.to_vec(), vec![2.0, PADDING_LABEL, PADDING_LABEL]);
        assert_eq!(aggregates[1].feature("1"), Some(vec![0.3, 0.0, 0.0]));
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        assert_eq!(generator("", 2).count(), 0);
        assert_eq!(generator("\n# header\n\n", 2).count(), 0);
    }

    #[test]
    fn test_error_reports_line_and_fuses() {
        let mut generator = generator("1 qid:1 1:0.5\n\n1 qid:2 1:oops\n1 qid:3 1:0.5\n", 2);

        let first = generator.next().unwrap();
        let err = first.unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
        assert!(generator.next().is_none());
    }

    #[test]
    fn test_reappearing_qid_starts_new_group() {
        let qids: Vec<i64> = generator("1 qid:1 1:1\n1 qid:2 1:1\n1 qid:1 1:1\n", 2)
            .map(|aggregate| aggregate.unwrap().qid)
            .collect();
        assert_eq!(qids, vec![1, 2, 1]);
    }
}
