//! TFRecord container files.
//!
//! Each record is framed as
//!
//! ```text
//! u64 length (little-endian)
//! u32 masked crc32c of the length bytes
//! [u8; length] data
//! u32 masked crc32c of the data
//! ```

use std::fs::File;
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{RankDataError, Result};
use crate::pipeline::source::{RecordIter, RecordSource};

const MASK_DELTA: u32 = 0xa282_ead8;
const HEADER_LEN: usize = 12;

/// The checksum stored in TFRecord framing.
pub fn masked_crc32c(data: &[u8]) -> u32 {
    let crc = crc32c::crc32c(data);
    crc.rotate_right(15).wrapping_add(MASK_DELTA)
}

/// Writes framed records.
#[derive(Debug)]
pub struct TfRecordWriter<W: Write> {
    writer: W,
    records_written: u64,
}

impl<W: Write> TfRecordWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            records_written: 0,
        }
    }

    pub fn write_record(&mut self, data: &[u8]) -> Result<()> {
        let mut length = [0u8; 8];
        LittleEndian::write_u64(&mut length, data.len() as u64);
        self.writer.write_all(&length)?;
        self.writer.write_u32::<LittleEndian>(masked_crc32c(&length))?;
        self.writer.write_all(data)?;
        self.writer.write_u32::<LittleEndian>(masked_crc32c(data))?;
        self.records_written += 1;
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl TfRecordWriter<BufWriter<File>> {
    /// Create (or truncate) a TFRecord file.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

/// Reads framed records, checking both checksums.
///
/// A clean end of input between records ends the iteration. A truncated
/// or corrupt record yields one `Decode` error, after which the reader
/// yields nothing.
#[derive(Debug)]
pub struct TfRecordReader<R: Read> {
    reader: R,
    name: String,
    records_read: u64,
    failed: bool,
}

impl<R: Read> TfRecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            name: "tfrecord".to_string(),
            records_read: 0,
            failed: false,
        }
    }

    /// Prefix error messages with `name`, usually the file path.
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    fn corrupt(&self, what: &str) -> RankDataError {
        RankDataError::decode(format!("{}: record {}: {what}", self.name, self.records_read))
    }

    fn read_record(&mut self) -> Result<Option<Vec<u8>>> {
        let mut header = [0u8; HEADER_LEN];
        let filled = read_full(&mut self.reader, &mut header)?;
        if filled == 0 {
            return Ok(None);
        }
        if filled < HEADER_LEN {
            return Err(self.corrupt("truncated header"));
        }
        if LittleEndian::read_u32(&header[8..]) != masked_crc32c(&header[..8]) {
            return Err(self.corrupt("length checksum mismatch"));
        }
        let length = usize::try_from(LittleEndian::read_u64(&header[..8]))
            .map_err(|_| self.corrupt("length does not fit in memory"))?;

        let mut data = vec![0u8; length];
        let truncated = |e: io::Error, reader: &Self| match e.kind() {
            ErrorKind::UnexpectedEof => reader.corrupt("truncated data"),
            _ => RankDataError::Io(e),
        };
        self.reader.read_exact(&mut data).map_err(|e| truncated(e, self))?;
        let crc = self
            .reader
            .read_u32::<LittleEndian>()
            .map_err(|e| truncated(e, self))?;
        if crc != masked_crc32c(&data) {
            return Err(self.corrupt("data checksum mismatch"));
        }
        self.records_read += 1;
        Ok(Some(data))
    }
}

impl<R: Read> Iterator for TfRecordReader<R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_record() {
            Ok(record) => record.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Fill `buf` as far as the input allows; returns the bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// One TFRecord file. Every `open` reads it from the start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TfRecordSource {
    path: PathBuf,
}

impl TfRecordSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for TfRecordSource {
    fn open(&self) -> Result<RecordIter> {
        let file = File::open(&self.path).map_err(|e| {
            RankDataError::Io(io::Error::new(
                e.kind(),
                format!("failed to open {}: {e}", self.path.display()),
            ))
        })?;
        let reader = TfRecordReader::new(BufReader::new(file)).with_name(self.path.display().to_string());
        Ok(Box::new(reader))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn framed(records: &[&[u8]]) -> Vec<u8> {
        let mut writer = TfRecordWriter::new(Vec::new());
        for record in records {
            writer.write_record(record).unwrap();
        }
        assert_eq!(writer.records_written(), records.len() as u64);
        writer.finish().unwrap()
    }

    #[test]
    fn test_masked_crc_of_empty_input() {
        // crc32c("") is 0, so only the mask delta remains.
        assert_eq!(masked_crc32c(b""), MASK_DELTA);
    }

    #[test]
    fn test_framing_layout() {
        let bytes = framed(&[b"abc"]);
        assert_eq!(bytes.len(), HEADER_LEN + 3 + 4);
        assert_eq!(LittleEndian::read_u64(&bytes[..8]), 3);
        assert_eq!(&bytes[HEADER_LEN..HEADER_LEN + 3], b"abc");
    }

    #[test]
    fn test_reader_returns_records_in_order() {
        let bytes = framed(&[b"first", b"", b"third"]);
        let mut reader = TfRecordReader::new(Cursor::new(bytes));
        let records: Vec<Vec<u8>> = reader.by_ref().collect::<Result<_>>().unwrap();
        assert_eq!(records, vec![b"first".to_vec(), Vec::new(), b"third".to_vec()]);
        assert_eq!(reader.records_read(), 3);
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        assert_eq!(TfRecordReader::new(Cursor::new(Vec::new())).count(), 0);
    }

    #[test]
    fn test_corrupt_data_is_fatal() {
        let mut bytes = framed(&[b"first", b"second"]);
        // Flip a byte inside the first record's payload.
        bytes[HEADER_LEN] ^= 0xff;
        let results: Vec<_> = TfRecordReader::new(Cursor::new(bytes)).with_name("train.tfrecord").collect();
        assert_eq!(results.len(), 1);
        match &results[0] {
            Err(RankDataError::Decode(msg)) => {
                assert!(msg.contains("train.tfrecord: record 0"), "{msg}");
                assert!(msg.contains("data checksum"), "{msg}");
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_truncated_record_is_fatal() {
        let mut bytes = framed(&[b"first", b"second"]);
        bytes.truncate(bytes.len() - 2);
        let results: Vec<_> = TfRecordReader::new(Cursor::new(bytes)).collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap(), b"first");
        assert!(matches!(&results[1], Err(RankDataError::Decode(msg)) if msg.contains("truncated")));
    }

    #[test]
    fn test_file_source_reopens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("part-0.tfrecord");
        let mut writer = TfRecordWriter::create(&path).unwrap();
        writer.write_record(b"a").unwrap();
        writer.write_record(b"b").unwrap();
        writer.finish().unwrap();

        let source = TfRecordSource::new(&path);
        for _ in 0..2 {
            let records: Vec<Vec<u8>> = source.open().unwrap().collect::<Result<_>>().unwrap();
            assert_eq!(records, vec![b"a".to_vec(), b"b".to_vec()]);
        }
    }

    #[test]
    fn test_missing_file() {
        let source = TfRecordSource::new("/nonexistent/part-0.tfrecord");
        assert!(matches!(source.open(), Err(RankDataError::Io(_))));
    }
}
