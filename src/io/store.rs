use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::fasta::FastaReader;
use crate::{Error, Result};

/// One input record: its header and the exclusive end offset of its residues
/// in the concatenated sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub header: String,
    pub sequence_end: u64,
}

/// A global sequence offset resolved to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalPosition {
    pub record: usize,
    pub offset: u64,
}

/// Original residues plus record bookkeeping. Records are concatenated
/// back to back with no separator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SequenceStore {
    sequence: Vec<u8>,
    records: Vec<RecordMetadata>,
}

impl SequenceStore {
    /// A plain sequence is a single record with an empty header.
    pub fn from_sequence(sequence: &[u8]) -> Self {
        Self {
            sequence: sequence.to_vec(),
            records: vec![RecordMetadata { header: String::new(), sequence_end: sequence.len() as u64 }],
        }
    }

    pub fn from_fasta_path(path: &Path) -> Result<Self> {
        let fh = File::open(path).map_err(|e| Error::from_open(path, e))?;
        Self::from_fasta_reader(BufReader::new(fh))
    }

    pub fn from_fasta_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut store = Self::default();
        for record in FastaReader::new(reader) {
            let record = record?;
            store.sequence.try_reserve(record.seq.len())?;
            store.sequence.extend_from_slice(&record.seq);
            store.records.push(RecordMetadata {
                header: record.header,
                sequence_end: store.sequence.len() as u64,
            });
        }
        Ok(store)
    }

    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    pub fn len(&self) -> u64 {
        self.sequence.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn num_records(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[RecordMetadata] {
        &self.records
    }

    /// `length` bytes starting at `start`; the whole span must be in range.
    pub fn segment(&self, start: u64, length: u64) -> Result<&[u8]> {
        let end = start.checked_add(length).filter(|&e| e <= self.len()).ok_or_else(|| {
            Error::IllegalPosition(format!(
                "segment [{}, {}+{}) exceeds sequence length {}",
                start,
                start,
                length,
                self.len()
            ))
        })?;
        Ok(&self.sequence[start as usize..end as usize])
    }

    pub fn local_position(&self, global: u64) -> Result<LocalPosition> {
        if global >= self.len() {
            return Err(Error::IllegalPosition(format!(
                "position {} exceeds sequence length {}",
                global,
                self.len()
            )));
        }
        let record = self.records.partition_point(|r| r.sequence_end <= global);
        let start = if record == 0 { 0 } else { self.records[record - 1].sequence_end };
        Ok(LocalPosition { record, offset: global - start })
    }

    pub fn header(&self, record: usize) -> Result<&str> {
        self.records.get(record).map(|r| r.header.as_str()).ok_or_else(|| {
            Error::IllegalPosition(format!(
                "record {} out of range ({} records)",
                record,
                self.records.len()
            ))
        })
    }
}
