//! 索引文件读写。
//!
//! 文件布局（整数均为小端）：
//!
//! | 字段 | 编码 |
//! |------|------|
//! | magic `SEQFMIDX` | 8 字节 |
//! | version | u32 |
//! | feature_flags | u32 |
//! | [`IndexHeader`] | bincode |
//! | [`BwtBlockStore`] | bincode |
//! | [`PrefixSums`] | bincode |
//! | [`KmerSeedTable`] | bincode |
//! | 压缩 SA | 原始打包字节（长度见 header） |
//! | [`SequenceStore`] | bincode，仅当 `FEATURE_SEQUENCE_STORED` |
//!
//! 压缩 SA 以原始字节存放，便于 `keep_suffix_array_in_memory = false`
//! 时按偏移直接读取单个采样值。

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::block::BwtBlockStore;
use super::csa::{CompressedSuffixArray, SampleStorage};
use super::fm::{FMIndex, IndexMeta};
use super::prefix::PrefixSums;
use super::seed::KmerSeedTable;
use super::{FEATURE_SEQUENCE_STORED, INDEX_VERSION};
use crate::config::IndexConfiguration;
use crate::io::store::SequenceStore;
use crate::{Error, Result};

pub const MAGIC: &[u8; 8] = b"SEQFMIDX";

#[derive(Debug, Serialize, Deserialize)]
struct IndexHeader {
    config: IndexConfiguration,
    meta: IndexMeta,
    bwt_length: u64,
    suffix_array_value_bit_width: u8,
    suffix_array_len: u64,
    suffix_array_byte_len: u64,
}

impl FMIndex {
    /// 写出索引文件。目标已存在时拒绝覆盖；写入失败时删除不完整的文件。
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.exists() {
            return Err(Error::FileAlreadyExists(path.to_path_buf()));
        }
        let file = OpenOptions::new().write(true).create_new(true).open(path).map_err(|e| {
            match e.kind() {
                std::io::ErrorKind::AlreadyExists => Error::FileAlreadyExists(path.to_path_buf()),
                std::io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
                _ => Error::Io(e),
            }
        })?;

        let written = self.write_to(BufWriter::new(file));
        if written.is_err() {
            let _ = fs::remove_file(path);
        }
        let bytes = written?;
        info!(path = %path.display(), bytes, "saved FM index");
        Ok(())
    }

    fn write_to<W: Write>(&self, mut w: W) -> Result<u64> {
        let sa_bytes = self.suffix_array.packed_bytes()?;
        let header = IndexHeader {
            config: self.config,
            meta: self.meta.clone(),
            bwt_length: self.bwt_length,
            suffix_array_value_bit_width: self.suffix_array.value_bit_width(),
            suffix_array_len: self.suffix_array.len(),
            suffix_array_byte_len: sa_bytes.len() as u64,
        };

        let mut counter = CountingWriter { inner: &mut w, written: 0 };
        counter.write_all(MAGIC)?;
        counter.write_all(&self.version.to_le_bytes())?;
        counter.write_all(&self.feature_flags.to_le_bytes())?;
        bincode::serialize_into(&mut counter, &header)?;
        bincode::serialize_into(&mut counter, &self.blocks)?;
        bincode::serialize_into(&mut counter, &self.prefix_sums)?;
        bincode::serialize_into(&mut counter, &self.seed_table)?;
        counter.write_all(&sa_bytes)?;
        if let Some(store) = &self.sequence {
            bincode::serialize_into(&mut counter, store)?;
        }
        counter.flush()?;
        Ok(counter.written)
    }

    /// 读取索引文件。`keep_suffix_array_in_memory = false` 时压缩 SA 留在文件中，
    /// 定位时按需读取。
    pub fn load_from_file(path: impl AsRef<Path>, keep_suffix_array_in_memory: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::from_open(path, e))?;
        let mut r = BufReader::new(file);

        let mut magic = [0u8; 8];
        read_exact_or_format(&mut r, &mut magic)?;
        if &magic != MAGIC {
            return Err(Error::FileFormat(format!("{} is not a seqfm index", path.display())));
        }
        let mut word = [0u8; 4];
        read_exact_or_format(&mut r, &mut word)?;
        let version = u32::from_le_bytes(word);
        if version != INDEX_VERSION {
            return Err(Error::UnsupportedVersion { found: version, expected: INDEX_VERSION });
        }
        read_exact_or_format(&mut r, &mut word)?;
        let feature_flags = u32::from_le_bytes(word);

        let header: IndexHeader = bincode::deserialize_from(&mut r)?;
        header
            .config
            .validate()
            .map_err(|e| Error::FileFormat(format!("stored configuration rejected: {}", e)))?;
        let blocks: BwtBlockStore = bincode::deserialize_from(&mut r)?;
        let prefix_sums: PrefixSums = bincode::deserialize_from(&mut r)?;
        let seed_table: KmerSeedTable = bincode::deserialize_from(&mut r)?;

        let alpha = header.config.alphabet_type;
        if blocks.bwt_length() != header.bwt_length
            || !blocks.is_well_formed()
            || blocks.alphabet_is_nucleotide() != alpha.is_nucleotide()
            || !prefix_sums.is_consistent_with(header.bwt_length)
            || prefix_sums.len() != alpha.cardinality() + 2
            || seed_table.kmer_length() != header.config.kmer_length_in_seed_table as usize
            || !seed_table.is_consistent_with(alpha.cardinality(), header.bwt_length)
        {
            return Err(Error::FileFormat("index sections disagree with header".into()));
        }
        let ratio = u64::from(header.config.suffix_array_compression_ratio);
        if header.suffix_array_len != (header.bwt_length + ratio - 1) / ratio
            || header.suffix_array_byte_len
                != super::csa::packed_byte_len(header.suffix_array_len, header.suffix_array_value_bit_width)
        {
            return Err(Error::FileFormat("suffix array size disagrees with header".into()));
        }

        let sa_offset = r.stream_position()?;
        let storage = if keep_suffix_array_in_memory {
            let mut bytes = Vec::new();
            bytes.try_reserve_exact(header.suffix_array_byte_len as usize)?;
            bytes.resize(header.suffix_array_byte_len as usize, 0);
            read_exact_or_format(&mut r, &mut bytes)?;
            SampleStorage::Resident(bytes)
        } else {
            let skip = i64::try_from(header.suffix_array_byte_len)
                .map_err(|_| Error::FileFormat("suffix array too large".into()))?;
            r.seek_relative(skip)?;
            SampleStorage::OnDisk { path: path.to_path_buf(), offset: sa_offset }
        };
        let suffix_array = CompressedSuffixArray::from_parts(
            header.suffix_array_value_bit_width,
            header.config.suffix_array_compression_ratio,
            header.suffix_array_len,
            storage,
        )?;

        let sequence = if feature_flags & FEATURE_SEQUENCE_STORED != 0 {
            let store: SequenceStore = bincode::deserialize_from(&mut r)?;
            if store.len() + 1 != header.bwt_length {
                return Err(Error::FileFormat("stored sequence length disagrees with header".into()));
            }
            Some(store)
        } else {
            None
        };

        let mut config = header.config;
        config.keep_suffix_array_in_memory = keep_suffix_array_in_memory;
        debug!(
            path = %path.display(),
            bwt_length = header.bwt_length,
            sa_resident = keep_suffix_array_in_memory,
            "loaded FM index"
        );

        Ok(Self {
            version,
            feature_flags,
            config,
            meta: header.meta,
            bwt_length: header.bwt_length,
            blocks,
            prefix_sums,
            seed_table,
            suffix_array,
            sequence,
        })
    }
}

/// 构建索引并写入 destination。FASTA 路径优先于序列字节；两者皆无时报错。
/// 所有前置条件在构建前检查，失败时不会留下文件。
pub fn create_index(
    config: IndexConfiguration,
    sequence: Option<&[u8]>,
    fasta_path: Option<&Path>,
    destination: impl AsRef<Path>,
) -> Result<FMIndex> {
    config.validate()?;
    let destination = destination.as_ref();
    if destination.exists() {
        return Err(Error::FileAlreadyExists(destination.to_path_buf()));
    }
    let index = match (fasta_path, sequence) {
        (Some(fasta), _) => {
            if !fasta.exists() {
                return Err(Error::FileNotFound(fasta.to_path_buf()));
            }
            FMIndex::build_from_fasta(config, fasta)?
        }
        (None, Some(seq)) => FMIndex::build_from_sequence(config, seq)?,
        (None, None) => return Err(Error::NoDataForIndex),
    };
    index.save_to_file(destination)?;
    Ok(index)
}

fn read_exact_or_format<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<()> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => Error::FileFormat("index file is truncated".into()),
        _ => Error::Io(e),
    })
}

struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlphabetType;

    fn config() -> IndexConfiguration {
        IndexConfiguration::new(4, 3, AlphabetType::Dna, true, true)
    }

    const SEQ: &[u8] = b"TACTGTCTTATGAAGATAAGTGAGATAATCTTGACCTGTAGCACTCAGCAGCTGCTGTATTTACCAGGTACAGATAAGACAACA";

    #[test]
    fn save_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idx.fm");
        let idx = FMIndex::build_from_sequence(config(), SEQ).unwrap();
        idx.save_to_file(&path).unwrap();
        let before = fs::read(&path).unwrap();
        assert!(matches!(idx.save_to_file(&path), Err(Error::FileAlreadyExists(_))));
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn load_rejects_other_versions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idx.fm");
        FMIndex::build_from_sequence(config(), SEQ).unwrap().save_to_file(&path).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        bytes[8..12].copy_from_slice(&(INDEX_VERSION + 1).to_le_bytes());
        fs::write(&path, &bytes).unwrap();
        match FMIndex::load_from_file(&path, true) {
            Err(Error::UnsupportedVersion { found, expected }) => {
                assert_eq!(found, INDEX_VERSION + 1);
                assert_eq!(expected, INDEX_VERSION);
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn load_rejects_foreign_and_truncated_files() {
        let dir = tempfile::tempdir().unwrap();
        let foreign = dir.path().join("foreign.bin");
        fs::write(&foreign, b"not an index at all").unwrap();
        assert!(matches!(FMIndex::load_from_file(&foreign, true), Err(Error::FileFormat(_))));

        let path = dir.path().join("idx.fm");
        FMIndex::build_from_sequence(config(), SEQ).unwrap().save_to_file(&path).unwrap();
        let bytes = fs::read(&path).unwrap();
        let truncated = dir.path().join("truncated.fm");
        fs::write(&truncated, &bytes[..bytes.len() / 2]).unwrap();
        assert!(FMIndex::load_from_file(&truncated, true).is_err());
    }

    /// 在文件中找到种子表的 bincode 字节，按 patch 修改后写回。
    fn patch_seed_table(path: &Path, idx: &FMIndex, patch: impl FnOnce(&mut [u8])) {
        let table = bincode::serialize(idx.seed_table()).unwrap();
        let mut bytes = fs::read(path).unwrap();
        let at = bytes.windows(table.len()).position(|w| w == table.as_slice()).unwrap();
        patch(&mut bytes[at..at + table.len()]);
        fs::write(path, &bytes).unwrap();
    }

    #[test]
    fn load_rejects_inconsistent_seed_table() {
        let dir = tempfile::tempdir().unwrap();
        let idx = FMIndex::build_from_sequence(config(), SEQ).unwrap();

        // 布局：kmer_length u8 | cardinality u8 | 表项数 u64 | (start u64, end u64)*
        let cardinality = dir.path().join("cardinality.fm");
        idx.save_to_file(&cardinality).unwrap();
        patch_seed_table(&cardinality, &idx, |t| t[1] = 5);
        assert!(matches!(FMIndex::load_from_file(&cardinality, true), Err(Error::FileFormat(_))));

        let out_of_range = dir.path().join("range.fm");
        idx.save_to_file(&out_of_range).unwrap();
        let end = idx.bwt_length() + 400;
        patch_seed_table(&out_of_range, &idx, |t| t[18..26].copy_from_slice(&end.to_le_bytes()));
        assert!(matches!(FMIndex::load_from_file(&out_of_range, false), Err(Error::FileFormat(_))));

        // 未改动的文件照常载入
        let intact = dir.path().join("intact.fm");
        idx.save_to_file(&intact).unwrap();
        let loaded = FMIndex::load_from_file(&intact, true).unwrap();
        assert_eq!(loaded.count(b"TTT"), idx.count(b"TTT"));
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FMIndex::load_from_file(dir.path().join("nope.fm"), true).unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn create_index_checks_preconditions_first() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("idx.fm");
        assert!(matches!(create_index(config(), None, None, &dest), Err(Error::NoDataForIndex)));
        assert!(!dest.exists());

        let bad = IndexConfiguration { kmer_length_in_seed_table: 0, ..config() };
        assert!(matches!(create_index(bad, Some(SEQ), None, &dest), Err(Error::InvalidConfiguration(_))));
        assert!(!dest.exists());

        let missing = dir.path().join("missing.fa");
        assert!(matches!(
            create_index(config(), None, Some(&missing), &dest),
            Err(Error::FileNotFound(_))
        ));
        assert!(!dest.exists());

        create_index(config(), Some(SEQ), None, &dest).unwrap();
        assert!(matches!(
            create_index(config(), Some(SEQ), None, &dest),
            Err(Error::FileAlreadyExists(_))
        ));
    }

    #[test]
    fn header_fields_survive_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idx.fm");
        let idx = FMIndex::build_from_sequence(config(), SEQ).unwrap();
        idx.save_to_file(&path).unwrap();

        let loaded = FMIndex::load_from_file(&path, false).unwrap();
        assert_eq!(loaded.version(), INDEX_VERSION);
        assert_eq!(loaded.feature_flags(), idx.feature_flags());
        assert_eq!(loaded.bwt_length(), idx.bwt_length());
        assert_eq!(loaded.meta(), idx.meta());
        assert!(!loaded.config().keep_suffix_array_in_memory);
        assert!(!loaded.suffix_array().is_resident());
        assert_eq!(loaded.blocks(), idx.blocks());
        assert_eq!(loaded.seed_table(), idx.seed_table());
        assert_eq!(loaded.read_sequence_segment(10, 10).unwrap(), &SEQ[10..20]);
    }
}
