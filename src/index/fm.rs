use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::block::BwtBlockStore;
use super::csa::{CompressedSuffixArray, SampleReader};
use super::prefix::PrefixSums;
use super::sa;
use super::search::{BackwardSearcher, SearchRange};
use super::seed::KmerSeedTable;
use super::{bwt, FEATURE_FROM_FASTA, FEATURE_SEQUENCE_STORED, INDEX_VERSION};
use crate::config::IndexConfiguration;
use crate::io::store::{LocalPosition, SequenceStore};
use crate::util::alphabet;
use crate::{Error, Result};

/// 构建信息，随索引一起保存。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub reference_file: Option<String>,
    pub build_timestamp: Option<String>,
}

/// FM 索引：
/// - BWT 分块存储 + C 表支持 O(1) 块访问的 rank 查询；
/// - k-mer 种子表跳过查询末尾 k 步反向搜索；
/// - 稀疏采样 SA，未采样行经 LF 回溯定位；
/// - 可选保存原始序列与 FASTA 记录信息。
///
/// 建成（或载入）后只读，可在线程间共享引用并发查询。
#[derive(Debug)]
pub struct FMIndex {
    pub(crate) version: u32,
    pub(crate) feature_flags: u32,
    pub(crate) config: IndexConfiguration,
    pub(crate) meta: IndexMeta,
    pub(crate) bwt_length: u64,
    pub(crate) blocks: BwtBlockStore,
    pub(crate) prefix_sums: PrefixSums,
    pub(crate) seed_table: KmerSeedTable,
    pub(crate) suffix_array: CompressedSuffixArray,
    pub(crate) sequence: Option<SequenceStore>,
}

impl FMIndex {
    /// 由原始序列字节构建索引（单条记录，无 header）。
    pub fn build_from_sequence(config: IndexConfiguration, sequence: &[u8]) -> Result<Self> {
        config.validate()?;
        Self::build(config, SequenceStore::from_sequence(sequence), 0, IndexMeta::default())
    }

    /// 由 FASTA 文件构建索引；各记录首尾相接，header 与偏移由 SequenceStore 记录。
    pub fn build_from_fasta(config: IndexConfiguration, fasta_path: impl AsRef<Path>) -> Result<Self> {
        config.validate()?;
        let path = fasta_path.as_ref();
        let store = SequenceStore::from_fasta_path(path)?;
        info!(records = store.num_records(), residues = store.len(), "read FASTA {}", path.display());
        let meta = IndexMeta { reference_file: Some(path.display().to_string()), ..Default::default() };
        Self::build(config, store, FEATURE_FROM_FASTA, meta)
    }

    fn build(config: IndexConfiguration, store: SequenceStore, flags: u32, mut meta: IndexMeta) -> Result<Self> {
        if store.is_empty() {
            return Err(Error::NoDataForIndex);
        }
        let alpha = config.alphabet_type;
        let cardinality = alpha.cardinality();

        // 编码并追加哨兵
        let mut text = Vec::new();
        text.try_reserve_exact(store.sequence().len() + 1)?;
        text.extend(store.sequence().iter().map(|&b| alphabet::encode(alpha, b)));
        text.push(alphabet::sentinel_code(alpha));

        // SA -> BWT -> 分块
        let keys: Vec<u8> = text.iter().map(|&c| alphabet::sort_key(alpha, c)).collect();
        let sa_arr = sa::build_sa(&keys);
        drop(keys);
        let (bwt_arr, _) = bwt::build_bwt(&text, &sa_arr);
        drop(text);

        let blocks = BwtBlockStore::build(alpha, &bwt_arr)?;
        drop(bwt_arr);
        let prefix_sums = PrefixSums::from_totals(&blocks.totals(), cardinality + 1);
        let bwt_length = blocks.bwt_length();
        debug_assert!(prefix_sums.is_consistent_with(bwt_length));

        let suffix_array = CompressedSuffixArray::build(&sa_arr, config.suffix_array_compression_ratio)?;
        drop(sa_arr);

        let seed_table = {
            let searcher = BackwardSearcher::new(&blocks, &prefix_sums, cardinality);
            KmerSeedTable::build(&searcher, config.kmer_length_in_seed_table, cardinality)?
        };

        info!(
            bwt_length,
            blocks = blocks.num_blocks(),
            seed_entries = seed_table.len(),
            sa_samples = suffix_array.len(),
            sa_bit_width = suffix_array.value_bit_width(),
            "built FM index"
        );

        let (sequence, flags) = if config.store_original_sequence {
            (Some(store), flags | FEATURE_SEQUENCE_STORED)
        } else {
            (None, flags)
        };
        meta.build_timestamp = Some(chrono::Utc::now().to_rfc3339());

        Ok(Self {
            version: INDEX_VERSION,
            feature_flags: flags,
            config,
            meta,
            bwt_length,
            blocks,
            prefix_sums,
            seed_table,
            suffix_array,
            sequence,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn feature_flags(&self) -> u32 {
        self.feature_flags
    }

    pub fn config(&self) -> &IndexConfiguration {
        &self.config
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    /// BWT 长度 = 序列长度 + 1（哨兵）。
    pub fn bwt_length(&self) -> u64 {
        self.bwt_length
    }

    pub fn blocks(&self) -> &BwtBlockStore {
        &self.blocks
    }

    pub fn prefix_sums(&self) -> &PrefixSums {
        &self.prefix_sums
    }

    pub fn seed_table(&self) -> &KmerSeedTable {
        &self.seed_table
    }

    pub fn suffix_array(&self) -> &CompressedSuffixArray {
        &self.suffix_array
    }

    pub fn sequence_store(&self) -> Option<&SequenceStore> {
        self.sequence.as_ref()
    }

    #[inline]
    pub(crate) fn searcher(&self) -> BackwardSearcher<'_> {
        BackwardSearcher::new(&self.blocks, &self.prefix_sums, self.config.alphabet_type.cardinality())
    }

    /// 单字符的初始区间；非字母字符得到空区间。
    pub fn initial_range_for_char(&self, ch: u8) -> SearchRange {
        let code = alphabet::encode(self.config.alphabet_type, ch);
        self.searcher().range_for_symbol(code)
    }

    /// 查询末尾部分的初始区间：长度 >= k 时取末尾 k-mer 的种子表区间，
    /// 否则取最后一个字符的区间。空查询或含非字母字符时得到空区间。
    pub fn initial_range(&self, query: &[u8]) -> SearchRange {
        match alphabet::encode_query(self.config.alphabet_type, query) {
            Some(codes) if !codes.is_empty() => self.seeded_range(&codes).0,
            _ => SearchRange::default(),
        }
    }

    /// 返回种子区间以及尚未处理的查询前缀。
    fn seeded_range<'q>(&self, codes: &'q [u8]) -> (SearchRange, &'q [u8]) {
        let k = self.seed_table.kmer_length();
        if codes.len() >= k {
            let split = codes.len() - k;
            (self.seed_table.lookup(&codes[split..]), &codes[..split])
        } else {
            let split = codes.len() - 1;
            (self.searcher().range_for_symbol(codes[split]), &codes[..split])
        }
    }

    /// 反向搜索一步：在 range 前追加字符 ch。
    /// range 的端点超出 bwt_length 时报 IllegalPosition。
    pub fn step(&self, range: SearchRange, ch: u8) -> Result<SearchRange> {
        if range.start > self.bwt_length || range.end > self.bwt_length {
            return Err(Error::IllegalPosition(format!(
                "search range [{}, {}) exceeds BWT length {}",
                range.start, range.end, self.bwt_length
            )));
        }
        let code = alphabet::encode(self.config.alphabet_type, ch);
        Ok(self.searcher().step(range, code))
    }

    /// 查询串的 SA 区间（可能为空）。
    pub fn find_search_range(&self, query: &[u8]) -> SearchRange {
        let Some(codes) = alphabet::encode_query(self.config.alphabet_type, query) else {
            return SearchRange::default();
        };
        if codes.is_empty() {
            return SearchRange::default();
        }
        let (range, rest) = self.seeded_range(&codes);
        self.searcher().extend(range, rest)
    }

    /// 查询串的 SA 区间，无匹配时返回 None。
    pub fn search_range_for_string(&self, query: &[u8]) -> Option<SearchRange> {
        let range = self.find_search_range(query);
        (!range.is_empty()).then_some(range)
    }

    /// 出现次数。
    pub fn count(&self, query: &[u8]) -> u64 {
        self.find_search_range(query).len()
    }

    /// LF 回溯一步：返回 BWT[position] 的字符及前一个字符所在行；哨兵行返回 None。
    pub fn backtrace(&self, position: u64) -> Result<Option<(u8, u64)>> {
        self.check_row(position)?;
        Ok(self
            .searcher()
            .lf(position)
            .map(|(code, prev)| (alphabet::decode(self.config.alphabet_type, code), prev)))
    }

    fn check_row(&self, position: u64) -> Result<()> {
        if position >= self.bwt_length {
            return Err(Error::IllegalPosition(format!(
                "BWT position {} out of range (length {})",
                position, self.bwt_length
            )));
        }
        Ok(())
    }

    /// 单个 BWT 行对应的原序列位置。
    pub fn locate(&self, bwt_position: u64) -> Result<u64> {
        let mut reader = self.suffix_array.reader()?;
        self.locate_with(&self.searcher(), &mut reader, bwt_position)
    }

    /// 区间内所有行对应的原序列位置（顺序与行号一致）。
    /// 磁盘模式下整个区间共用一个文件句柄，返回时释放。
    pub fn locate_range(&self, range: SearchRange) -> Result<Vec<u64>> {
        let mut positions = Vec::new();
        positions.try_reserve_exact(range.len() as usize)?;
        if range.is_empty() {
            return Ok(positions);
        }
        let searcher = self.searcher();
        let mut reader = self.suffix_array.reader()?;
        for row in range.rows() {
            positions.push(self.locate_with(&searcher, &mut reader, row)?);
        }
        Ok(positions)
    }

    fn locate_with(
        &self,
        searcher: &BackwardSearcher<'_>,
        reader: &mut SampleReader<'_>,
        bwt_position: u64,
    ) -> Result<u64> {
        self.check_row(bwt_position)?;
        // 采样按 BWT 行号而非文本位置，回溯步数不以 ratio 为上界；
        // 最多 n 步必到达采样行或哨兵行。
        let mut row = bwt_position;
        let mut steps = 0u64;
        loop {
            if let Some(slot) = self.suffix_array.sampled_slot(row) {
                return Ok((reader.value(slot)? + steps) % self.bwt_length);
            }
            match searcher.lf(row) {
                Some((_, prev)) => {
                    row = prev;
                    steps += 1;
                }
                // 哨兵行的 SA 值为 0
                None => return Ok(steps % self.bwt_length),
            }
        }
    }

    fn store(&self) -> Result<&SequenceStore> {
        self.sequence.as_ref().ok_or(Error::SequenceNotStored)
    }

    /// 读取原序列 [start, start + length)。要求构建时保存了原序列。
    pub fn read_sequence_segment(&self, start: u64, length: u64) -> Result<Vec<u8>> {
        let segment = self.store()?.segment(start, length)?;
        debug!(start, length, "read sequence segment");
        Ok(segment.to_vec())
    }

    pub fn num_sequences(&self) -> Result<usize> {
        Ok(self.store()?.num_records())
    }

    /// 全局位置 -> (记录号, 记录内偏移)。
    pub fn local_position(&self, global: u64) -> Result<LocalPosition> {
        self.store()?.local_position(global)
    }

    pub fn header(&self, record: usize) -> Result<&str> {
        self.store()?.header(record)
    }
}
