use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// 种子表项数上限（cardinality^k），超过即视为配置错误。
pub const MAX_SEED_TABLE_ENTRIES: u64 = 1 << 28;

/// 序列字母表类型。数值标签与原始索引格式保持一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[repr(u8)]
pub enum AlphabetType {
    /// 20 种氨基酸
    Amino = 1,
    /// DNA：A C G T
    Dna = 2,
    /// RNA：A C G U（与 DNA 共用同一核苷酸编码）
    Rna = 3,
}

impl AlphabetType {
    /// 字母数（不含歧义符与哨兵）。
    #[inline]
    pub fn cardinality(self) -> usize {
        match self {
            AlphabetType::Amino => 20,
            AlphabetType::Dna | AlphabetType::Rna => 4,
        }
    }

    #[inline]
    pub fn is_nucleotide(self) -> bool {
        !matches!(self, AlphabetType::Amino)
    }
}

/// 索引构建参数。索引建成后不可修改。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfiguration {
    /// SA 采样间隔（每 ratio 个 BWT 位置保留一个 SA 值）
    pub suffix_array_compression_ratio: u8,
    /// 种子表中 k-mer 的长度
    pub kmer_length_in_seed_table: u8,
    pub alphabet_type: AlphabetType,
    /// 载入时是否将压缩 SA 常驻内存；否则按需从索引文件读取
    pub keep_suffix_array_in_memory: bool,
    /// 是否在索引文件中保存原始序列（及 FASTA 记录信息）
    pub store_original_sequence: bool,
}

impl IndexConfiguration {
    pub fn new(
        suffix_array_compression_ratio: u8,
        kmer_length_in_seed_table: u8,
        alphabet_type: AlphabetType,
        keep_suffix_array_in_memory: bool,
        store_original_sequence: bool,
    ) -> Self {
        Self {
            suffix_array_compression_ratio,
            kmer_length_in_seed_table,
            alphabet_type,
            keep_suffix_array_in_memory,
            store_original_sequence,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.suffix_array_compression_ratio == 0 {
            return Err(Error::InvalidConfiguration(
                "suffix array compression ratio must be at least 1".into(),
            ));
        }
        if self.kmer_length_in_seed_table == 0 {
            return Err(Error::InvalidConfiguration(
                "seed table k-mer length must be at least 1".into(),
            ));
        }
        let entries = seed_table_entries(self.alphabet_type, self.kmer_length_in_seed_table);
        match entries {
            Some(n) if n <= MAX_SEED_TABLE_ENTRIES => Ok(()),
            _ => Err(Error::InvalidConfiguration(format!(
                "seed table for k={} over a {}-letter alphabet exceeds {} entries",
                self.kmer_length_in_seed_table,
                self.alphabet_type.cardinality(),
                MAX_SEED_TABLE_ENTRIES
            ))),
        }
    }
}

impl Default for IndexConfiguration {
    fn default() -> Self {
        Self {
            suffix_array_compression_ratio: 8,
            kmer_length_in_seed_table: 8,
            alphabet_type: AlphabetType::Dna,
            keep_suffix_array_in_memory: true,
            store_original_sequence: true,
        }
    }
}

/// cardinality^k，溢出时返回 None。
pub fn seed_table_entries(alphabet: AlphabetType, k: u8) -> Option<u64> {
    (alphabet.cardinality() as u64).checked_pow(k as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(IndexConfiguration::default().validate().is_ok());
    }

    #[test]
    fn zero_ratio_is_rejected() {
        let cfg = IndexConfiguration { suffix_array_compression_ratio: 0, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn zero_kmer_length_is_rejected() {
        let cfg = IndexConfiguration { kmer_length_in_seed_table: 0, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn oversized_seed_table_is_rejected() {
        // 4^14 = 2^28 刚好允许，20^7 > 2^28
        let dna = IndexConfiguration { kmer_length_in_seed_table: 14, ..Default::default() };
        assert!(dna.validate().is_ok());
        let amino = IndexConfiguration {
            kmer_length_in_seed_table: 7,
            alphabet_type: AlphabetType::Amino,
            ..Default::default()
        };
        assert!(matches!(amino.validate(), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn alphabet_tags_match_file_format() {
        assert_eq!(AlphabetType::Amino as u8, 1);
        assert_eq!(AlphabetType::Dna as u8, 2);
        assert_eq!(AlphabetType::Rna as u8, 3);
    }
}
