//! BWT 分块存储。
//!
//! 每块覆盖 [`SYMBOLS_PER_BLOCK`] 个 BWT 位置，符号编码按位切片存放：
//! 第 p 个位平面保存块内所有符号编码的第 p 位（256 bit = 4 × u64）。
//! 块头保存“块起点之前”各符号的累计出现次数，因此一次 rank 查询只需
//! 读取一个块，再对块内等值掩码做 popcount。

use serde::{Deserialize, Serialize};

use crate::config::AlphabetType;
use crate::util::alphabet;
use crate::{Error, Result};

/// 每个位平面的 u64 字数
pub const WORDS_PER_VECTOR: usize = 4;
/// 每块容纳的符号数
pub const SYMBOLS_PER_BLOCK: usize = WORDS_PER_VECTOR * 64;

type BitVector = [u64; WORDS_PER_VECTOR];

/// 单个 BWT 块的统一接口。位平面与累计计数的具体布局由实现决定。
pub trait BwtBlock: Sized {
    fn empty() -> Self;
    fn planes(&self) -> &[BitVector];
    fn planes_mut(&mut self) -> &mut [BitVector];
    fn occurrences(&self) -> &[u64];
    fn occurrences_mut(&mut self) -> &mut [u64];

    /// 由块内符号与“块前累计计数”构造块。
    fn from_symbols(symbols: &[u8], before: &[u64]) -> Self {
        debug_assert!(symbols.len() <= SYMBOLS_PER_BLOCK);
        let mut block = Self::empty();
        block.occurrences_mut()[..before.len()].copy_from_slice(before);
        for (offset, &sym) in symbols.iter().enumerate() {
            let (word, bit) = (offset / 64, offset % 64);
            for (p, plane) in block.planes_mut().iter_mut().enumerate() {
                if (sym >> p) & 1 == 1 {
                    plane[word] |= 1u64 << bit;
                }
            }
        }
        block
    }

    /// 第 word 个字中等于 symbol 的位置掩码。
    #[inline]
    fn match_mask(&self, symbol: u8, word: usize) -> u64 {
        self.planes().iter().enumerate().fold(!0u64, |mask, (p, plane)| {
            if (symbol >> p) & 1 == 1 {
                mask & plane[word]
            } else {
                mask & !plane[word]
            }
        })
    }

    /// 全局 rank：块前累计 + 块内 [0, offset) 的出现次数。
    #[inline]
    fn rank(&self, symbol: u8, offset: usize) -> u64 {
        let mut count = self.occurrences()[symbol as usize];
        let full = offset / 64;
        for word in 0..full {
            count += u64::from(self.match_mask(symbol, word).count_ones());
        }
        let rem = offset % 64;
        if rem > 0 {
            let low = (1u64 << rem) - 1;
            count += u64::from((self.match_mask(symbol, full) & low).count_ones());
        }
        count
    }

    #[inline]
    fn symbol_at(&self, offset: usize) -> u8 {
        let (word, bit) = (offset / 64, offset % 64);
        self.planes()
            .iter()
            .enumerate()
            .fold(0u8, |sym, (p, plane)| sym | ((((plane[word] >> bit) & 1) as u8) << p))
    }
}

/// 核苷酸块：3 个位平面（A C G T、歧义符、哨兵共 6 种编码）。
/// 计数槽位 = 4 个字母 + 歧义符 + 哨兵 + 2 个对齐填充。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NucleotideBlock {
    letter_bit_vectors: [BitVector; 3],
    base_occurrences: [u64; 8],
}

/// 氨基酸块：5 个位平面（20 个字母、歧义符、哨兵共 22 种编码）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AminoBlock {
    letter_bit_vectors: [BitVector; 5],
    base_occurrences: [u64; 24],
}

macro_rules! impl_bwt_block {
    ($ty:ty, $planes:expr, $slots:expr) => {
        impl BwtBlock for $ty {
            fn empty() -> Self {
                Self {
                    letter_bit_vectors: [[0u64; WORDS_PER_VECTOR]; $planes],
                    base_occurrences: [0u64; $slots],
                }
            }
            fn planes(&self) -> &[BitVector] {
                &self.letter_bit_vectors
            }
            fn planes_mut(&mut self) -> &mut [BitVector] {
                &mut self.letter_bit_vectors
            }
            fn occurrences(&self) -> &[u64] {
                &self.base_occurrences
            }
            fn occurrences_mut(&mut self) -> &mut [u64] {
                &mut self.base_occurrences
            }
        }
    };
}

impl_bwt_block!(NucleotideBlock, 3, 8);
impl_bwt_block!(AminoBlock, 5, 24);

/// 同一布局的块序列。块数 = bwt_length / SYMBOLS_PER_BLOCK + 1，
/// 保证 position == bwt_length 时也落在某个块内。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockList<B> {
    blocks: Vec<B>,
    bwt_length: u64,
}

impl<B: BwtBlock> BlockList<B> {
    fn build(bwt: &[u8], slots: usize) -> Result<Self> {
        let n = bwt.len();
        let num_blocks = n / SYMBOLS_PER_BLOCK + 1;
        let mut blocks = Vec::new();
        blocks.try_reserve_exact(num_blocks)?;

        let mut running = vec![0u64; slots];
        for bi in 0..num_blocks {
            let start = bi * SYMBOLS_PER_BLOCK;
            let end = ((bi + 1) * SYMBOLS_PER_BLOCK).min(n);
            let chunk = &bwt[start..end];
            blocks.push(B::from_symbols(chunk, &running));
            for &ch in chunk {
                running[ch as usize] += 1;
            }
        }
        Ok(Self { blocks, bwt_length: n as u64 })
    }

    #[inline]
    fn rank(&self, symbol: u8, position: u64) -> u64 {
        let p = position as usize;
        self.blocks[p / SYMBOLS_PER_BLOCK].rank(symbol, p % SYMBOLS_PER_BLOCK)
    }

    #[inline]
    fn symbol_at(&self, position: u64) -> u8 {
        let p = position as usize;
        self.blocks[p / SYMBOLS_PER_BLOCK].symbol_at(p % SYMBOLS_PER_BLOCK)
    }
}

/// BWT 分块存储，按字母表类型选定块布局。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BwtBlockStore {
    Nucleotide(BlockList<NucleotideBlock>),
    Amino(BlockList<AminoBlock>),
}

impl BwtBlockStore {
    /// 由编码后的 BWT 构建分块存储，O(n)。
    pub fn build(alphabet_type: AlphabetType, bwt: &[u8]) -> Result<Self> {
        let slots = alphabet::sentinel_code(alphabet_type) as usize + 1;
        if alphabet_type.is_nucleotide() {
            Ok(BwtBlockStore::Nucleotide(BlockList::build(bwt, slots)?))
        } else {
            Ok(BwtBlockStore::Amino(BlockList::build(bwt, slots)?))
        }
    }

    pub fn alphabet_is_nucleotide(&self) -> bool {
        matches!(self, BwtBlockStore::Nucleotide(_))
    }

    #[inline]
    pub fn bwt_length(&self) -> u64 {
        match self {
            BwtBlockStore::Nucleotide(list) => list.bwt_length,
            BwtBlockStore::Amino(list) => list.bwt_length,
        }
    }

    pub fn num_blocks(&self) -> usize {
        match self {
            BwtBlockStore::Nucleotide(list) => list.blocks.len(),
            BwtBlockStore::Amino(list) => list.blocks.len(),
        }
    }

    /// 块数与 bwt_length 相符（载入时校验）。
    pub(crate) fn is_well_formed(&self) -> bool {
        self.num_blocks() as u64 == self.bwt_length() / SYMBOLS_PER_BLOCK as u64 + 1
    }

    fn symbol_slots(&self) -> u8 {
        match self {
            BwtBlockStore::Nucleotide(_) => 6,
            BwtBlockStore::Amino(_) => 22,
        }
    }

    /// BWT[0..position) 中 symbol 的出现次数；调用方保证 position <= bwt_length。
    #[inline]
    pub(crate) fn occ(&self, symbol: u8, position: u64) -> u64 {
        match self {
            BwtBlockStore::Nucleotide(list) => list.rank(symbol, position),
            BwtBlockStore::Amino(list) => list.rank(symbol, position),
        }
    }

    #[inline]
    pub(crate) fn symbol_at_unchecked(&self, position: u64) -> u8 {
        match self {
            BwtBlockStore::Nucleotide(list) => list.symbol_at(position),
            BwtBlockStore::Amino(list) => list.symbol_at(position),
        }
    }

    /// rank 查询：BWT[0..position) 中 symbol 的出现次数。
    /// 字母表之外的编码出现次数为 0。
    pub fn rank(&self, symbol: u8, position: u64) -> Result<u64> {
        if position > self.bwt_length() {
            return Err(Error::IllegalPosition(format!(
                "rank position {} exceeds BWT length {}",
                position,
                self.bwt_length()
            )));
        }
        if symbol >= self.symbol_slots() {
            return Ok(0);
        }
        Ok(self.occ(symbol, position))
    }

    /// BWT[position] 的符号编码。
    pub fn symbol_at(&self, position: u64) -> Result<u8> {
        if position >= self.bwt_length() {
            return Err(Error::IllegalPosition(format!(
                "BWT position {} out of range (length {})",
                position,
                self.bwt_length()
            )));
        }
        Ok(self.symbol_at_unchecked(position))
    }

    /// 整个 BWT 中各编码的出现次数（下标为编码，含歧义符与哨兵）。
    pub fn totals(&self) -> Vec<u64> {
        let n = self.bwt_length();
        (0..self.symbol_slots()).map(|s| self.occ(s, n)).collect()
    }
}
