use serde::{Deserialize, Serialize};

use super::block::BwtBlockStore;
use super::prefix::PrefixSums;

/// BWT / SA 上的半开区间 [start, end)。start >= end 表示无匹配。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SearchRange {
    pub start: u64,
    pub end: u64,
}

impl SearchRange {
    #[inline]
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn full(bwt_length: u64) -> Self {
        Self { start: 0, end: bwt_length }
    }

    /// 区间长度，即匹配次数。
    #[inline]
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn rows(&self) -> std::ops::Range<u64> {
        self.start..self.end.max(self.start)
    }
}

/// 反向搜索引擎：基于分块 BWT 与 C 表的区间收缩与 LF 映射。
#[derive(Clone, Copy)]
pub struct BackwardSearcher<'a> {
    blocks: &'a BwtBlockStore,
    prefix_sums: &'a PrefixSums,
    cardinality: u8,
}

impl<'a> BackwardSearcher<'a> {
    pub(crate) fn new(blocks: &'a BwtBlockStore, prefix_sums: &'a PrefixSums, cardinality: usize) -> Self {
        Self { blocks, prefix_sums, cardinality: cardinality as u8 }
    }

    #[inline]
    pub fn bwt_length(&self) -> u64 {
        self.blocks.bwt_length()
    }

    #[inline]
    pub fn full_range(&self) -> SearchRange {
        SearchRange::full(self.bwt_length())
    }

    /// 单个字母的初始区间，等价于从完整区间出发走一步。
    pub fn range_for_symbol(&self, symbol: u8) -> SearchRange {
        if symbol >= self.cardinality {
            return SearchRange::default();
        }
        let (start, end) = self.prefix_sums.bucket(symbol);
        SearchRange::new(start, end)
    }

    /// 在区间前方追加字母 symbol：
    /// lo' = C[s] + Occ(s, lo)，hi' = C[s] + Occ(s, hi)。
    /// 空区间保持不变；非字母编码直接得到空区间。
    /// 调用方保证区间端点不超过 bwt_length。
    #[inline]
    pub(crate) fn step(&self, range: SearchRange, symbol: u8) -> SearchRange {
        if range.is_empty() {
            return range;
        }
        if symbol >= self.cardinality {
            return SearchRange::new(range.start, range.start);
        }
        let base = self.prefix_sums.base(symbol);
        SearchRange::new(
            base + self.blocks.occ(symbol, range.start),
            base + self.blocks.occ(symbol, range.end),
        )
    }

    /// 从 range 出发，按从右到左的顺序依次追加 codes 中的字母。
    pub(crate) fn extend(&self, mut range: SearchRange, codes: &[u8]) -> SearchRange {
        for &a in codes.iter().rev() {
            range = self.step(range, a);
            if range.is_empty() {
                break;
            }
        }
        range
    }

    /// LF 映射：返回 BWT[position] 及其在原序列中前一个字符所在的行。
    /// position 为哨兵行（SA 值为 0）时返回 None。
    /// 调用方保证 position < bwt_length。
    #[inline]
    pub(crate) fn lf(&self, position: u64) -> Option<(u8, u64)> {
        let symbol = self.blocks.symbol_at_unchecked(position);
        if symbol > self.cardinality {
            return None;
        }
        Some((symbol, self.prefix_sums.base(symbol) + self.blocks.occ(symbol, position)))
    }
}
