use serde::{Deserialize, Serialize};

use super::search::{BackwardSearcher, SearchRange};
use crate::Result;

/// k-mer 种子表：预先保存所有长度为 k 的 k-mer 的 SA 区间，
/// 查询时直接跳过最后 k 步反向搜索。
///
/// 键为 k-mer 的编码按字典序展开的整数：key = Σ q[i] · σ^(k-1-i)。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KmerSeedTable {
    kmer_length: u8,
    cardinality: u8,
    ranges: Vec<SearchRange>,
}

impl KmerSeedTable {
    /// 对所有 σ^k 个 k-mer 从完整区间出发做反向搜索并记录结果。
    /// 共享后缀的 k-mer 共用前几步的结果；区间一旦为空，
    /// 整棵子树直接填入该空区间（空区间在后续步骤中保持不变）。
    pub(crate) fn build(searcher: &BackwardSearcher<'_>, kmer_length: u8, cardinality: usize) -> Result<Self> {
        let entries = cardinality.pow(kmer_length as u32);
        let mut ranges = Vec::new();
        ranges.try_reserve_exact(entries)?;
        ranges.resize(entries, SearchRange::default());

        let mut table = Self { kmer_length, cardinality: cardinality as u8, ranges };
        table.fill(searcher, searcher.full_range(), 0, 1, 0);
        Ok(table)
    }

    fn fill(
        &mut self,
        searcher: &BackwardSearcher<'_>,
        range: SearchRange,
        key: usize,
        weight: usize,
        depth: u8,
    ) {
        if depth == self.kmer_length {
            self.ranges[key] = range;
            return;
        }
        let sigma = self.cardinality as usize;
        for s in 0..self.cardinality {
            let next = searcher.step(range, s);
            let next_key = key + s as usize * weight;
            if next.is_empty() {
                // 剩余高位任意取值
                let stride = weight * sigma;
                let remaining = sigma.pow(u32::from(self.kmer_length - depth - 1));
                for j in 0..remaining {
                    self.ranges[next_key + j * stride] = next;
                }
            } else {
                self.fill(searcher, next, next_key, weight * sigma, depth + 1);
            }
        }
    }

    #[inline]
    pub fn kmer_length(&self) -> usize {
        self.kmer_length as usize
    }

    #[inline]
    pub fn cardinality(&self) -> usize {
        self.cardinality as usize
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// 表项数为 cardinality^k，且每个区间都落在 [0, bwt_length] 内。
    pub(crate) fn is_consistent_with(&self, cardinality: usize, bwt_length: u64) -> bool {
        let expected = cardinality.checked_pow(self.kmer_length as u32);
        self.cardinality() == cardinality
            && expected == Some(self.ranges.len())
            && self.ranges.iter().all(|r| r.start <= r.end && r.end <= bwt_length)
    }

    /// 长度为 k 的字母编码序列对应的表键。
    #[inline]
    pub fn key(&self, codes: &[u8]) -> usize {
        debug_assert_eq!(codes.len(), self.kmer_length());
        let sigma = self.cardinality as usize;
        codes.iter().fold(0usize, |key, &c| key * sigma + c as usize)
    }

    /// O(1) 查表；codes 长度必须为 k 且均为字母。
    #[inline]
    pub fn lookup(&self, codes: &[u8]) -> SearchRange {
        self.ranges[self.key(codes)]
    }
}
