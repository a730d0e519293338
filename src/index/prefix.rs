use serde::{Deserialize, Serialize};

/// BWT 中哨兵的个数（整条序列只有一个）
pub const SENTINEL_COUNT: u64 = 1;

/// C 表：sums[c] = 非哨兵符号中编码 < c 的总数。
/// 共 cardinality + 2 项（字母、歧义符、末尾总数），末项 = bwt_length - 1。
/// 哨兵排在最前，单独加上。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixSums {
    sums: Vec<u64>,
}

impl PrefixSums {
    /// totals[c] 为编码 c 在 BWT 中的出现次数，只取前 `symbols` 项（字母与歧义符）。
    pub fn from_totals(totals: &[u64], symbols: usize) -> Self {
        let mut sums = Vec::with_capacity(symbols + 1);
        let mut acc = 0u64;
        for &count in &totals[..symbols] {
            sums.push(acc);
            acc += count;
        }
        sums.push(acc);
        Self { sums }
    }

    /// LF 映射中符号 symbol 的桶起点。
    #[inline]
    pub fn base(&self, symbol: u8) -> u64 {
        SENTINEL_COUNT + self.sums[symbol as usize]
    }

    /// 符号 symbol 在 F 列上的完整区间 [start, end)。
    #[inline]
    pub fn bucket(&self, symbol: u8) -> (u64, u64) {
        (self.base(symbol), SENTINEL_COUNT + self.sums[symbol as usize + 1])
    }

    pub fn len(&self) -> usize {
        self.sums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }

    /// 非哨兵符号总数。
    pub fn total(&self) -> u64 {
        self.sums.last().copied().unwrap_or(0)
    }

    /// 非递减，且末项 = bwt_length - 哨兵数。
    pub fn is_consistent_with(&self, bwt_length: u64) -> bool {
        self.sums.windows(2).all(|w| w[0] <= w[1]) && self.total() + SENTINEL_COUNT == bwt_length
    }
}
