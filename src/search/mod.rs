//! 批量 k-mer 查询：查询列表与并行调度。

pub mod parallel;

pub use parallel::{count_batch, locate_batch};

/// 单个查询单元：查询串，以及查询后的命中位置与次数。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KmerSearchData {
    pub kmer: Vec<u8>,
    /// locate 模式下的命中位置（列表内无序）
    pub positions: Vec<u64>,
    pub count: u64,
}

impl KmerSearchData {
    pub fn new(kmer: impl Into<Vec<u8>>) -> Self {
        Self { kmer: kmer.into(), positions: Vec::new(), count: 0 }
    }

    pub(crate) fn reset(&mut self) {
        self.positions.clear();
        self.count = 0;
    }
}

/// 一批查询。先按预计数量预留容量再逐个加入，查询后原地读取结果。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KmerSearchList {
    data: Vec<KmerSearchData>,
}

impl KmerSearchList {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { data: Vec::with_capacity(capacity) }
    }

    pub fn push(&mut self, kmer: impl Into<Vec<u8>>) {
        self.data.push(KmerSearchData::new(kmer));
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&KmerSearchData> {
        self.data.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KmerSearchData> {
        self.data.iter()
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [KmerSearchData] {
        &mut self.data
    }
}

impl<K: Into<Vec<u8>>> FromIterator<K> for KmerSearchList {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self { data: iter.into_iter().map(KmerSearchData::new).collect() }
    }
}

impl<'a> IntoIterator for &'a KmerSearchList {
    type Item = &'a KmerSearchData;
    type IntoIter = std::slice::Iter<'a, KmerSearchData>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}
