use rayon::prelude::*;
use tracing::{debug, warn};

use super::{KmerSearchData, KmerSearchList};
use crate::index::FMIndex;
use crate::Result;

/// 在独立的 rayon 线程池中执行 op，返回前所有任务均已结束。
/// 线程池创建失败时退回当前线程执行。
fn with_pool<R, F>(threads: usize, op: F) -> R
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    let threads = threads.max(1);
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(op),
        Err(e) => {
            warn!("cannot start {} search threads ({}), running on the calling thread", threads, e);
            op()
        }
    }
}

/// 并行定位：每个查询先反向搜索得到区间，再逐行解析 SA 得到命中位置。
/// 成功时每个查询的位置数恰为区间长度；无匹配的查询计数为 0、位置为空。
///
/// 出错时整批结果不可用。
pub fn locate_batch(index: &FMIndex, list: &mut KmerSearchList, threads: usize) -> Result<()> {
    debug!(queries = list.len(), threads, "locate batch");
    with_pool(threads, || {
        list.as_mut_slice()
            .par_iter_mut()
            .try_for_each(|data| locate_one(index, data))
    })
}

fn locate_one(index: &FMIndex, data: &mut KmerSearchData) -> Result<()> {
    data.reset();
    if let Some(range) = index.search_range_for_string(&data.kmer) {
        data.positions = index.locate_range(range)?;
        data.count = data.positions.len() as u64;
    }
    Ok(())
}

/// 并行计数：只记录区间长度，不解析 SA。
pub fn count_batch(index: &FMIndex, list: &mut KmerSearchList, threads: usize) {
    debug!(queries = list.len(), threads, "count batch");
    with_pool(threads, || {
        list.as_mut_slice().par_iter_mut().for_each(|data| {
            data.reset();
            data.count = index.count(&data.kmer);
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AlphabetType, IndexConfiguration};

    const SEQ: &[u8] = b"TACTGTCTTATGAAGATAAGTGAGATAATCTTGACCTGTAGCACTCAGCAGCTGCTGTATTTACCAGGTACAGATAAGACAACA";

    fn index(ratio: u8) -> FMIndex {
        let cfg = IndexConfiguration::new(ratio, 4, AlphabetType::Dna, true, true);
        FMIndex::build_from_sequence(cfg, SEQ).unwrap()
    }

    fn all_kmers(k: usize) -> KmerSearchList {
        let mut list = KmerSearchList::with_capacity(4usize.pow(k as u32));
        for key in 0..4usize.pow(k as u32) {
            let kmer: Vec<u8> = (0..k).map(|i| b"ACGT"[(key >> (2 * (k - 1 - i))) & 3]).collect();
            list.push(kmer);
        }
        list
    }

    #[test]
    fn ctg_count_matches_locate() {
        let idx = index(8);
        let mut counts: KmerSearchList = ["CTG"].into_iter().collect();
        let mut located = counts.clone();
        count_batch(&idx, &mut counts, 2);
        locate_batch(&idx, &mut located, 2).unwrap();

        let hit = located.get(0).unwrap();
        assert_eq!(counts.get(0).unwrap().count, hit.positions.len() as u64);
        assert_eq!(hit.count, 4);
        for &p in &hit.positions {
            assert_eq!(idx.read_sequence_segment(p, 3).unwrap(), b"CTG");
        }
        let mut sorted = hit.positions.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![2, 35, 51, 54]);
    }

    #[test]
    fn batches_agree_across_thread_counts() {
        let idx = index(5);
        let mut reference = all_kmers(3);
        locate_batch(&idx, &mut reference, 1).unwrap();

        for threads in [0usize, 2, 4, 8] {
            let mut list = all_kmers(3);
            locate_batch(&idx, &mut list, threads).unwrap();
            let mut counted = all_kmers(3);
            count_batch(&idx, &mut counted, threads);
            for ((a, b), c) in reference.iter().zip(list.iter()).zip(counted.iter()) {
                let mut pa = a.positions.clone();
                let mut pb = b.positions.clone();
                pa.sort_unstable();
                pb.sort_unstable();
                assert_eq!(pa, pb, "kmer {:?}", String::from_utf8_lossy(&a.kmer));
                assert_eq!(c.count, b.positions.len() as u64);
                assert!(c.positions.is_empty());
            }
        }
    }

    #[test]
    fn misses_are_zero_not_errors() {
        let idx = index(8);
        let mut list: KmerSearchList = ["GGGGGGGG", "ACNT", ""].into_iter().collect();
        locate_batch(&idx, &mut list, 3).unwrap();
        for d in &list {
            assert_eq!(d.count, 0);
            assert!(d.positions.is_empty());
        }
        count_batch(&idx, &mut list, 3);
        assert!(list.iter().all(|d| d.count == 0));
    }

    #[test]
    fn rerun_overwrites_previous_results() {
        let idx = index(4);
        let mut list: KmerSearchList = ["GATA"].into_iter().collect();
        locate_batch(&idx, &mut list, 2).unwrap();
        let first = list.get(0).unwrap().positions.len();
        locate_batch(&idx, &mut list, 2).unwrap();
        assert_eq!(list.get(0).unwrap().positions.len(), first);
        assert_eq!(first, 3);
    }
}
