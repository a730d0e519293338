//! 演示如何在 library 模式下使用 seqfm 构建索引并查询。
//!
//! 运行方式：
//! ```bash
//! cargo run --example simple_search
//! ```

use seqfm::{AlphabetType, FMIndex, IndexConfiguration, KmerSearchList};

fn main() -> seqfm::Result<()> {
    // 1. 参考序列
    let reference = b"ACGTACGTAGCTGATCGTAGCTAGCTAGCTGATCGTAGCTAGCTAGCTGAT";
    println!("参考序列: {}", String::from_utf8_lossy(reference));
    println!("参考长度: {} bp", reference.len());

    // 2. 构建 FM 索引（SA 每 4 行采样一次，种子表 k=3）
    let config = IndexConfiguration::new(4, 3, AlphabetType::Dna, true, true);
    let index = FMIndex::build_from_sequence(config, reference)?;
    println!(
        "FM 索引构建完成：BWT 长度={}, 块数={}, SA 采样数={}",
        index.bwt_length(),
        index.blocks().num_blocks(),
        index.suffix_array().len()
    );

    // 3. 单个查询：区间 → 位置
    let pattern = b"GCTGATCGTAG";
    if let Some(range) = index.search_range_for_string(pattern) {
        let mut positions = index.locate_range(range)?;
        positions.sort_unstable();
        println!("\n精确匹配 '{}': 找到 {} 处", String::from_utf8_lossy(pattern), positions.len());
        for pos in &positions {
            println!("  offset={}", pos);
        }
    }

    // 4. 逐字符反向扩展
    let mut range = index.initial_range_for_char(b'T');
    for &ch in b"AGC".iter().rev() {
        range = index.step(range, ch)?;
        println!("  扩展 '{}' 后区间长度 {}", ch as char, range.len());
    }

    // 5. 批量计数与定位
    let mut queries: KmerSearchList = ["GCT", "TAG", "CCCC"].into_iter().collect();
    seqfm::locate_batch(&index, &mut queries, 2)?;
    println!("\n批量定位:");
    for q in &queries {
        println!("  {} -> {} 处 {:?}", String::from_utf8_lossy(&q.kmer), q.count, q.positions);
    }

    // 6. 读回原始序列片段
    let seg = index.read_sequence_segment(10, 10)?;
    println!("\n序列片段 [10, 20): {}", String::from_utf8_lossy(&seg));

    println!("\n完成！");
    Ok(())
}
