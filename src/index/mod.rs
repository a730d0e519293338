//! FM 索引：构建、查询与持久化。

pub mod block;
pub mod bwt;
pub mod csa;
pub mod fm;
pub mod persist;
pub mod prefix;
pub mod sa;
pub mod search;
pub mod seed;

pub use fm::{FMIndex, IndexMeta};
pub use search::SearchRange;

/// 索引文件格式版本；载入时不一致即拒绝。
pub const INDEX_VERSION: u32 = 1;

/// feature_flags：文件中包含原始序列与记录信息
pub const FEATURE_SEQUENCE_STORED: u32 = 1 << 0;
/// feature_flags：由 FASTA 文件构建
pub const FEATURE_FROM_FASTA: u32 = 1 << 1;
