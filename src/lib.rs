//! # seqfm
//!
//! 面向 DNA / RNA / 蛋白质序列的 FM 索引。
//!
//! 本 crate 提供：
//!
//! - **索引构建**：从序列字节或 FASTA 文件构建 BWT 分块存储、C 表、k-mer 种子表与采样后缀数组
//! - **精确匹配**：反向搜索，种子表加速查询末尾的 k 个字符
//! - **定位**：采样 SA + LF 回溯，解析任意 BWT 行对应的序列位置
//! - **批量查询**：基于 rayon 的多线程计数 / 定位
//! - **持久化**：单文件索引格式，后缀数组可常驻内存或按需从磁盘读取
//!
//! ## 快速示例
//!
//! ```rust,no_run
//! use seqfm::{AlphabetType, FMIndex, IndexConfiguration, KmerSearchList};
//!
//! let config = IndexConfiguration::new(8, 4, AlphabetType::Dna, true, true);
//! let index = FMIndex::build_from_sequence(config, b"ACGTACGTAGCTGATCGTAG")?;
//!
//! // 单个查询
//! println!("GTA occurs {} times", index.count(b"GTA"));
//!
//! // 批量定位
//! let mut queries: KmerSearchList = ["ACG", "GCTGATC"].into_iter().collect();
//! seqfm::locate_batch(&index, &mut queries, 4)?;
//! for q in &queries {
//!     println!("{}: {:?}", String::from_utf8_lossy(&q.kmer), q.positions);
//! }
//!
//! index.save_to_file("ref.sfm")?;
//! # Ok::<(), seqfm::Error>(())
//! ```
//!
//! ## 模块说明
//!
//! - [`config`] — 字母表与索引构建参数
//! - [`index`] — 后缀数组、BWT 分块、反向搜索、种子表、压缩 SA 与索引文件格式
//! - [`search`] — 批量查询列表与并行调度
//! - [`io`] — FASTA 解析与原始序列存储
//! - [`util`] — 字母表编码

pub mod config;
pub mod error;
pub mod index;
pub mod io;
pub mod search;
pub mod util;

pub use config::{AlphabetType, IndexConfiguration};
pub use error::{Error, Result};
pub use index::persist::create_index;
pub use index::{FMIndex, IndexMeta, SearchRange};
pub use search::{count_batch, locate_batch, KmerSearchData, KmerSearchList};
