use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use seqfm::{AlphabetType, FMIndex, IndexConfiguration, KmerSearchList};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "seqfm", author, version, about = "FM-index for DNA, RNA and protein sequences", arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build an index from a FASTA file or a raw sequence
    Build {
        /// Reference FASTA file
        #[arg(short = 'f', long = "fasta", conflicts_with = "sequence")]
        fasta: Option<PathBuf>,
        /// Raw sequence given on the command line
        #[arg(short = 's', long = "sequence")]
        sequence: Option<String>,
        /// Output index file (must not exist)
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = AlphabetType::Dna)]
        alphabet: AlphabetType,
        /// Keep one suffix array sample every N BWT rows
        #[arg(long = "sa-ratio", default_value_t = 8)]
        sa_ratio: u8,
        /// k-mer length of the seed table
        #[arg(long = "seed-k", default_value_t = 8)]
        seed_k: u8,
        /// Do not store the original sequence (disables extract)
        #[arg(long = "no-sequence")]
        no_sequence: bool,
    },
    /// Count occurrences of each query
    Count {
        #[arg(short = 'i', long = "index")]
        index: PathBuf,
        /// Queries on the command line; read from --queries otherwise
        patterns: Vec<String>,
        /// File with one query per line
        #[arg(short = 'q', long = "queries")]
        queries: Option<PathBuf>,
        #[arg(short = 't', long = "threads", default_value_t = 1)]
        threads: usize,
    },
    /// Report every position of each query
    Locate {
        #[arg(short = 'i', long = "index")]
        index: PathBuf,
        patterns: Vec<String>,
        #[arg(short = 'q', long = "queries")]
        queries: Option<PathBuf>,
        #[arg(short = 't', long = "threads", default_value_t = 1)]
        threads: usize,
        /// Read suffix array samples from disk instead of loading them
        #[arg(long = "sa-on-disk")]
        sa_on_disk: bool,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print a stretch of the stored sequence
    Extract {
        #[arg(short = 'i', long = "index")]
        index: PathBuf,
        /// Global start offset
        start: u64,
        length: u64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Build { fasta, sequence, output, alphabet, sa_ratio, seed_k, no_sequence } => {
            let config = IndexConfiguration::new(sa_ratio, seed_k, alphabet, true, !no_sequence);
            run_build(config, fasta.as_deref(), sequence.as_deref(), &output)
        }
        Commands::Count { index, patterns, queries, threads } => {
            run_count(&index, collect_queries(patterns, queries.as_deref())?, threads)
        }
        Commands::Locate { index, patterns, queries, threads, sa_on_disk, out } => run_locate(
            &index,
            collect_queries(patterns, queries.as_deref())?,
            threads,
            !sa_on_disk,
            out.as_deref(),
        ),
        Commands::Extract { index, start, length } => run_extract(&index, start, length),
    }
}

fn run_build(config: IndexConfiguration, fasta: Option<&Path>, sequence: Option<&str>, output: &Path) -> Result<()> {
    let t0 = std::time::Instant::now();
    let index = seqfm::create_index(config, sequence.map(str::as_bytes), fasta, output)
        .with_context(|| format!("cannot build index '{}'", output.display()))?;
    info!(
        bwt_length = index.bwt_length(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "index written to {}",
        output.display()
    );
    Ok(())
}

fn load(path: &Path, keep_suffix_array_in_memory: bool) -> Result<FMIndex> {
    FMIndex::load_from_file(path, keep_suffix_array_in_memory)
        .with_context(|| format!("cannot load index '{}'", path.display()))
}

fn collect_queries(mut patterns: Vec<String>, file: Option<&Path>) -> Result<KmerSearchList> {
    if let Some(path) = file {
        let fh = File::open(path).with_context(|| format!("cannot open query file '{}'", path.display()))?;
        for line in BufReader::new(fh).lines() {
            let line = line?;
            let q = line.trim();
            if !q.is_empty() {
                patterns.push(q.to_string());
            }
        }
    }
    if patterns.is_empty() {
        bail!("no queries given");
    }
    Ok(patterns.into_iter().collect())
}

fn run_count(path: &Path, mut list: KmerSearchList, threads: usize) -> Result<()> {
    let index = load(path, false)?;
    seqfm::count_batch(&index, &mut list, threads);
    let stdout = std::io::stdout();
    let mut w = BufWriter::new(stdout.lock());
    for q in &list {
        writeln!(w, "{}\t{}", String::from_utf8_lossy(&q.kmer), q.count)?;
    }
    w.flush()?;
    Ok(())
}

fn run_locate(
    path: &Path,
    mut list: KmerSearchList,
    threads: usize,
    keep_suffix_array_in_memory: bool,
    out: Option<&Path>,
) -> Result<()> {
    let index = load(path, keep_suffix_array_in_memory)?;
    seqfm::locate_batch(&index, &mut list, threads)?;

    let mut w: Box<dyn Write> = match out {
        Some(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("cannot create output '{}'", p.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout())),
    };

    // 存有记录信息时输出 record 名与记录内偏移，否则输出全局位置
    let records = index.num_sequences().is_ok();
    for q in &list {
        let kmer = String::from_utf8_lossy(&q.kmer);
        let mut positions = q.positions.clone();
        positions.sort_unstable();
        for pos in positions {
            if records {
                let local = index.local_position(pos)?;
                let name = index.header(local.record)?.split_whitespace().next().unwrap_or("");
                writeln!(w, "{}\t{}\t{}\t{}", kmer, pos, name, local.offset)?;
            } else {
                writeln!(w, "{}\t{}", kmer, pos)?;
            }
        }
    }
    w.flush()?;
    Ok(())
}

fn run_extract(path: &Path, start: u64, length: u64) -> Result<()> {
    let index = load(path, false)?;
    let seg = index
        .read_sequence_segment(start, length)
        .with_context(|| format!("cannot extract {}+{}", start, length))?;
    let stdout = std::io::stdout();
    let mut w = stdout.lock();
    w.write_all(&seg)?;
    w.write_all(b"\n")?;
    Ok(())
}
