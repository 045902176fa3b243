//! CLI interface for the vector store

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use flatvec::metrics::MetricsCollector;
use flatvec::{
    FlatIndex, HnswIndex, HnswParams, Index, Metric, SearchResult, StoreConfig, Vector,
    VectorStore,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "flatvec", version)]
#[command(about = "An in-memory vector store with SIMD exact search", long_about = None)]
struct Cli {
    /// Index type to use for search
    #[arg(long, value_enum, default_value = "flat", global = true)]
    index: IndexType,

    /// Similarity metric: l2_squared or cosine
    #[arg(long, global = true)]
    metric: Option<Metric>,

    /// Use the portable kernels even when AVX2 is available
    #[arg(long, global = true)]
    scalar: bool,

    /// JSON file with `store` and `hnsw` settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum IndexType {
    Flat,
    Hnsw,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a small four-dimensional walkthrough
    Demo,
    /// Insert random vectors and time queries against them
    Bench {
        #[arg(long, default_value_t = 128)]
        dim: usize,
        /// Number of vectors to insert
        #[arg(long, default_value_t = 10_000)]
        count: usize,
        /// Number of queries to time
        #[arg(long, default_value_t = 1_000)]
        queries: usize,
        #[arg(short, long, default_value_t = 10)]
        k: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Load a JSON-lines file of records and run one query
    Search {
        /// File with one `{"id": 1, "vector": [..]}` object per line
        #[arg(long)]
        data: PathBuf,
        /// Query vector as comma-separated values (e.g., "1.0,2.0,3.0")
        #[arg(short, long)]
        query: String,
        /// Number of results to return
        #[arg(short, long, default_value_t = 5)]
        k: usize,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Contents of the `--config` file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    store: StoreConfig,
    hnsw: HnswParams,
}

/// One line of a `search --data` file.
#[derive(Debug, Deserialize)]
struct Record {
    id: u64,
    vector: Vec<f32>,
}

#[derive(Serialize)]
struct JsonHit {
    id: u64,
    score: f32,
}

fn load_config(path: Option<&Path>) -> Result<FileConfig> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    let file = File::open(path).with_context(|| format!("opening config {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing config {}", path.display()))
}

fn load_records(path: &Path) -> Result<Vec<Record>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut records = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Record = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid record", path.display(), n + 1))?;
        records.push(record);
    }
    Ok(records)
}

fn print_results(results: &[SearchResult<u64>], metric: Metric) {
    if results.is_empty() {
        println!("No results found (store is empty)");
        return;
    }
    println!("Top {} results:", results.len());
    for (i, result) in results.iter().enumerate() {
        println!("{}. {} ({}: {:.4})", i + 1, result.id, metric, result.score);
    }
}

fn random_vector(rng: &mut StdRng, dim: usize) -> Vec<f32> {
    (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

fn run<I: Index>(mut config: StoreConfig, index: I, command: Commands) -> Result<()> {
    match command {
        Commands::Demo => {
            config.dimension = 4;
            let mut store: VectorStore<u64, I> = VectorStore::with_index(config, index)?;
            store.insert(1, &[0.0, 0.0, 0.0, 0.0])?;
            store.insert(2, &[1.0, 1.0, 1.0, 1.0])?;

            let query = [0.0; 4];
            print_results(&store.query(&query, 2)?, store.metric());

            store.remove(&1)?;
            println!("Removed 1");
            print_results(&store.query(&query, 2)?, store.metric());
        }
        Commands::Bench {
            dim,
            count,
            queries,
            k,
            seed,
            json,
        } => {
            config.dimension = dim;
            config.initial_capacity = config.initial_capacity.max(count);
            let mut store: VectorStore<u64, I> = VectorStore::with_index(config, index)?;
            let mut rng = StdRng::seed_from_u64(seed);
            let mut metrics = MetricsCollector::new();

            let records: Vec<(u64, Vec<f32>)> = (0..count as u64)
                .map(|id| (id, random_vector(&mut rng, dim)))
                .collect();
            let start = Instant::now();
            let inserted = store.insert_batch(records).context("inserting bench vectors")?;
            metrics.record_inserts(inserted);
            info!(inserted, elapsed = ?start.elapsed(), "loaded bench vectors");

            for _ in 0..queries {
                let query = random_vector(&mut rng, dim);
                let start = Instant::now();
                store.query(&query, k)?;
                metrics.record_query(start.elapsed());
            }

            let summary = metrics.summary();
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "backend: {:?}, index: {}",
                    store.kernel().backend(),
                    if store.index().is_exact() { "exact" } else { "approximate" }
                );
                println!("inserted {} vectors of dimension {}", summary.inserts, dim);
                println!(
                    "{} queries (k={}): avg {:.1}us, p50 {:.1}us, p95 {:.1}us, p99 {:.1}us",
                    summary.queries,
                    k,
                    summary.avg_query_us,
                    summary.p50_query_us,
                    summary.p95_query_us,
                    summary.p99_query_us
                );
            }
        }
        Commands::Search {
            data,
            query,
            k,
            json,
        } => {
            let query: Vector = query.parse().context("parsing query vector")?;
            let records = load_records(&data)?;
            if config.dimension == 0 {
                config.dimension = match records.first() {
                    Some(record) => record.vector.len(),
                    None => query.dimension(),
                };
            }
            config.initial_capacity = config.initial_capacity.max(records.len());

            let mut store: VectorStore<u64, I> = VectorStore::with_index(config, index)?;
            store
                .insert_batch(records.into_iter().map(|r| (r.id, r.vector)))
                .with_context(|| format!("loading {}", data.display()))?;
            info!(size = store.size(), "loaded records");

            let results = store.query(query.as_slice(), k)?;
            if json {
                let hits: Vec<JsonHit> = results
                    .iter()
                    .map(|r| JsonHit {
                        id: r.id,
                        score: r.score,
                    })
                    .collect();
                println!("{}", serde_json::to_string(&hits)?);
            } else {
                print_results(&results, store.metric());
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("flatvec=info".parse()?))
        .init();

    let cli = Cli::parse();
    let file = load_config(cli.config.as_deref())?;

    let mut config = file.store;
    if let Some(metric) = cli.metric {
        config.metric = metric;
    }
    config.force_scalar |= cli.scalar;

    if let Commands::Bench { dim: 0, .. } = cli.command {
        bail!("--dim must be greater than zero");
    }

    match cli.index {
        IndexType::Flat => run(config, FlatIndex::new(), cli.command),
        IndexType::Hnsw => {
            let index = HnswIndex::with_params(file.hnsw).context("invalid hnsw settings")?;
            run(config, index, cli.command)
        }
    }
}
