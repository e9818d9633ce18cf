//! CLI interface for the similarity-search engine

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;
use vector5db::{
    Collection, CollectionConfig, DistanceMetric, Filter, IndexType, Item, QueryOptions, Vector,
};

#[derive(Parser)]
#[command(name = "vector5")]
#[command(about = "An embeddable similarity-search engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MetricArg {
    Euclidean,
    Cosine,
    Jaccard,
}

impl From<MetricArg> for DistanceMetric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Euclidean => DistanceMetric::Euclidean,
            MetricArg::Cosine => DistanceMetric::Cosine,
            MetricArg::Jaccard => DistanceMetric::Jaccard,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum IndexArg {
    BruteForce,
    KdTree,
    KdTreePq,
    Lsh,
}

impl From<IndexArg> for IndexType {
    fn from(arg: IndexArg) -> Self {
        match arg {
            IndexArg::BruteForce => IndexType::BruteForce,
            IndexArg::KdTree => IndexType::KdTree,
            IndexArg::KdTreePq => IndexType::KdTreePq,
            IndexArg::Lsh => IndexType::Lsh,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load items from a JSON file and run nearest-neighbor queries
    Query {
        /// JSON array of items: [{"id", "vector", "metadata", "document"}]
        #[arg(short, long)]
        items: PathBuf,
        /// Collection configuration as JSON
        #[arg(long)]
        config: Option<PathBuf>,
        /// Query vector as comma-separated values (e.g., "1.0,2.0,3.0"); repeatable
        #[arg(short, long = "vector", required = true)]
        vectors: Vec<String>,
        /// Number of results per query
        #[arg(short = 'n', long, default_value = "5")]
        n_results: usize,
        /// Distance metric (overrides the configuration)
        #[arg(long, value_enum)]
        metric: Option<MetricArg>,
        /// Index to query (overrides the configuration)
        #[arg(long, value_enum)]
        index: Option<IndexArg>,
        /// Drop matches farther than this distance
        #[arg(long)]
        max_distance: Option<f64>,
        /// Metadata filter as key=value; repeatable
        #[arg(short = 'w', long = "where", value_parser = parse_key_val)]
        filters: Vec<(String, String)>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compute the distance between two vectors
    Distance {
        /// First vector as comma-separated values
        a: String,
        /// Second vector as comma-separated values
        b: String,
        #[arg(long, value_enum, default_value = "euclidean")]
        metric: MetricArg,
    },
    /// Run one query on every index type and report overlap with brute force
    Compare {
        #[arg(short, long)]
        items: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Query vector as comma-separated values
        #[arg(short, long)]
        vector: String,
        #[arg(short = 'n', long, default_value = "10")]
        n_results: usize,
        #[arg(long, value_enum)]
        metric: Option<MetricArg>,
    },
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{}`", s))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

fn load_config(path: Option<&Path>, metric: Option<MetricArg>) -> Result<CollectionConfig> {
    let mut config = match path {
        Some(path) => CollectionConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => CollectionConfig::default(),
    };
    if let Some(metric) = metric {
        config.metric = metric.into();
    }
    Ok(config)
}

fn load_collection(items_path: &Path, config: CollectionConfig) -> Result<Collection> {
    let text = std::fs::read_to_string(items_path)
        .with_context(|| format!("failed to read {}", items_path.display()))?;
    let items: Vec<Item> = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse items in {}", items_path.display()))?;

    let mut collection = Collection::new("cli", config)?;
    for item in items {
        collection
            .add(item.id.clone(), item.vector, item.metadata, item.document)
            .with_context(|| format!("failed to add item {}", item.id))?;
    }
    info!(items = collection.count(), "loaded collection");
    Ok(collection)
}

fn parse_vector(s: &str) -> Result<Vec<f64>> {
    Ok(Vector::from_str(s)?.into_inner())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vector5db=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Query {
            items,
            config,
            vectors,
            n_results,
            metric,
            index,
            max_distance,
            filters,
            json,
        } => {
            let mut config = load_config(config.as_deref(), metric)?;
            if let Some(index) = index {
                let index = IndexType::from(index);
                if !config.indexes.contains(&index) {
                    config.indexes.insert(0, index);
                }
            }
            let mut collection = load_collection(&items, config)?;

            let queries = vectors
                .iter()
                .map(|v| parse_vector(v))
                .collect::<Result<Vec<_>>>()?;
            let mut options = QueryOptions::new(n_results);
            options.index = index.map(IndexType::from);
            options.max_distance = max_distance;
            if !filters.is_empty() {
                options.filter = Some(filters.into_iter().collect::<Filter>());
            }

            let results = collection.query_with(&queries, &options)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
                return Ok(());
            }
            for (query, hits) in vectors.iter().zip(&results) {
                println!("Query [{}]:", query);
                if hits.is_empty() {
                    println!("  No results found");
                }
                for (i, hit) in hits.iter().enumerate() {
                    println!("  {}. {} (distance: {:.4})", i + 1, hit.item.id, hit.distance);
                }
            }
        }
        Commands::Distance { a, b, metric } => {
            let metric = DistanceMetric::from(metric);
            let d = metric.distance(&parse_vector(&a)?, &parse_vector(&b)?)?;
            println!("{} distance: {:.6}", metric, d);
        }
        Commands::Compare {
            items,
            config,
            vector,
            n_results,
            metric,
        } => {
            let mut config = load_config(config.as_deref(), metric)?;
            config.indexes = IndexType::ALL.to_vec();
            let mut collection = load_collection(&items, config)?;
            let query = vec![parse_vector(&vector)?];

            let exact = collection.query(&query, n_results, None, Some(IndexType::BruteForce))?;
            let expected: HashSet<&str> = exact[0].iter().map(|r| r.item.id.as_str()).collect();

            println!("{:<12} {:>8} {:>10}", "index", "results", "overlap");
            for index in IndexType::ALL {
                let results = collection.query(&query, n_results, None, Some(index))?;
                let found = results[0]
                    .iter()
                    .filter(|r| expected.contains(r.item.id.as_str()))
                    .count();
                let overlap = if expected.is_empty() {
                    1.0
                } else {
                    found as f64 / expected.len() as f64
                };
                println!("{:<12} {:>8} {:>9.1}%", index, results[0].len(), overlap * 100.0);
            }
        }
    }
    Ok(())
}
