

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use multiquery::expansion::ExpansionMode;
use multiquery::index::Chunk;
use multiquery::llm::factory::{EmbeddingProviderFactory, LlmProviderFactory};
use multiquery::{InMemoryIndex, MultiQueryConfig, QueryExpansionPipeline};

/// Expand a search query with an LLM and rank the variants against a corpus.
#[derive(Parser, Debug)]
#[command(name = "multiquery", version)]
struct Args {
    /// Configuration file (TOML, JSON or YAML); MULTIQUERY_* variables override it.
    #[arg(short, long, env = "MULTIQUERY_CONFIG")]
    config: Option<PathBuf>,

    /// JSON array of {"content": "...", "source": "..."} chunks.
    #[arg(long)]
    corpus: PathBuf,

    #[arg(short, long, default_value = "plain")]
    mode: ExpansionMode,

    /// Extra attempts after a malformed reply or a timeout.
    #[arg(short, long, default_value_t = 0)]
    retries: usize,

    /// Print the full run report as JSON.
    #[arg(long)]
    json: bool,

    seed: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("multiquery=info".parse()?))
        .init();

    let args = Args::parse();
    let config = MultiQueryConfig::load(args.config.as_deref())?;

    let raw = std::fs::read_to_string(&args.corpus)
        .with_context(|| format!("reading corpus {}", args.corpus.display()))?;
    let chunks: Vec<Chunk> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing corpus {}", args.corpus.display()))?;

    let embedder = Arc::new(EmbeddingProviderFactory::from_config(&config)?);
    let index = Arc::new(InMemoryIndex::new(embedder, config.relevance_metric));
    let added = index.insert(chunks).await?;
    info!("Indexed {} chunks from {}", added, args.corpus.display());

    let llm = LlmProviderFactory::from_config(&config)?;
    let pipeline = QueryExpansionPipeline::new(llm, index, config.pipeline_settings());

    let mut attempt = 0;
    let report = loop {
        match pipeline.run(&args.seed, args.mode).await {
            Ok(report) => break report,
            Err(e) if e.is_retryable() && attempt < args.retries => {
                attempt += 1;
                warn!("Attempt {} failed ({}), retrying", attempt, e);
            }
            Err(e) => return Err(e.into()),
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.table);
    }
    Ok(())
}
