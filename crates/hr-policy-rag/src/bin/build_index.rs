//! Offline index build
//!
//! Run with: cargo run -p hr-policy-rag --bin hr-policy-index -- --input docs/

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use console::style;
use hr_policy_rag::{
    ingestion::IndexBuilder, providers::OllamaEmbedder, Error, RagConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hr-policy-index", version, about = "Build the policy passage index")]
struct Cli {
    /// Policy file or directory of .pdf/.txt/.md files
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory (overrides index.index_dir)
    #[arg(long)]
    index_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hr_policy_rag=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => RagConfig::from_file(path)?,
        None => RagConfig::default(),
    };
    config.apply_env_overrides();
    if let Some(dir) = cli.index_dir {
        config.index.index_dir = dir;
    }
    config.validate()?;

    let files = IndexBuilder::collect_files(&cli.input);
    if files.is_empty() {
        anyhow::bail!("No .pdf, .txt or .md files found under {}", cli.input.display());
    }

    println!(
        "{} {} file(s) with {} (chunk {} / overlap {})",
        style("Indexing").cyan().bold(),
        files.len(),
        config.embeddings.model,
        config.index.chunk_size,
        config.index.chunk_overlap
    );

    let embedder = Arc::new(OllamaEmbedder::new(&config.llm, &config.embeddings)?);
    let mut builder = IndexBuilder::new(&config, embedder);

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("invalid progress template")?
            .progress_chars("=> "),
    );
    progress.enable_steady_tick(Duration::from_millis(120));

    for path in &files {
        progress.set_message(
            path.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        );
        match builder.add_file(path).await {
            Ok(_) => {}
            Err(e @ Error::FileParse { .. }) | Err(e @ Error::Io(_)) => builder.skip_file(path, &e),
            Err(e) => {
                progress.abandon();
                return Err(e).context("embedding failed; is Ollama running?");
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    let (index, stats) = builder.finish()?;
    let artifact = index.save(&config.index.index_dir)?;

    println!(
        "{} {} chunk(s) from {} page(s) in {} file(s) ({} skipped) -> {}",
        style("Done:").green().bold(),
        stats.chunks,
        stats.pages,
        stats.files_indexed,
        stats.files_failed,
        artifact.display()
    );

    Ok(())
}
