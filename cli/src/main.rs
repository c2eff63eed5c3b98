//! `clearpath` command: build the document index and query it.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use clearpath_retrieval::{EmbeddingProviderType, RetrievalPipeline};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{Overrides, load_config};

#[derive(Debug, Parser)]
#[command(name = "clearpath", about = "Build and query the ClearPath document index")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, short = 'c', global = true, env = "CLEARPATH_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of documents to index (overrides the config file).
    #[arg(long, global = true)]
    docs_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build the index and print a build report.
    Index,

    /// Build the index, then print the top matches for a question.
    Query {
        /// Free-text question.
        text: String,

        /// Number of chunks to return.
        #[arg(long, short = 'k')]
        top_k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays parseable JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let top_k = match &cli.command {
        Command::Query { top_k, .. } => *top_k,
        Command::Index => None,
    };
    let overrides = Overrides {
        docs_dir: cli.docs_dir.clone(),
        top_k,
    };
    let config = load_config(cli.config.as_deref(), &overrides).await?;

    let pipeline = RetrievalPipeline::new(config).context("failed to create pipeline")?;
    if pipeline.config().embedding.provider == EmbeddingProviderType::OpenAI
        && std::env::var_os("OPENAI_API_KEY").is_none()
    {
        bail!("OPENAI_API_KEY must be set to use the openai embedding provider");
    }

    let report = pipeline.build_index().await.context("index build failed")?;

    match cli.command {
        Command::Index => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Query { text, .. } => {
            if !pipeline.is_indexed().await {
                info!("No index available; the query will return no sources.");
            }
            let results = pipeline.retrieve_default(&text).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
    }

    Ok(())
}
