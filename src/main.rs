use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stop_words::{get, LANGUAGE};
use tracing::info;

use lexfold::aggregate::SemanticTermAggregator;
use lexfold::config::Config;
use lexfold::embedding::{download, SentenceEmbedder};
use lexfold::output::terminal::display_cluster_table;
use lexfold::vectorizer::VectorizerConfig;

/// Lexfold: semantic grouping of vocabulary terms.
///
/// Counts term occurrences across a corpus, embeds each distinct term with a
/// local sentence transformer, clusters near-synonyms together, and reports
/// one row per semantic cluster with the summed count.
#[derive(Parser)]
#[command(name = "lexfold", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate term counts by semantic cluster
    Aggregate {
        /// Document files (one document per file). With no files,
        /// reads stdin treating each non-empty line as a document.
        files: Vec<PathBuf>,

        /// Fit the vocabulary and clusters on these documents instead,
        /// then count the positional FILES against that fit
        #[arg(long = "fit-on")]
        fit_on: Vec<PathBuf>,

        /// Cosine similarity threshold in (0, 1] (overrides config)
        #[arg(long)]
        threshold: Option<f64>,

        /// Emit the cluster table as JSON instead of a colored table
        #[arg(long)]
        json: bool,

        /// Keep English stop words instead of filtering them
        #[arg(long)]
        keep_stop_words: bool,

        /// Drop terms appearing in fewer than this many documents
        #[arg(long, default_value = "1")]
        min_df: usize,

        /// Drop terms appearing in more than this fraction of documents
        #[arg(long, default_value = "1.0")]
        max_df: f64,

        /// Largest n-gram size to count (1 = unigrams only)
        #[arg(long, default_value = "1")]
        ngram_max: usize,
    },

    /// Download the sentence embedding model (~90 MB)
    DownloadModel,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lexfold=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Aggregate {
            files,
            fit_on,
            threshold,
            json,
            keep_stop_words,
            min_df,
            max_df,
            ngram_max,
        } => {
            let config = Config::load()?;
            config.require_model()?;

            let documents = read_documents(&files)?;
            if documents.is_empty() {
                anyhow::bail!("No documents given — pass files or pipe text on stdin");
            }

            let similarity_threshold = threshold.unwrap_or(config.similarity_threshold);

            let stop_words = if keep_stop_words {
                Vec::new()
            } else {
                get(LANGUAGE::English)
            };

            let vectorizer_config = VectorizerConfig {
                stop_words,
                ngram_range: (1, ngram_max),
                min_df,
                max_df,
                ..Default::default()
            };

            let model_dir = download::model_dir_for(&config.model_dir, &config.model_name);
            let embedder = SentenceEmbedder::load(&model_dir)?;

            let mut aggregator = SemanticTermAggregator::new(
                Arc::new(embedder),
                similarity_threshold,
                vectorizer_config,
            )?;

            let rows = if fit_on.is_empty() {
                aggregator.fit_transform(&documents).await?
            } else {
                let baseline = read_documents(&fit_on)?;
                info!(
                    baseline = baseline.len(),
                    documents = documents.len(),
                    "Fitting on baseline corpus, counting the given documents"
                );
                aggregator.fit(&baseline).await?;
                aggregator.transform(&documents)?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                display_cluster_table(&rows);
            }
        }

        Commands::DownloadModel => {
            let config = Config::load()?;
            println!(
                "Downloading embedding model to {}...",
                config.model_dir.display()
            );
            download::download_model(&config.model_dir, &config.model_name).await?;
            println!("\nDone. Run `lexfold aggregate <files>` to build clusters.");
        }
    }

    Ok(())
}

/// Read documents for aggregation: one document per file, or — with no
/// files — one document per non-empty stdin line.
fn read_documents(files: &[PathBuf]) -> Result<Vec<String>> {
    if files.is_empty() {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read documents from stdin")?;
        return Ok(buf
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect());
    }

    files
        .iter()
        .map(|path| {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read document: {}", path.display()))
        })
        .collect()
}
