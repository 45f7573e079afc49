//! Embed a list of words concurrently.
//!
//! Words come from the command line, from `--file` (one per line), or
//! default to a handful of fruit. Words whose request fails are reported
//! in the log and left out of the output.
//!
//! ```sh
//! embed-words apple banana --output embeddings.json
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use scrivener_cli::terminal::{self, Tone};
use scrivener_rs::embeddings::{
    DEFAULT_EMBEDDING_MODEL, EmbeddingConfig, EmbeddingGenerator, HttpEmbeddingClient,
};
use scrivener_cli::config::api_key;
use scrivener_rs::{Error, Result};
use tracing::info;

const SAMPLE_WORDS: [&str; 5] = ["apple", "banana", "orange", "grape", "watermelon"];

/// Generate embeddings for a list of words.
#[derive(Parser)]
#[command(name = "embed-words")]
struct Cli {
    /// Words to embed.
    words: Vec<String>,

    /// File with one word per line, read in addition to WORDS.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Requests allowed in flight at once.
    #[arg(long, default_value_t = 10)]
    concurrency: usize,

    #[arg(long, default_value = DEFAULT_EMBEDDING_MODEL)]
    model: String,

    /// Base URL of an OpenAI-compatible API.
    #[arg(long)]
    api_base: Option<String>,

    /// Write `{word: vector}` JSON here instead of printing.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    terminal::init_tracing();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut words = cli.words;
    if let Some(path) = &cli.file {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        words.extend(
            text.lines()
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .map(str::to_string),
        );
    }
    if words.is_empty() {
        words = SAMPLE_WORDS.iter().map(|w| w.to_string()).collect();
    }

    let client = match cli.api_base {
        Some(base) => HttpEmbeddingClient::with_api_base(api_key()?, base)?,
        None => HttpEmbeddingClient::from_env()?,
    };
    let config = EmbeddingConfig::default()
        .with_model(cli.model)
        .with_concurrency(cli.concurrency);
    let generator = EmbeddingGenerator::new(client, config);

    let embeddings: BTreeMap<String, Vec<f32>> = generator.generate_many(&words).await;
    info!(
        "Embedded {} of {} word(s), {} failure(s)",
        embeddings.len(),
        words.len(),
        generator.failures()
    );

    match &cli.output {
        Some(path) => {
            let json = serde_json::to_string(&embeddings)?;
            std::fs::write(path, json).map_err(|source| Error::Io {
                path: path.clone(),
                source,
            })?;
            terminal::say(Tone::Notice, &format!("Wrote {}", path.display()));
        }
        None => {
            for (word, embedding) in &embeddings {
                println!("{}: {embedding:?}", terminal::paint(Tone::Assistant, word));
            }
        }
    }
    Ok(())
}
