//! An unbounded chat with a fixed-context model.
//!
//! Every turn is saved under `--save-dir-path`. When the active window grows
//! past the compaction ceiling the model is asked to summarize the chat so
//! far, and the conversation continues from the summary plus the last few
//! messages. Restarting with the same save directory resumes where the last
//! summary left off.
//!
//! ```sh
//! eternal-chat --temperature 0.7
//! eternal-chat --save-dir-path data/chats/2024-05-01_10-00-00.000Z
//! ```
//!
//! End a line with `<<EOF` to type several lines, and finish them with a
//! line containing only `EOF`. Type `exit` to quit.

use std::path::PathBuf;

use clap::Parser;
use scrivener_cli::ChatConfig;
use scrivener_cli::terminal::{self, COMPACTION_BANNER, Tone};
use scrivener_rs::prelude::*;
use tracing::{debug, info};

/// Have an unlimited chat with a fixed-context model.
#[derive(Parser)]
#[command(name = "eternal-chat")]
struct Cli {
    /// Start from scratch instead of loading the saved conversation.
    #[arg(long)]
    fresh: bool,

    /// Sampling temperature, between 0.0 and 2.0.
    #[arg(long, default_value_t = 1.0)]
    temperature: f32,

    /// Directory the conversation is saved to. Defaults to a new
    /// timestamped directory under `<data-dir>/chats`.
    #[arg(long)]
    save_dir_path: Option<PathBuf>,

    /// Model to use for completions.
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Base URL of an OpenAI-compatible API.
    #[arg(long)]
    api_base: Option<String>,

    /// Root directory for saved data.
    #[arg(long, default_value = scrivener_cli::config::DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    terminal::init_tracing();

    let defaults = ChatConfig::under(&cli.data_dir);
    let config = ChatConfig {
        model: cli.model,
        temperature: cli.temperature,
        save_dir: cli.save_dir_path.unwrap_or(defaults.save_dir),
        api_base: cli.api_base,
        fresh: cli.fresh,
        window: defaults.window,
    };

    if let Err(e) = run(&config).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(config: &ChatConfig) -> Result<()> {
    let mut session = config.build_session()?;
    let mut manager = config.open_window()?;
    info!("Saving chat to {}", config.save_dir.display());

    terminal::echo_history(manager.history());

    let mut reader = MultilineReader::stdin();
    loop {
        terminal::input_label("> ");
        let prompt = reader.read_prompt()?;
        if is_exit(&prompt) {
            break;
        }

        let outcome = manager
            .turn(&mut session, &prompt, |event| match event {
                TurnEvent::Budget { line, .. } => terminal::say(Tone::Pricing, line),
                TurnEvent::Compacting { tokens } => {
                    debug!("Window at {tokens} tokens, summarizing");
                    terminal::say(Tone::Notice, COMPACTION_BANNER);
                }
                TurnEvent::SummaryFragment(fragment) => terminal::stream(Tone::Notice, fragment),
                TurnEvent::Fragment(fragment) => terminal::stream(Tone::Assistant, fragment),
            })
            .await?;
        println!();

        if let Some(snapshot) = outcome.snapshot {
            debug!("Saved {}", snapshot.display());
        }
    }
    Ok(())
}
