//! Ask the model for Python scripts and save what it writes.
//!
//! Without `--script`, reads a request ("I want you to implement a python
//! script that...") and asks for a planned, documented script. With
//! `--script`, asks the model to describe (and optionally comment and
//! document) an existing file. Every code block of the answer is saved
//! to a new run directory, as a notebook when it looks like one. If any
//! saved script defines functions, a second request asks for unit tests.
//!
//! Completions are cached in `<data-dir>/script_writer/all_completions.json`,
//! so rerunning with the same input replays the earlier answers.

use std::path::PathBuf;

use clap::Parser;
use scrivener_cli::ScriptConfig;
use scrivener_cli::prompt::{
    AUTO_DOCUMENT_PROMPT, NEW_SCRIPT_LABEL, improve_script_prompt, new_script_prompt,
    write_tests_prompt,
};
use scrivener_cli::terminal::{self, RULE, Tone};
use scrivener_rs::prelude::*;
use scrivener_rs::scripts::{save_artifacts, test_file_names, test_files_sentence};
use tracing::info;

/// Generate, document and test Python scripts.
#[derive(Parser)]
#[command(name = "script-writer")]
struct Cli {
    /// Path to an existing script to describe and generate tests for.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Write a comment for every non-trivial line of code.
    #[arg(long)]
    comment_lines: bool,

    /// Write a docstring for every class and function.
    #[arg(long)]
    add_docstrings: bool,

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

    let config = ScriptConfig {
        model: cli.model,
        data_dir: cli.data_dir,
        api_base: cli.api_base,
        script: cli.script,
        comment_lines: cli.comment_lines,
        add_docstrings: cli.add_docstrings,
    };

    if let Err(e) = run(&config).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(config: &ScriptConfig) -> Result<()> {
    let mut session = config.build_session()?;
    let run_dir = config.run_dir();
    let grammar = ArtifactGrammar::default();

    let (user_prompt, full_prompt) = match &config.script {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
                path: path.clone(),
                source,
            })?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let prompt = improve_script_prompt(
                &file_name,
                &content,
                config.comment_lines,
                config.add_docstrings,
            );
            (AUTO_DOCUMENT_PROMPT.to_string(), prompt)
        }
        None => {
            terminal::say(Tone::User, NEW_SCRIPT_LABEL);
            terminal::input_label("> ");
            let request = MultilineReader::stdin().read_prompt()?;
            if is_exit(&request) {
                return Ok(());
            }
            let prompt = new_script_prompt(&request);
            (request, prompt)
        }
    };

    let first = complete(&mut session, &full_prompt, &[]).await?;
    println!("{RULE}");
    let artifacts = parse_artifacts(&first.text, &grammar);
    report(&save_artifacts(&artifacts, &user_prompt, &run_dir)?);

    let test_names = test_file_names(&artifacts);
    if let Some(sentence) = test_files_sentence(&test_names) {
        let prompt = write_tests_prompt(&sentence, config.script.is_some());
        let follow_up = complete(&mut session, &prompt, &first.messages).await?;
        println!("{RULE}");
        let tests = parse_artifacts(&follow_up.text, &grammar);
        report(&save_artifacts(&tests, &user_prompt, &run_dir)?);
    }

    if let Some(cache) = session.cache() {
        info!(
            "Completion cache: {} hit(s), {} miss(es), {} entries",
            cache.hits(),
            cache.misses(),
            cache.len()
        );
    }
    Ok(())
}

async fn complete(
    session: &mut CompletionSession<HttpCompletionClient>,
    prompt: &str,
    prior: &[Message],
) -> Result<Exchange> {
    terminal::say(Tone::User, &format!("Prompt:\n    {prompt}"));
    let exchange = session
        .complete(prompt, prior, |fragment| {
            terminal::stream(Tone::Assistant, fragment)
        })
        .await?;
    println!();
    if exchange.cached {
        info!("Replayed from the completion cache");
    }
    Ok(exchange)
}

fn report(paths: &[PathBuf]) {
    if paths.is_empty() {
        terminal::say(Tone::Notice, "No code blocks found in the answer");
    }
    for path in paths {
        terminal::say(Tone::Notice, &format!("Saved {}", path.display()));
    }
}
