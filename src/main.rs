//! # Askbase CLI
//!
//! The `askbase` binary is the boundary layer over the library: it builds
//! the pipeline and answerer once at startup from the configuration file
//! and dispatches subcommands onto them.
//!
//! ## Usage
//!
//! ```bash
//! askbase --config ./config/askbase.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `askbase ingest <path>` | Ingest a file or every supported file in a directory |
//! | `askbase ask "<question>"` | Ask one question in a fresh session |
//! | `askbase chat` | Interactive multi-turn conversation |
//!
//! ## Examples
//!
//! ```bash
//! # Ingest a data directory, skipping already-indexed documents
//! askbase ingest ./data
//!
//! # Force a full refresh (re-embed unchanged content)
//! askbase ingest ./data --full
//!
//! # One-shot question
//! askbase ask "Where is the campus located?"
//!
//! # Multi-turn conversation in one session
//! askbase chat
//! ```

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use askbase::chat::Answerer;
use askbase::config::{load_config, Config};
use askbase::embedding::create_embedder;
use askbase::index::create_index;
use askbase::ingest::IngestionPipeline;
use askbase::llm::create_llm_client;
use askbase::models::IngestStatus;
use askbase::session::SessionStore;

/// Askbase — a retrieval-grounded knowledge base and assistant.
#[derive(Parser)]
#[command(
    name = "askbase",
    about = "Retrieval-grounded knowledge base: ingest documents, ask grounded questions",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/askbase.toml")]
    config: PathBuf,

    /// Log filter override (e.g. `debug`, `askbase=trace`).
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Ingest a file or directory into the knowledge base.
    ///
    /// Supported file types: .txt, .md, .pdf. Documents whose content is
    /// already indexed are skipped unless --full is given.
    Ingest {
        /// File or directory to ingest.
        path: PathBuf,

        /// Re-embed and re-upsert even when the content is already indexed.
        #[arg(long)]
        full: bool,
    },

    /// Ask a single question in a fresh session.
    Ask {
        /// The question text.
        question: String,
    },

    /// Interactive chat: one session, questions read from stdin.
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    askbase::logging::init_logging(cli.log.as_deref());

    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest { path, full } => run_ingest(&config, &path, full).await,
        Commands::Ask { question } => run_ask(&config, &question).await,
        Commands::Chat => run_chat(&config).await,
    }
}

fn build_pipeline(config: &Config) -> Result<IngestionPipeline> {
    let embedder = Arc::from(create_embedder(&config.embedding)?);
    let index = Arc::from(create_index(&config.index)?);
    Ok(IngestionPipeline::new(
        embedder,
        index,
        config.chunking.clone(),
        &config.index,
        &config.ingestion,
    ))
}

fn build_answerer(config: &Config) -> Result<Answerer> {
    let embedder = Arc::from(create_embedder(&config.embedding)?);
    let index = Arc::from(create_index(&config.index)?);
    let llm = Arc::from(create_llm_client(&config.chat)?);
    let sessions = Arc::new(SessionStore::new());
    Ok(Answerer::new(
        embedder,
        index,
        llm,
        sessions,
        &config.retrieval,
        &config.chat,
        &config.index,
    ))
}

async fn run_ingest(config: &Config, path: &std::path::Path, full: bool) -> Result<()> {
    let pipeline = build_pipeline(config)?;

    let reports = if path.is_dir() {
        pipeline.ingest_dir(path, full).await
    } else {
        let text = askbase::extract::read_document(path)?;
        let origin = path.display().to_string();
        pipeline
            .ingest_all(
                vec![askbase::ingest::IngestInput { text, origin }],
                full,
            )
            .await
    };

    let mut indexed = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;
    for report in &reports {
        match &report.result {
            Ok(outcome) => match outcome.status {
                IngestStatus::Indexed { chunks } => {
                    indexed += 1;
                    println!("  indexed {} ({} chunks)", report.origin, chunks);
                }
                IngestStatus::Skipped => {
                    skipped += 1;
                    println!("  skipped {} (unchanged)", report.origin);
                }
            },
            Err(err) => {
                failed += 1;
                eprintln!("  failed {}: {}", report.origin, err);
            }
        }
    }

    println!(
        "ingest complete: {} indexed, {} skipped, {} failed",
        indexed, skipped, failed
    );
    if failed > 0 && indexed == 0 && skipped == 0 {
        anyhow::bail!("all documents failed to ingest");
    }
    Ok(())
}

async fn run_ask(config: &Config, question: &str) -> Result<()> {
    let answerer = build_answerer(config)?;
    let answer = answerer.answer(question, None).await?;
    println!("{}", answer.text);
    Ok(())
}

async fn run_chat(config: &Config) -> Result<()> {
    let answerer = build_answerer(config)?;
    let stdin = std::io::stdin();
    let mut session: Option<String> = None;

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "exit" || question == "quit" {
            break;
        }

        match answerer.answer(question, session.as_deref()).await {
            Ok(answer) => {
                session = Some(answer.session_id.clone());
                println!("{}\n", answer.text);
            }
            Err(err) => eprintln!("error: {err}"),
        }
    }
    Ok(())
}
