//! CLI definition and command dispatch for braq.
//!
//! This module defines the command-line interface using `clap` and provides
//! the `run()` function that dispatches commands to the engine.
//!
//! ## Configuration Precedence
//!
//! 1. CLI flags (e.g., `--config`, `--verbose`)
//! 2. Environment variables (`BRAQ_CONFIG`, `BRAQ_CORPUS`, `BRAQ_PROVIDERS`)
//! 3. Config files (`~/.braq/config.yaml`, `~/.braq/providers.yaml`)
//! 4. Built-in defaults

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;

use braq_core::{metrics_block, AnswerEngine, ConversationId, EngineConfig};
use braq_providers::{HttpEmbeddingClient, HttpLanguageModel, HttpRerankClient, ProviderConfig};

use crate::corpus::load_corpus;

// ============================================================================
// CLI Definition
// ============================================================================

/// Backlog Retrieval & Answer Kernel – ask questions about your backlog
#[derive(Parser, Debug)]
#[command(name = "braq")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, env = "BRAQ_VERBOSE")]
    pub verbose: bool,

    /// Path to engine configuration (default: ~/.braq/config.yaml)
    #[arg(long, global = true, env = "BRAQ_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to provider configuration (default: ~/.braq/providers.yaml)
    #[arg(long, global = true, env = "BRAQ_PROVIDERS")]
    pub providers: Option<PathBuf>,

    /// Path to the corpus export (JSONL, one item per line)
    #[arg(long, global = true, env = "BRAQ_CORPUS")]
    pub corpus: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask a one-off question about the backlog
    #[command(after_help = r#"EXAMPLES:
    braq ask "how many completed tasks in sprint 3"
    braq ask "what is blocking the payment work"
    braq --corpus export.jsonl ask "summarize the current sprint"
"#)]
    Ask {
        /// The question to answer
        question: Vec<String>,
    },

    /// Show deterministic metrics for one iteration
    #[command(after_help = r#"EXAMPLES:
    braq metrics "Sprint 3"
    braq metrics "Sprint 3" --json
"#)]
    Metrics {
        /// Iteration name, e.g. "Sprint 3"
        iteration: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Interactive chat with conversational follow-ups
    #[command(after_help = r#"EXAMPLES:
    braq chat
    # then: "show login work", "give me more detail", "exit"
"#)]
    Chat,
}

// ============================================================================
// Provider configuration
// ============================================================================

/// Optional provider endpoints; each missing section leaves that
/// collaborator unattached and the engine degrades accordingly.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProvidersFile {
    #[serde(default)]
    embedding: Option<EmbeddingProviderSection>,
    #[serde(default)]
    rerank: Option<ProviderConfig>,
    #[serde(default)]
    language_model: Option<ProviderConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmbeddingProviderSection {
    #[serde(flatten)]
    provider: ProviderConfig,
    dimension: usize,
}

fn load_providers(path: Option<&PathBuf>) -> Result<ProvidersFile> {
    let path = match path {
        Some(path) => path.clone(),
        None => match EngineConfig::default_dir() {
            Some(dir) => dir.join("providers.yaml"),
            None => return Ok(ProvidersFile::default()),
        },
    };

    if !path.exists() {
        tracing::debug!("No provider config at {}; running without collaborators", path.display());
        return Ok(ProvidersFile::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read providers at {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse providers at {}", path.display()))
}

// ============================================================================
// Dispatch
// ============================================================================

/// Parse arguments, build the engine, and dispatch the command.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "braq_core=debug,braq_providers=debug,braq_cli=debug"
    } else {
        "warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn execute(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::load_default()?,
    };

    let corpus_path = cli
        .corpus
        .clone()
        .context("no corpus given: pass --corpus or set BRAQ_CORPUS")?;
    let index = load_corpus(&corpus_path)?;

    let engine = build_engine(config, index, load_providers(cli.providers.as_ref())?)?;

    match cli.command {
        Command::Ask { question } => {
            let question = question.join(" ");
            let conversation = ConversationId::generate();
            let answer = engine.answer(&question, &conversation)?;
            println!("{}", answer.text);
            if cli.verbose && !answer.sources.is_empty() {
                let ids: Vec<&str> = answer.sources.iter().map(|id| id.as_str()).collect();
                eprintln!("sources: {}", ids.join(", "));
            }
            Ok(())
        }
        Command::Metrics { iteration, json } => {
            let metrics = engine.metrics(&iteration);
            if json {
                println!("{}", serde_json::to_string_pretty(&metrics)?);
            } else {
                println!("{}", metrics_block(&metrics));
            }
            Ok(())
        }
        Command::Chat => run_chat(&engine),
    }
}

fn build_engine(
    config: EngineConfig,
    index: braq_core::InMemoryItemIndex,
    providers: ProvidersFile,
) -> Result<AnswerEngine> {
    let mut engine = AnswerEngine::new(config, Box::new(index))?;

    if let Some(section) = providers.embedding {
        engine = engine.with_embedder(Box::new(HttpEmbeddingClient::new(
            section.provider,
            section.dimension,
        )));
    }
    if let Some(provider) = providers.rerank {
        engine = engine.with_reranker(Box::new(HttpRerankClient::new(provider)));
    }
    if let Some(provider) = providers.language_model {
        engine = engine.with_language_model(Box::new(HttpLanguageModel::new(provider)));
    }

    Ok(engine)
}

/// Interactive loop: one conversation, follow-ups resolve against it.
fn run_chat(engine: &AnswerEngine) -> Result<()> {
    let conversation = ConversationId::generate();
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    println!("braq chat – ask about your backlog (exit/quit to leave)");
    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        match engine.answer(question, &conversation) {
            Ok(answer) => println!("{}\n", answer.text),
            Err(e) => eprintln!("error: {:#}\n", e),
        }
    }

    Ok(())
}
