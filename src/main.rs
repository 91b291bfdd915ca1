//! BERT Question Answering - Main Entry Point
//!
//! Loads the SQuAD model and answers questions about a text file.
//! Ctrl-C cancels the question currently being answered; at the idle prompt it quits.

use anyhow::{Context, Result};
use bert_qa::{config::LoggingConfig, AppConfig, CancellationToken, QaError, QuestionAnswering};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "bert-qa",
    version,
    about = "Answer questions about a text passage with a BERT SQuAD model."
)]
struct Cli {
    /// Configuration file (optional; defaults apply when missing)
    #[arg(long, default_value = "config/config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a single question
    Ask(AskArgs),

    /// Answer questions read from stdin, one per line
    Interactive(ContextArgs),

    /// Download the model and tokenizer without loading them
    Fetch,
}

#[derive(Args, Debug)]
struct ContextArgs {
    /// File holding the passage to answer from
    #[arg(long)]
    context_file: PathBuf,
}

#[derive(Args, Debug)]
struct AskArgs {
    #[command(flatten)]
    context: ContextArgs,

    /// The natural language question to answer
    #[arg(long)]
    question: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load_from_path(&cli.config)?;
    init_logging(&config.logging)?;
    info!(path = %cli.config.display(), "Configuration loaded");

    let service = QuestionAnswering::new(&config.model)?;

    match cli.command {
        Commands::Fetch => {
            service.fetch_artifacts().await?;
            info!("Model artifacts present");
            return Ok(());
        }
        Commands::Ask(args) => {
            let context = read_context(&args.context.context_file)?;
            initialize(&service).await?;
            match ask(&service, &context, &args.question).await {
                Ok(answer) => println!("{answer}"),
                Err(e) if e.is_cancelled() => warn!("Question cancelled"),
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Interactive(args) => {
            let context = read_context(&args.context_file)?;
            initialize(&service).await?;
            interactive(&service, &context).await?;
        }
    }

    service.metrics().print_summary();
    Ok(())
}

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("bert_qa={}", config.level).parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.format.as_str() {
        "json" => builder.json().init(),
        _ => builder.init(),
    }
    Ok(())
}

fn read_context(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read context file {}", path.display()))
}

/// Load the model; Ctrl-C before loading starts makes initialization return `false`
async fn initialize(service: &QuestionAnswering) -> Result<()> {
    let cancel = CancellationToken::new();
    let watcher = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let ready = service.initialize_model(&cancel).await;
    watcher.abort();

    if !ready? {
        anyhow::bail!("Model initialization cancelled");
    }
    Ok(())
}

/// Answer one question, cancelling it on Ctrl-C.
///
/// After a cancel the request still runs to its next checkpoint; further Ctrl-C is ignored.
async fn ask(
    service: &QuestionAnswering,
    context: &str,
    question: &str,
) -> Result<String, QaError> {
    let cancel = CancellationToken::new();
    let request = service.answer_question(context, question, cancel.clone());
    tokio::pin!(request);

    tokio::select! {
        outcome = &mut request => outcome,
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            request.await
        }
    }
}

async fn interactive(service: &QuestionAnswering, context: &str) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Ask a question about the passage (Ctrl-C or Ctrl-D to quit).");

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }

        match ask(service, context, question).await {
            Ok(answer) if answer.is_empty() => println!("(no answer)"),
            Ok(answer) => println!("{answer}"),
            Err(e) if e.is_cancelled() => println!("(cancelled)"),
            Err(e) => error!(error = %e, "Failed to answer question"),
        }
    }

    Ok(())
}
