//! docqa CLI
//!
//! Commands:
//!   chat    - Interactive question session over a PDF
//!   ask     - Ask a single question and stream the answer
//!   suggest - Print suggested questions for a PDF
//!   chunks  - Show how a PDF is chunked and ranked (no model call)
//!   config  - Show the effective configuration

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use docqa::chunking::Upload;
use docqa::repl::{open_pdf, open_sample, stream_answer};
use docqa::sample::sample_chunks;
use docqa::{run_repl, AskOutcome, Config, GeminiProvider, PdfChunker, SearchEngine, Session};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Ask questions about a PDF and get streamed answers")]
#[command(version)]
struct Cli {
    /// Use the built-in sample document instead of a PDF
    #[arg(long, global = true)]
    sample: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive session
    Chat {
        /// PDF to load on startup
        pdf: Option<PathBuf>,
    },

    /// Ask a single question
    Ask {
        /// PDF followed by the question (just the question with --sample)
        #[arg(required = true, num_args = 1.., value_name = "ARGS")]
        args: Vec<String>,
    },

    /// Print suggested questions for a document
    Suggest {
        /// PDF to inspect (omit with --sample)
        pdf: Option<PathBuf>,
    },

    /// Show chunks and, with a query, their ranking
    Chunks {
        /// PDF to inspect (omit with --sample)
        pdf: Option<PathBuf>,

        /// Rank chunks against this query
        #[arg(short, long)]
        query: Option<String>,

        /// Number of ranked chunks to show
        #[arg(short, long)]
        count: Option<usize>,
    },

    /// Show the effective configuration
    Config,
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Split `ask` arguments into the PDF path and the question text
fn split_ask_args(args: Vec<String>, sample: bool) -> Result<(Option<PathBuf>, String)> {
    let mut args = args.into_iter();
    let pdf = if sample { None } else { args.next().map(PathBuf::from) };
    let query = args.collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        bail!("No question given.");
    }
    Ok((pdf, query))
}

/// Build the session, failing fast when the credential is missing
fn build_session(config: &Config) -> Result<Session> {
    let provider = GeminiProvider::from_env(config).context("Cannot reach the model")?;
    Ok(Session::new(Arc::new(provider), config))
}

/// A PDF path and `--sample` name two different documents
fn reject_both(pdf: Option<&PathBuf>, sample: bool) -> Result<()> {
    if let (Some(path), true) = (pdf, sample) {
        bail!(
            "Both {} and --sample given. Pass either a PDF path or --sample.",
            path.display()
        );
    }
    Ok(())
}

/// Load the requested document into the session. Returns false on failure.
async fn load_document(session: &Session, pdf: Option<&PathBuf>, sample: bool) -> Result<bool> {
    reject_both(pdf, sample)?;
    match (pdf, sample) {
        (_, true) => {
            open_sample(session).await;
            Ok(true)
        }
        (Some(path), false) => open_pdf(session, path).await,
        (None, false) => bail!("No document given. Pass a PDF path or --sample."),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default()?;
    init_logging(&config);

    match cli.command {
        Commands::Chat { pdf } => {
            reject_both(pdf.as_ref(), cli.sample)?;
            let session = build_session(&config)?;
            if pdf.is_some() || cli.sample {
                load_document(&session, pdf.as_ref(), cli.sample).await?;
            }
            run_repl(session).await?;
        }

        Commands::Ask { args } => {
            let (pdf, query) = split_ask_args(args, cli.sample)?;
            let session = build_session(&config)?;
            if !load_document(&session, pdf.as_ref(), cli.sample).await? {
                std::process::exit(1);
            }
            println!();
            println!("{} {}", ">".green(), query.white().bold());
            if stream_answer(&session, &query).await != AskOutcome::Answered {
                std::process::exit(1);
            }
        }

        Commands::Suggest { pdf } => {
            reject_both(pdf.as_ref(), cli.sample)?;
            let session = build_session(&config)?;
            if !load_document(&session, pdf.as_ref(), cli.sample).await? {
                std::process::exit(1);
            }
            if session.suggestions().is_empty() {
                println!("{}", "No suggestions available.".yellow());
            }
        }

        Commands::Chunks { pdf, query, count } => {
            reject_both(pdf.as_ref(), cli.sample)?;
            let chunks = if cli.sample {
                sample_chunks()
            } else {
                let path = pdf.context("No document given. Pass a PDF path or --sample.")?;
                let upload = Upload::from_path(&path)?;
                PdfChunker::with_sizes(config.chunk_size, config.chunk_overlap).process(&upload)?
            };

            match query {
                Some(query) => {
                    let engine = SearchEngine::with_count(count.unwrap_or(config.top_k));
                    let results = engine.search(&query, &chunks);
                    println!("Ranked {} of {} chunks for: {}\n", results.len(), chunks.len(), query);
                    for (i, chunk) in results.iter().enumerate() {
                        print_chunk(i + 1, chunk.index, &chunk.text);
                    }
                }
                None => {
                    println!("{} chunks\n", chunks.len());
                    for chunk in chunks.iter().take(count.unwrap_or(usize::MAX)) {
                        print_chunk(chunk.index + 1, chunk.index, &chunk.text);
                    }
                }
            }
        }

        Commands::Config => {
            let path = Config::path()?;
            let exists = path.exists();
            println!(
                "{} {}{}",
                "Config file:".green().bold(),
                path.display(),
                if exists { "" } else { " (not found, using defaults)" }
            );
            println!();
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn print_chunk(rank: usize, index: usize, text: &str) {
    println!(
        "  {}. {}",
        rank.to_string().cyan().bold(),
        format!("[chunk {}, {} chars]", index, text.chars().count()).dimmed()
    );
    // Show preview (first 150 chars)
    let preview: String = text.chars().take(150).collect::<String>().replace('\n', " ");
    println!("     {}", preview.dimmed());
    println!();
}
