//! Interactive REPL mode for docqa
//!
//! Run `docqa chat` to enter interactive mode. Plain lines are questions
//! about the loaded document; slash commands manage the session.

use anyhow::{Context, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::chunking::Upload;
use crate::render::render_conversation;
use crate::session::{AskOutcome, LoadOutcome, Phase, Session, GENERATION_FAILED_MESSAGE};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Command definition with name and description
struct Command {
    name: &'static str,
    description: &'static str,
}

const COMMANDS: &[Command] = &[
    Command { name: "/open", description: "Load a PDF file" },
    Command { name: "/sample", description: "Load the sample document" },
    Command { name: "/suggest", description: "Show suggested questions" },
    Command { name: "/history", description: "Show the conversation" },
    Command { name: "/export", description: "Write the conversation as HTML" },
    Command { name: "/reset", description: "Start over with no document" },
    Command { name: "/help", description: "Show this help" },
    Command { name: "/exit", description: "Exit" },
];

/// Print the welcome banner
fn print_banner() {
    println!();
    println!("  {} v{}", "docqa".green().bold(), VERSION);
    println!("  {}", "Ask questions about a PDF".dimmed());
    println!();
    println!("  {}", "Try:".dimmed());
    println!("    {} {}  {}", ">".green(), "/open report.pdf".white(), "(Load a document)".dimmed());
    println!("    {} {}  {}", ">".green(), "/sample".white(), "(Use the built-in sample)".dimmed());
    println!();
}

/// Spinner on stderr showing the session's status line
pub fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Print numbered suggestions
pub fn print_suggestions(suggestions: &[String]) {
    if suggestions.is_empty() {
        return;
    }
    println!("{}", "Suggested questions:".green().bold());
    for (i, question) in suggestions.iter().enumerate() {
        println!("  {} {}", format!("{}.", i + 1).cyan(), question.white());
    }
}

fn print_last_system_message(session: &Session) {
    if let Some(message) = session.messages().last() {
        println!("{}", message.content.dimmed());
    }
}

/// Wait for suggestions to arrive and show them
async fn finish_load(session: &Session, outcome: LoadOutcome) {
    match outcome {
        LoadOutcome::Loaded(task) => {
            print_last_system_message(session);
            let bar = spinner(&session.status().unwrap_or_default());
            task.wait().await;
            bar.finish_and_clear();
            print_suggestions(&session.suggestions());
        }
        LoadOutcome::Ignored => {
            println!("{}", "Busy, try again in a moment.".yellow());
        }
    }
}

/// Upload a PDF from disk into the session. Returns true when it loaded.
pub async fn open_pdf(session: &Session, path: &Path) -> Result<bool> {
    let upload = Upload::from_path(path)?;

    let bar = spinner(crate::session::STATUS_PROCESSING);
    let result = session.upload(upload).await;
    bar.finish_and_clear();

    match result {
        Ok(outcome) => {
            let loaded = matches!(outcome, LoadOutcome::Loaded(_));
            finish_load(session, outcome).await;
            Ok(loaded)
        }
        Err(e) => {
            let message = session.error().unwrap_or_else(|| e.to_string());
            println!("{} {} ({})", "Error:".red().bold(), message, e.to_string().dimmed());
            Ok(false)
        }
    }
}

/// Load the built-in sample document
pub async fn open_sample(session: &Session) {
    let outcome = session.load_sample().await;
    finish_load(session, outcome).await;
}

/// What to ask the session
#[derive(Debug, Clone, Copy)]
enum Question<'a> {
    Text(&'a str),
    Suggestion(usize),
}

/// Ask a question and stream the answer to stdout
pub async fn stream_answer(session: &Session, query: &str) -> AskOutcome {
    ask_with_output(session, Question::Text(query)).await
}

/// Run a question with a spinner until the first fragment, then print
/// fragments as they arrive.
async fn ask_with_output(session: &Session, question: Question<'_>) -> AskOutcome {
    let bar = spinner(crate::session::STATUS_RETRIEVING);
    let on_fragment = {
        let bar = bar.clone();
        move |fragment: &str| {
            if !bar.is_finished() {
                bar.finish_and_clear();
            }
            print!("{}", fragment);
            let _ = io::stdout().flush();
        }
    };

    let outcome = match question {
        Question::Text(query) => session.ask(query, on_fragment).await,
        Question::Suggestion(index) => session.ask_suggestion(index, on_fragment).await,
    };
    bar.finish_and_clear();
    if outcome == AskOutcome::Answered {
        println!();
    }
    report_outcome(session, outcome);
    outcome
}

fn report_outcome(session: &Session, outcome: AskOutcome) {
    match outcome {
        AskOutcome::Answered | AskOutcome::Superseded => {}
        AskOutcome::Failed => println!("{}", GENERATION_FAILED_MESSAGE.red()),
        AskOutcome::Ignored => {
            if session.document_name().is_none() {
                println!(
                    "{}",
                    "No document loaded. Use /open <file.pdf> or /sample.".yellow()
                );
            } else if session.is_busy() {
                println!("{}", "Busy, try again in a moment.".yellow());
            }
        }
    }
}

/// Run the interactive REPL
pub async fn run_repl(session: Session) -> Result<()> {
    print_banner();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let prompt = match session.document_name() {
            Some(name) => format!("{} > ", name).cyan(),
            None => "> ".cyan(),
        };
        print!("{}", prompt);
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let input = line.trim();

        if input.is_empty() {
            continue;
        }

        if input.starts_with('/') {
            let should_exit = handle_command(input, &session).await?;
            if should_exit {
                println!("{}", "Goodbye!".cyan());
                break;
            }
        } else if let Some(index) = suggestion_index(input, session.suggestions().len()) {
            ask_with_output(&session, Question::Suggestion(index)).await;
        } else {
            stream_answer(&session, input).await;
        }

        println!(); // Empty line after output
    }

    Ok(())
}

/// A bare number picks the matching suggested question
fn suggestion_index(input: &str, available: usize) -> Option<usize> {
    let n: usize = input.parse().ok()?;
    (1..=available).contains(&n).then(|| n - 1)
}

/// Handle slash commands. Returns true if should exit.
async fn handle_command(input: &str, session: &Session) -> Result<bool> {
    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    let cmd = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match cmd.as_str() {
        "/exit" | "/quit" | "/q" => {
            return Ok(true);
        }
        "/help" | "/h" | "/?" => {
            println!("{}", "Commands:".green().bold());
            println!();
            println!("  {}  {}", format!("{:<12}", "<question>").dimmed(), "Ask about the document (default)".white());
            println!("  {}  {}", format!("{:<12}", "<n>").dimmed(), "Ask suggested question n".white());
            println!();
            for cmd in COMMANDS {
                println!("  {}  {}", format!("{:<12}", cmd.name).dimmed(), cmd.description.white());
            }
        }
        "/open" | "/o" => {
            if args.is_empty() {
                println!("{}", "Usage: /open <file.pdf>".yellow());
            } else if let Err(e) = open_pdf(session, Path::new(args)).await {
                println!("{} {:#}", "Error:".red().bold(), e);
            }
        }
        "/sample" => {
            open_sample(session).await;
        }
        "/suggest" | "/s" => {
            let suggestions = session.suggestions();
            if suggestions.is_empty() {
                println!("{}", "No suggestions available.".yellow());
            } else {
                print_suggestions(&suggestions);
            }
        }
        "/history" => {
            for message in session.messages() {
                println!("{} {}", format!("[{}]", message.role.as_str()).dimmed(), message.content);
            }
        }
        "/export" => {
            if args.is_empty() {
                println!("{}", "Usage: /export <file.html>".yellow());
            } else {
                let title = session.document_name().unwrap_or_else(|| "Conversation".to_string());
                let page = render_conversation(&title, &session.messages());
                std::fs::write(args, page)
                    .with_context(|| format!("Failed to write {}", args))?;
                println!("{} {}", "Wrote".green().bold(), args);
            }
        }
        "/reset" => {
            session.reset();
            println!("{}", "Session reset.".green());
        }
        _ => {
            println!("{} Unknown command: {}", "Error:".red().bold(), cmd);
            println!("Type {} for available commands.", "/help".yellow());
        }
    }

    if session.phase() == Phase::Empty && cmd == "/reset" {
        println!("{}", "Use /open <file.pdf> or /sample to load a document.".dimmed());
    }

    Ok(false)
}
