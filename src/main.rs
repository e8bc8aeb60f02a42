use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::{FuzzySelect, Input, MultiSelect, Select};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use study_chat::{
    chat::{ChatOutcome, ChatSession},
    config::AppConfig,
    documents::DocumentLibrary,
    error::GoogleGenerativeAIError,
    export::{export_csv, export_docx, is_tabular},
    generator::ModelStream,
    history::{HistoryStore, Role, Transcript},
    prompt::StudyMode,
    registry::ModelRegistry,
    GenerativeModel,
};

/// Study your PDF materials with Gemini.
#[derive(Debug, Parser)]
#[command(name = "study-chat", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start an interactive study chat (default)
    Chat {
        /// Answer style: quiz, chat, summary or table
        #[arg(long, default_value = "chat")]
        mode: StudyMode,
        /// Document to use as context; repeat for several
        #[arg(long = "doc")]
        docs: Vec<String>,
    },
    /// Copy PDF files into the document folder
    Upload {
        /// PDF files to add
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show the models that will be tried, in order
    Models,
    /// List saved chat sessions
    History,
}

struct PrettyPrinter;

impl PrettyPrinter {
    fn print_banner() {
        println!("{}", "📚 Study Chat".bright_green().bold());
        println!("{}", "═".repeat(50).bright_green());
    }

    fn print_help() {
        println!("\n{}", "Commands".bright_blue().bold());
        for (command, description) in [
            ("/mode", "choose the answer style"),
            ("/docs", "choose the documents used as context"),
            ("/save", "save this session"),
            ("/load", "load a saved session"),
            ("/clear", "forget the conversation"),
            ("/export", "write the last table answer to datos.csv"),
            ("/word", "write the last answer to a Word document"),
            ("/quit", "leave"),
        ] {
            println!("  {:<10} {}", command.bright_white(), description);
        }
    }

    fn print_transcript(transcript: &Transcript) {
        for message in transcript.messages() {
            let prefix = match message.role {
                Role::User => "👤 You:".blue().bold(),
                Role::Assistant => "🤖 Assistant:".green().bold(),
            };
            println!("\n{}", prefix);
            println!("{}", message.content);
        }
    }

    fn print_success(message: &str) {
        println!("{} {}", "✓".green(), message.green());
    }

    fn print_warning(message: &str) {
        println!("{} {}", "⚠️".yellow(), message.yellow());
    }

    fn print_error(error: &dyn std::error::Error) {
        eprintln!("{} {}", "❌ Error:".red().bold(), error.to_string().red());
    }

    fn print_thinking() -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Thinking...");
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            PrettyPrinter::print_error(&e);
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Command::Chat {
        mode: StudyMode::default(),
        docs: Vec::new(),
    }) {
        Command::Chat { mode, docs } => run_chat(&config, mode, docs).await,
        Command::Upload { files } => upload(&config, &files),
        Command::Models => list_models(&config).await,
        Command::History => list_sessions(&config),
    }
}

fn upload(config: &AppConfig, files: &[PathBuf]) -> Result<()> {
    let library = DocumentLibrary::open(&config.docs_dir)?;
    for file in files {
        match library.save_upload(file) {
            Ok(name) => PrettyPrinter::print_success(&format!("Stored {}", name)),
            Err(e) => PrettyPrinter::print_error(&e),
        }
    }
    Ok(())
}

async fn list_models(config: &AppConfig) -> Result<()> {
    let client = GenerativeModel::from_config(config);
    let registry = ModelRegistry::from_config(config);
    let pb = PrettyPrinter::print_thinking();
    let models = registry.models(&client).await;
    pb.finish_and_clear();

    println!("{}", "🤖 Models, in the order they are tried:".bright_blue().bold());
    for (i, model) in models.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, model.bright_white());
    }
    Ok(())
}

fn list_sessions(config: &AppConfig) -> Result<()> {
    let store = HistoryStore::open(&config.history_dir)?;
    let sessions = store.list()?;
    if sessions.is_empty() {
        PrettyPrinter::print_warning("No saved sessions");
    }
    for session in sessions {
        println!("  {} {}", "•".bright_magenta(), session.bright_white());
    }
    Ok(())
}

fn choose_documents(available: &[String], current: &[String]) -> Result<Vec<String>> {
    if available.is_empty() {
        PrettyPrinter::print_warning("No PDFs yet. Add some with `study-chat upload <file.pdf>`.");
        return Ok(Vec::new());
    }
    let defaults: Vec<bool> = available.iter().map(|d| current.contains(d)).collect();
    let chosen = MultiSelect::new()
        .with_prompt("📚 Documents (space to toggle, enter to confirm)")
        .items(available)
        .defaults(&defaults)
        .interact()?;
    Ok(chosen.into_iter().map(|i| available[i].clone()).collect())
}

fn choose_mode(current: StudyMode) -> Result<StudyMode> {
    let position = StudyMode::ALL
        .iter()
        .position(|m| *m == current)
        .unwrap_or_default();
    let index = Select::new()
        .with_prompt("Mode")
        .items(&StudyMode::ALL)
        .default(position)
        .interact()?;
    Ok(StudyMode::ALL[index])
}

/// Prints the answer as it arrives and returns the full text once the
/// stream has finished cleanly.
async fn print_stream(mut answer: ModelStream) -> Result<String, GoogleGenerativeAIError> {
    println!("\n{} {}", "🤖 Assistant".green().bold(), format!("({})", answer.model).bright_black());
    let mut full = String::new();
    while let Some(chunk) = answer.stream.next().await {
        let text = match chunk {
            Ok(text) => text,
            Err(e) => {
                println!();
                return Err(e);
            }
        };
        print!("{}", text);
        let _ = std::io::stdout().flush();
        full.push_str(&text);
    }
    println!();
    Ok(full)
}

async fn run_chat(config: &AppConfig, mut mode: StudyMode, docs: Vec<String>) -> Result<()> {
    PrettyPrinter::print_banner();
    println!(
        "{}",
        "Type your question, or /help for commands."
            .bright_black()
            .italic()
    );

    let client = GenerativeModel::from_config(config);
    let mut session = ChatSession::new(client, config)?;

    let mut selection = if docs.is_empty() {
        choose_documents(&session.documents().list()?, &[])?
    } else {
        docs
    };

    loop {
        let input: String = Input::<String>::new().with_prompt("You").interact_text()?;

        match input.trim() {
            "/help" => PrettyPrinter::print_help(),
            "/quit" | "/exit" => break,
            "/mode" => {
                mode = choose_mode(mode)?;
                PrettyPrinter::print_success(&format!("Mode: {}", mode));
            }
            "/docs" => match session.documents().list() {
                Ok(available) => selection = choose_documents(&available, &selection)?,
                Err(e) => PrettyPrinter::print_error(&e),
            },
            "/save" => match session.save() {
                Ok(Some(path)) => {
                    PrettyPrinter::print_success(&format!("Saved {}", path.display()))
                }
                Ok(None) => PrettyPrinter::print_warning("Nothing to save yet"),
                Err(e) => PrettyPrinter::print_error(&e),
            },
            "/load" => {
                let sessions = match session.history().list() {
                    Ok(sessions) => sessions,
                    Err(e) => {
                        PrettyPrinter::print_error(&e);
                        continue;
                    }
                };
                if sessions.is_empty() {
                    PrettyPrinter::print_warning("No saved sessions");
                    continue;
                }
                let index = FuzzySelect::new()
                    .with_prompt("Session")
                    .items(&sessions)
                    .default(0)
                    .interact()?;
                match session.load(&sessions[index]) {
                    Ok(()) => PrettyPrinter::print_transcript(session.transcript()),
                    Err(e) => PrettyPrinter::print_error(&e),
                }
            }
            "/clear" => {
                session.reset();
                PrettyPrinter::print_success("Chat history cleared");
            }
            "/export" => match session.transcript().last_assistant() {
                Some(answer) if is_tabular(mode, answer) => {
                    match export_csv(&config.export_dir, answer) {
                        Ok(path) => {
                            PrettyPrinter::print_success(&format!("Exported {}", path.display()))
                        }
                        Err(e) => PrettyPrinter::print_error(&e),
                    }
                }
                Some(_) => PrettyPrinter::print_warning(
                    "The last answer is not a table; use /word or ask in table mode",
                ),
                None => PrettyPrinter::print_warning("No answer to export yet"),
            },
            "/word" => match session.transcript().last_assistant() {
                Some(answer) => match export_docx(&config.export_dir, answer) {
                    Ok(path) => {
                        PrettyPrinter::print_success(&format!("Exported {}", path.display()))
                    }
                    Err(e) => PrettyPrinter::print_error(&e),
                },
                None => PrettyPrinter::print_warning("No answer to export yet"),
            },
            "" => {}
            question => {
                let pb = PrettyPrinter::print_thinking();
                let outcome = session.ask(question, mode, &selection).await;
                pb.finish_and_clear();

                match outcome {
                    ChatOutcome::NoDocuments => PrettyPrinter::print_warning(
                        "Select some PDFs first with /docs.",
                    ),
                    ChatOutcome::Failed(failure) => PrettyPrinter::print_error(&failure),
                    ChatOutcome::Streaming(answer) => match print_stream(answer).await {
                        Ok(text) => {
                            if is_tabular(mode, &text) {
                                println!(
                                    "{}",
                                    "📊 Table detected: /export writes it to datos.csv"
                                        .bright_black()
                                );
                            }
                            session.record_answer(text);
                        }
                        Err(e) => PrettyPrinter::print_error(&e),
                    },
                }
            }
        }
    }

    println!("\n✨ Good luck with your exams!");
    Ok(())
}
