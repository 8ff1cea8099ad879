//! # TerraForge CLI
//!
//! Command-line front end for the TerraForge session.
//!
//! Usage:
//!   terraforge generate <prompt>
//!   terraforge edit --file main.tf --instructions "add tags"
//!   terraforge analyze --file main.tf
//!   terraforge history list
//!
//! Examples:
//!   terraforge generate "Create an S3 bucket with versioning enabled" --out main.tf
//!   cat main.tf | terraforge edit --file - --instructions "Add a Name tag to every resource"
//!   terraforge analyze --draft
//!   terraforge history restore 1b4e28ba-2fa1-11d2-883f-0016d3cca427 --out restored.tf

use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use terraforge_core::store::current_timestamp_ms;
use terraforge_core::{
    AppConfig, Error, GeminiProvider, HistoryRecord, InferenceClient, OperationMode,
    PersistenceStore, Result,
};
use terraforge_session::{ActionReport, SessionController};
use tracing::debug;

/// Exit code for a run that had nothing to do
const EXIT_NOTHING_TO_RUN: u8 = 2;

#[derive(Parser)]
#[command(name = "terraforge")]
#[command(author, version, about = "TerraForge - Terraform generation, editing and analysis with Gemini")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding history and drafts (default: .terraforge)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Model to use instead of the configured one
    #[arg(long, global = true)]
    model: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode - only print the output itself
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate Terraform code from a description
    Generate {
        /// What to build
        prompt: Vec<String>,

        /// Start from the saved draft
        #[arg(long)]
        draft: bool,

        /// Also write the output to this file (or directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Modify existing Terraform code
    Edit {
        /// File with the current code, or '-' for stdin
        #[arg(short, long)]
        file: Option<String>,

        /// What to change
        #[arg(short, long)]
        instructions: Option<String>,

        /// Start from the saved draft
        #[arg(long)]
        draft: bool,

        /// Also write the output to this file (or directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Review Terraform code for security, cost and correctness
    Analyze {
        /// File with the code, or '-' for stdin
        #[arg(short, long)]
        file: Option<String>,

        /// Start from the saved draft
        #[arg(long)]
        draft: bool,

        /// Also write the report to this file (or directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Browse past results
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
    /// Inspect or prepare per-mode drafts
    Draft {
        #[command(subcommand)]
        command: DraftCommand,
    },
}

#[derive(Subcommand)]
enum HistoryCommand {
    /// List records, newest first
    List,
    /// Print one record in full
    Show { id: String },
    /// Delete one record
    Delete { id: String },
    /// Delete every record
    Clear,
    /// Load a record back into the session and print its output
    Restore {
        id: String,

        /// Also write the output to this file (or directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum DraftCommand {
    /// Overwrite the draft for a mode
    Save {
        #[arg(value_parser = parse_draft_mode)]
        mode: OperationMode,

        /// File with the draft content, or '-' for stdin
        #[arg(short, long)]
        file: Option<String>,

        /// Edit instructions to keep with the draft
        #[arg(short, long)]
        instruction: Option<String>,
    },
    /// Print the draft for a mode
    Show {
        #[arg(value_parser = parse_draft_mode)]
        mode: OperationMode,
    },
}

/// What a Generate/Edit/Analyze invocation asked for
struct RunRequest {
    mode: OperationMode,
    input: Option<String>,
    instruction: Option<String>,
    use_draft: bool,
    out: Option<PathBuf>,
}

type Session = SessionController<InferenceClient<GeminiProvider>>;

// ============================================================================
// Helpers
// ============================================================================

fn parse_draft_mode(s: &str) -> std::result::Result<OperationMode, String> {
    let mode: OperationMode = s.parse().map_err(|e: Error| e.message().to_string())?;
    if mode.is_actionable() {
        Ok(mode)
    } else {
        Err(format!("{} has no draft", mode))
    }
}

/// Read a whole file, or stdin for `-`
fn read_input(source: &str) -> Result<String> {
    let mut content = String::new();
    if source == "-" {
        std::io::stdin().read_to_string(&mut content)?;
    } else {
        content = std::fs::read_to_string(source)?;
    }
    Ok(content)
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{}…", cut)
    }
}

/// First non-blank line, shortened for listings
fn preview(s: &str) -> String {
    let line = s.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    truncate(line, 48)
}

fn format_age(now_ms: u64, then_ms: u64) -> String {
    let secs = now_ms.saturating_sub(then_ms) / 1000;
    match secs {
        0..=59 => format!("{}s ago", secs),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
    if let Err(err) = installed {
        eprintln!("Logging disabled: {}", err);
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::from_env()?;
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir.clone());
    }
    if let Some(model) = &cli.model {
        config = config.with_model(model.clone());
    }
    Ok(config)
}

fn open_session(config: &AppConfig) -> Result<Session> {
    let provider = GeminiProvider::new(config.provider_config())?;
    let client = InferenceClient::new(provider).with_model(config.model.clone());
    let store = PersistenceStore::file(&config.data_dir)?;
    Ok(SessionController::new(client, store))
}

fn export(session: &Session, out: Option<&Path>, quiet: bool) -> Result<()> {
    if let Some(out) = out {
        let path = session.export_output(out)?;
        if !quiet {
            eprintln!("Saved to {}", path.display());
        }
    }
    Ok(())
}

fn print_record(record: &HistoryRecord) {
    println!("id:        {}", record.id);
    println!("type:      {}", record.mode);
    println!("model:     {}", record.model);
    println!("timestamp: {}", record.timestamp);
    println!("\n--- input ---\n{}", record.input);
    if let Some(instruction) = &record.instruction {
        println!("\n--- instruction ---\n{}", instruction);
    }
    println!("\n--- output ---\n{}", record.output);
}

// ============================================================================
// Commands
// ============================================================================

async fn run_action(config: &AppConfig, request: RunRequest, quiet: bool) -> Result<ExitCode> {
    let mut session = open_session(config)?;
    session.set_mode(request.mode);

    let needs_draft = request.use_draft
        || request.input.is_none()
        || (request.mode.takes_instruction() && request.instruction.is_none());
    if needs_draft {
        session.load_draft();
    }
    if let Some(input) = request.input {
        session.set_input(input);
    }
    if let Some(instruction) = request.instruction {
        session.set_instruction(instruction);
    }

    // the draft always reflects the last attempt
    session.save_draft();
    debug!(mode = %request.mode, draft = needs_draft, "input prepared");
    if !quiet {
        eprintln!("{} ({})\n", request.mode.title(), config.model);
    }

    match session.run_action().await {
        ActionReport::Skipped => {
            eprintln!("Nothing to run: {} input is empty.", request.mode.as_str().to_lowercase());
            Ok(ExitCode::from(EXIT_NOTHING_TO_RUN))
        }
        ActionReport::Succeeded(record) => {
            println!("{}", session.state().output);
            if !quiet {
                eprintln!("\nSaved to history as {}", record.id);
            }
            export(&session, request.out.as_deref(), quiet)?;
            Ok(ExitCode::SUCCESS)
        }
        ActionReport::Failed { kind } => {
            eprintln!("{}", session.state().output);
            if kind.is_retryable() && !quiet {
                eprintln!("(temporary, re-run to retry)");
            }
            Ok(ExitCode::FAILURE)
        }
        ActionReport::Unexpected => {
            eprintln!("{}", session.state().output);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run_history(config: &AppConfig, command: HistoryCommand, quiet: bool) -> Result<ExitCode> {
    match command {
        HistoryCommand::List => {
            let store = PersistenceStore::file(&config.data_dir)?;
            let history = store.list_history();
            if history.is_empty() {
                println!("No history yet.");
                return Ok(ExitCode::SUCCESS);
            }
            let now = current_timestamp_ms();
            for record in &history {
                println!(
                    "{}  {:>8}  {:<8}  {:<18}  {}",
                    record.id,
                    format_age(now, record.timestamp),
                    record.mode,
                    record.model,
                    preview(&record.input)
                );
            }
        }
        HistoryCommand::Show { id } => {
            let store = PersistenceStore::file(&config.data_dir)?;
            let record = store
                .find_history(&id)
                .ok_or_else(|| terraforge_core::error::history_not_found(&id))?;
            print_record(&record);
        }
        HistoryCommand::Delete { id } => {
            let mut store = PersistenceStore::file(&config.data_dir)?;
            if store.find_history(&id).is_none() {
                return Err(terraforge_core::error::history_not_found(&id));
            }
            let remaining = store.delete_history(&id);
            if !quiet {
                eprintln!("Deleted {} ({} left)", id, remaining.len());
            }
        }
        HistoryCommand::Clear => {
            let mut store = PersistenceStore::file(&config.data_dir)?;
            store.clear_history();
            if !quiet {
                eprintln!("History cleared");
            }
        }
        HistoryCommand::Restore { id, out } => {
            let mut session = open_session(config)?;
            session.restore_by_id(&id)?;
            if !quiet {
                let state = session.state();
                eprintln!("Restored {} into {} mode", id, state.mode);
                if !state.instruction.is_empty() {
                    eprintln!("Instruction: {}", state.instruction);
                }
            }
            println!("{}", session.state().output);
            export(&session, out.as_deref(), quiet)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_draft(config: &AppConfig, command: DraftCommand, quiet: bool) -> Result<ExitCode> {
    let mut store = PersistenceStore::file(&config.data_dir)?;
    match command {
        DraftCommand::Save {
            mode,
            file,
            instruction,
        } => {
            let content = file.as_deref().map(read_input).transpose()?.unwrap_or_default();
            store.save_draft(mode, &content, instruction.as_deref().unwrap_or_default());
            if !quiet {
                eprintln!("Draft saved for {}", mode);
            }
        }
        DraftCommand::Show { mode } => {
            let draft = store.load_draft(mode);
            println!("{}", draft.content);
            if mode.takes_instruction() {
                println!("\n--- instruction ---\n{}", draft.instruction);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;
    let quiet = cli.quiet;

    let request = match cli.command {
        Commands::Generate { prompt, draft, out } => RunRequest {
            mode: OperationMode::Generate,
            input: (!prompt.is_empty()).then(|| prompt.join(" ")),
            instruction: None,
            use_draft: draft,
            out,
        },
        Commands::Edit {
            file,
            instructions,
            draft,
            out,
        } => RunRequest {
            mode: OperationMode::Edit,
            input: file.as_deref().map(read_input).transpose()?,
            instruction: instructions,
            use_draft: draft,
            out,
        },
        Commands::Analyze { file, draft, out } => RunRequest {
            mode: OperationMode::Analyze,
            input: file.as_deref().map(read_input).transpose()?,
            instruction: None,
            use_draft: draft,
            out,
        },
        Commands::History { command } => return run_history(&config, command, quiet),
        Commands::Draft { command } => return run_draft(&config, command, quiet),
    };

    run_action(&config, request, quiet).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
