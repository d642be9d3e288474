//! CLI interface for sari-coach

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

use crate::coach::{AssistantSession, CoachClient, InteractionState, SubmitOutcome};
use crate::config::{self, Config};
use crate::voice::{select_voice, SpeechAnnouncer};

/// Shown while nothing has been asked yet
pub const IDLE_HINT: &str = "Ask me about sales, inventory, or strategy based on today's data.";

/// Shown while a question is in flight
pub const PENDING_LABEL: &str = "Analyzing store metrics...";

#[derive(Parser)]
#[command(name = "sari-coach")]
#[command(about = "Ask the store coach about sales, inventory, or strategy", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer
    Ask {
        /// Question text
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Start an interactive coach session (default when no command given)
    Chat {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// List voices reported by the speech engine
    Voices,
    /// Configure the coach
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
        /// Set the coach backend URL
        #[arg(long)]
        set_url: Option<String>,
        /// Set the default store id
        #[arg(long)]
        set_store: Option<i64>,
        /// Reset configuration to defaults
        #[arg(long)]
        reset: bool,
    },
}

#[derive(Args, Clone, Default)]
struct SessionArgs {
    /// Store to ask about (overrides config)
    #[arg(short, long)]
    store: Option<i64>,
    /// Coach backend URL (overrides config)
    #[arg(long)]
    url: Option<String>,
    /// Do not speak answers aloud
    #[arg(long)]
    no_speech: bool,
}

/// Run the CLI
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            run_chat(&SessionArgs::default()).await?;
        }
        Some(Commands::Ask { question, session }) => {
            ask_once(&question.join(" "), &session).await?;
        }
        Some(Commands::Chat { session }) => {
            run_chat(&session).await?;
        }
        Some(Commands::Voices) => {
            list_voices().await?;
        }
        Some(Commands::Config { show, set_url, set_store, reset }) => {
            match ConfigAction::from_flags(show, set_url, set_store, reset) {
                ConfigAction::Reset => config::reset_config()?,
                ConfigAction::SetUrl(url) => config::set_base_url(&url)?,
                ConfigAction::SetStore(store) => config::set_store_id(store)?,
                ConfigAction::Show => config::show_config()?,
                ConfigAction::Usage => print_config_usage(),
            }
        }
    }

    Ok(())
}

/// What `sari-coach config` was asked to do
#[derive(Debug, PartialEq)]
enum ConfigAction {
    Reset,
    SetUrl(String),
    SetStore(i64),
    Show,
    Usage,
}

impl ConfigAction {
    fn from_flags(show: bool, set_url: Option<String>, set_store: Option<i64>, reset: bool) -> Self {
        if reset {
            ConfigAction::Reset
        } else if let Some(url) = set_url {
            ConfigAction::SetUrl(url)
        } else if let Some(store) = set_store {
            ConfigAction::SetStore(store)
        } else if show {
            ConfigAction::Show
        } else {
            ConfigAction::Usage
        }
    }
}

fn print_config_usage() {
    println!("Configuration options:");
    println!("  --show                Display current configuration");
    println!("  --set-url <url>       Set the coach backend URL");
    println!("  --set-store <id>      Set the default store id");
    println!("  --reset               Reset configuration to defaults");
    println!();
    println!("Environment overrides: SARI_COACH_API_URL, SARI_COACH_STORE_ID");
}

/// Text the terminal shows for a state
pub fn render(state: &InteractionState) -> &str {
    match state {
        InteractionState::Idle => IDLE_HINT,
        InteractionState::Pending => PENDING_LABEL,
        InteractionState::Answered(answer) => &answer.text,
        InteractionState::Failed(message) => message,
    }
}

fn build_session(args: &SessionArgs) -> Result<AssistantSession> {
    let mut config = Config::load()?;
    if let Some(url) = &args.url {
        config.coach.base_url = url.clone();
    }
    if let Some(store) = args.store {
        config.coach.store_id = store;
    }
    if args.no_speech {
        config.speech.enabled = false;
    }

    let client = CoachClient::from_config(&config.coach)
        .context("Failed to create coach client")?;
    let announcer = SpeechAnnouncer::from_config(&config.speech);

    tracing::info!(
        url = %client.base_url(),
        store_id = config.coach.store_id,
        "Coach session ready"
    );

    Ok(AssistantSession::new(
        config.coach.store_id,
        Arc::new(client),
        Arc::new(announcer),
    ))
}

fn create_pending_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(PENDING_LABEL);
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

async fn wait_with_spinner(session: &AssistantSession) -> InteractionState {
    let spinner = create_pending_spinner();
    let state = session.settled().await;
    spinner.finish_and_clear();
    state
}

async fn ask_once(question: &str, args: &SessionArgs) -> Result<()> {
    let session = build_session(args)?;

    match session.submit(question) {
        SubmitOutcome::Dispatched => {}
        SubmitOutcome::EmptyQuestion => anyhow::bail!("Question is empty"),
        SubmitOutcome::AlreadyPending => anyhow::bail!("A question is already pending"),
    }

    let state = wait_with_spinner(&session).await;
    println!("{}", render(&state));

    // Let the synthesizer start before the process exits
    session.drained().await;
    Ok(())
}

async fn run_chat(args: &SessionArgs) -> Result<()> {
    let session = build_session(args)?;

    println!("\x1b[1;34mSariCoach AI\x1b[0m  (store {})", session.store_id());
    println!("\x1b[90m{}\x1b[0m", render(&session.state()));
    println!("\x1b[90m/close dismisses the last answer, /quit exits\x1b[0m\n");

    let config = rustyline::Config::builder()
        .edit_mode(rustyline::EditMode::Emacs)
        .auto_add_history(true)
        .build();
    let mut rl = rustyline::DefaultEditor::with_config(config)
        .context("Failed to initialize line editor")?;

    loop {
        match rl.readline("\x1b[34m❯\x1b[0m ") {
            Ok(line) => match line.trim() {
                "/quit" | "/exit" => break,
                "/close" => {
                    if session.dismiss() {
                        println!("\x1b[90m{}\x1b[0m", render(&session.state()));
                    }
                }
                _ => match session.submit(&line) {
                    SubmitOutcome::Dispatched => {
                        let state = wait_with_spinner(&session).await;
                        match state {
                            InteractionState::Failed(_) => {
                                println!("\x1b[31m{}\x1b[0m\n", render(&state))
                            }
                            _ => println!("{}\n", render(&state)),
                        }
                    }
                    SubmitOutcome::EmptyQuestion => continue,
                    SubmitOutcome::AlreadyPending => {
                        println!("\x1b[90mStill waiting on the last question...\x1b[0m");
                    }
                },
            },
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {}", err);
                break;
            }
        }
    }

    Ok(())
}

async fn list_voices() -> Result<()> {
    let mut config = Config::load()?;
    config.speech.enabled = true;
    let announcer = SpeechAnnouncer::from_config(&config.speech);

    if !announcer.engine().is_available() {
        println!("Speech program '{}' not found; answers will not be spoken.", config.speech.program);
        return Ok(());
    }

    let engine = Arc::clone(announcer.engine());
    let voices = tokio::task::spawn_blocking(move || engine.voices())
        .await
        .context("Voice listing task failed")?;
    if voices.is_empty() {
        println!("No voices reported; the default voice will be used.");
        return Ok(());
    }

    let chosen = select_voice(&voices, &announcer.config().preferred_voices);
    for voice in &voices {
        let marker = if chosen == Some(voice) { "*" } else { " " };
        match &voice.language {
            Some(lang) => println!(" {} {:<28} {}", marker, voice.name, lang),
            None => println!(" {} {}", marker, voice.name),
        }
    }
    if chosen.is_none() {
        println!("\nNo preferred voice matched; the default voice will be used.");
    }

    Ok(())
}
