//! camplab - terminal client for the CAMP Lab DeFi assistant
//!
//! Commands:
//! - `chat`: interactive conversation
//! - `ask`: a single round-trip
//! - `prompts`, `knowledge`: browse starter prompts and the knowledge base
//! - `history`: list archived exchanges
//! - `status`: show configuration and readiness
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/camplab/config.toml (~/.config/camplab/config.toml)
//! - Logs: $XDG_STATE_HOME/camplab/ (~/.local/state/camplab/)

mod render;

use std::io::Write;

use anyhow::{Context, Result};
use camplab_core::archive::ConversationArchive;
use camplab_core::config::API_KEY_ENV;
use camplab_core::gateway::{HttpGateway, RetryingGateway};
use camplab_core::{
    format, Config, KnowledgeBase, LabSession, Persona, SendOutcome, SendRejected, Session,
};
use clap::{Parser, Subcommand};
use crossterm::style::Stylize;
use tokio::io::{AsyncBufReadExt, BufReader};

type Lab = LabSession<RetryingGateway<HttpGateway>>;

#[derive(Parser)]
#[command(name = "camplab")]
#[command(about = "Talk to the CAMP Lab DeFi assistant")]
#[command(version)]
struct Args {
    /// Write debug logs to the state directory
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Assistant persona (overrides session.persona)
    #[arg(short, long, global = true)]
    persona: Option<Persona>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive conversation
    Chat,

    /// Send one message and print the reply
    Ask {
        /// Message text
        text: String,

        /// Print the assistant message as JSON
        #[arg(long)]
        json: bool,
    },

    /// List starter prompts
    Prompts,

    /// Search the knowledge base
    Knowledge {
        /// Search terms
        query: String,
    },

    /// List archived exchanges, newest first
    History {
        /// Number of exchanges to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show configuration and readiness
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(persona) = args.persona {
        config.session.persona = persona;
    }

    let _log_guard = if args.verbose {
        Some(camplab_core::logging::init(&config.logging).context("failed to initialize logging")?)
    } else {
        None
    };

    match args.command {
        Command::Chat => cmd_chat(&config).await,
        Command::Ask { text, json } => cmd_ask(&config, &text, json).await,
        Command::Prompts => cmd_prompts(config.session.persona),
        Command::Knowledge { query } => cmd_knowledge(&config, &query),
        Command::History { limit } => cmd_history(&config, limit).await,
        Command::Status => cmd_status(&config),
    }
}

fn open_lab(config: &Config) -> Result<Lab> {
    let gateway = HttpGateway::new(&config.gateway).context("assistant gateway is not configured")?;
    let gateway = RetryingGateway::new(gateway, config.gateway.max_retries);
    let session = Session::from_config(config).context("failed to start session")?;
    let archive =
        ConversationArchive::from_config(&config.archive).context("invalid archive configuration")?;

    tracing::info!(
        session_id = %session.id(),
        persona = %session.persona(),
        archive = archive.is_some(),
        "Session started"
    );

    Ok(LabSession::new(session, gateway).with_archive(archive))
}

fn load_knowledge(config: &Config) -> Result<KnowledgeBase> {
    let knowledge = match &config.session.knowledge_path {
        Some(path) => KnowledgeBase::load_from(path),
        None => KnowledgeBase::builtin(),
    };
    knowledge.context("failed to load knowledge base")
}

async fn cmd_ask(config: &Config, text: &str, json: bool) -> Result<()> {
    let lab = open_lab(config)?;

    let outcome = lab.send(text).await;
    let message = match &outcome {
        SendOutcome::Rejected(reason) => anyhow::bail!("message not sent: {}", reason),
        SendOutcome::Replied(message) | SendOutcome::Failed(message) => message,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(message)?);
    } else {
        render::print_message(message);
    }

    if let SendOutcome::Failed(_) = outcome {
        anyhow::bail!("assistant gateway request failed (see logs with --verbose)");
    }
    Ok(())
}

async fn cmd_chat(config: &Config) -> Result<()> {
    let lab = open_lab(config)?;
    let persona = config.session.persona;

    println!("{}", persona.display_name().bold());
    println!(
        "{}",
        "Type a message, /prompts for ideas, /status for progress, /quit to leave.".dark_grey()
    );
    println!();
    for message in lab.messages().await {
        render::print_message(&message);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ">".cyan().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        let text = match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/prompts" => {
                print_prompts(persona);
                continue;
            }
            "/status" => {
                print_session_status(&lab).await;
                continue;
            }
            command if command.starts_with('/') => match starter_prompt(persona, &command[1..]) {
                Some(question) => {
                    println!("{} {}", "you:".cyan(), question);
                    question
                }
                None => {
                    println!("Unknown command: {}", command);
                    continue;
                }
            },
            text => text,
        };

        match lab.send(text).await {
            SendOutcome::Rejected(SendRejected::InFlight) => {
                println!("{}", "Still waiting for the previous reply.".dark_grey());
            }
            SendOutcome::Rejected(SendRejected::EmptyMessage) => {}
            SendOutcome::Replied(message) | SendOutcome::Failed(message) => {
                println!();
                render::print_message(&message);
            }
        }
    }

    let stats = lab.archive_stats();
    if stats.saved > 0 || stats.failed > 0 {
        println!(
            "Archived {} exchange(s), {} failed.",
            stats.saved, stats.failed
        );
    }
    Ok(())
}

/// Question text for `/N` (1-based)
fn starter_prompt(persona: Persona, index: &str) -> Option<&'static str> {
    let index: usize = index.parse().ok()?;
    persona
        .starter_prompts()
        .get(index.checked_sub(1)?)
        .map(|prompt| prompt.question)
}

async fn print_session_status(lab: &Lab) {
    let (mode, count, progress) = lab
        .inspect(|session| {
            (
                session.mode(),
                session.messages().len(),
                session.latest_progress().cloned(),
            )
        })
        .await;

    println!("Mode:      {}", mode.as_str());
    println!("Messages:  {}", count);
    match progress {
        Some(progress) => render::print_progress(&progress),
        None => println!("Progress:  not tracked"),
    }
    println!();
}

fn print_prompts(persona: Persona) {
    for (i, prompt) in persona.starter_prompts().iter().enumerate() {
        println!(
            "{:>2}. {} {}",
            i + 1,
            prompt.question.bold(),
            format!("[{}]", prompt.category).dark_grey()
        );
        println!("    {}", prompt.description);
    }
}

fn cmd_prompts(persona: Persona) -> Result<()> {
    println!("Starter prompts ({})", persona.display_name());
    println!();
    print_prompts(persona);
    Ok(())
}

fn cmd_knowledge(config: &Config, query: &str) -> Result<()> {
    let knowledge = load_knowledge(config)?;
    let snippets = knowledge.search(query);

    if snippets.is_empty() {
        println!("No knowledge found for '{}'.", query);
        return Ok(());
    }

    println!("{} result(s) for '{}':", snippets.len(), query);
    println!();
    for snippet in snippets.iter().take(config.session.max_knowledge_snippets) {
        println!("{}", snippet.path.as_str().bold());
        println!("  {}", snippet.content);
    }
    Ok(())
}

async fn cmd_history(config: &Config, limit: usize) -> Result<()> {
    let Some(archive) = ConversationArchive::from_config(&config.archive)
        .context("invalid archive configuration")?
    else {
        println!("Conversation archive is disabled. Enable it in config.toml:");
        println!();
        println!("  [archive]");
        println!("  enabled = true");
        println!("  base_url = \"https://your-project.supabase.co\"");
        println!("  api_key = \"your-anon-key\"");
        return Ok(());
    };

    let user_id = config
        .identity
        .user_id
        .as_deref()
        .context("identity.user_id is required to read history")?;

    let records = archive
        .recent(user_id, limit)
        .await
        .context("failed to fetch conversation history")?;

    if records.is_empty() {
        println!("No archived conversations.");
        return Ok(());
    }

    for record in &records {
        println!(
            "{:>8}  {}",
            format::format_relative_time(record.created_at).dark_grey(),
            record.session_id.as_str().dark_grey()
        );
        println!("  {} {}", "you:".cyan(), format::preview(&record.message, 70));
        println!("  {} {}", "lab:".green(), format::preview(&record.response, 70));
    }
    Ok(())
}

fn cmd_status(config: &Config) -> Result<()> {
    println!("camplab Configuration");
    println!("=====================");
    println!();

    let gateway = &config.gateway;
    println!(
        "Endpoint:        {}",
        gateway.endpoint.as_deref().unwrap_or("<not set>")
    );
    println!(
        "API Key:         {}",
        if gateway.resolved_api_key().is_some() {
            "<set>"
        } else {
            "<not set>"
        }
    );
    println!("Timeout:         {}s", gateway.timeout_secs);
    println!("Max retries:     {}", gateway.max_retries);
    match gateway.validate() {
        Ok(()) => println!("Gateway:         ready"),
        Err(e) => println!("Gateway:         not ready ({})", e),
    }
    println!();

    println!("Persona:         {}", config.session.persona);
    println!("Context window:  {}", config.session.context_window);
    println!(
        "Knowledge:       {}",
        config
            .session
            .knowledge_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<built-in>".to_string())
    );
    println!(
        "User ID:         {}",
        config.identity.user_id.as_deref().unwrap_or("<not set>")
    );
    println!();

    println!("Archive:         {}", config.archive.enabled);
    if config.archive.enabled {
        match config.archive.validate() {
            Ok(()) => println!("Archive table:   {}", config.archive.table),
            Err(e) => println!("Archive error:   {}", e),
        }
    }
    println!();

    println!("Config file:     {}", Config::config_path().display());
    println!("Log directory:   {}", Config::state_dir().display());
    println!(
        "Log file:        {} (rotated daily)",
        camplab_core::logging::current_log_file().display()
    );

    if !gateway.is_ready() {
        println!();
        println!("To talk to the assistant, set the endpoint in config.toml:");
        println!();
        println!("  [gateway]");
        println!("  endpoint = \"https://your-project.supabase.co/functions/v1/lab-ai-coaching\"");
        println!();
        println!("and the key in config.toml or {}.", API_KEY_ENV);
    }
    Ok(())
}
