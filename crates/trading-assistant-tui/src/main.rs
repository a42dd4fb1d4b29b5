use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use trading_assistant_core::{ClientConfig, Config, Conversation, QueryClient, Sender};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "trading-assistant", version)]
#[command(about = "Smart Trading Assistant - live AI chat for real-time market Q&A")]
struct Cli {
    /// Base URL of the question-answering API
    #[arg(long, global = true, env = "ASSISTANT_API_BASE_URL")]
    base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "ASSISTANT_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer
    Ask {
        /// Your question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Show the resolved endpoint configuration
    Config {
        /// Persist the resolved settings to the config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let saved = Config::load().context("Fix or remove the saved config file")?;
    let client_config = ClientConfig::resolve(cli.base_url, cli.timeout_secs, &saved);

    match cli.command {
        None => {
            init_file_logging()?;
            run_tui(client_config).await
        }
        Some(Commands::Ask { question }) => {
            init_stderr_logging();
            let answer = ask_once(client_config, &question.join(" ")).await?;
            println!("{}", answer);
            Ok(())
        }
        Some(Commands::Config { save }) => show_config(&client_config, save),
    }
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn log_file_path() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .ok_or_else(|| anyhow!("Could not determine cache directory"))?;

    Ok(cache_dir.join("trading-assistant").join("trading-assistant.log"))
}

/// The TUI owns the terminal, so logs go to a file instead
fn init_file_logging() -> Result<()> {
    let path = log_file_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter("info"))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter("warn"))
        .with_writer(io::stderr)
        .init();
}

async fn run_tui(config: ClientConfig) -> Result<()> {
    let endpoint = config.ask_url();
    let client = QueryClient::new(config)?;
    info!(endpoint = %endpoint, "starting chat");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new(Arc::new(client), events.sender(), endpoint);

    let result = run_app(&mut terminal, &mut app, &mut events).await;

    app.shutdown();
    tui::restore()?;
    info!("chat closed");
    result
}

async fn run_app(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}

/// Send one question through a fresh conversation and return the answer
async fn ask_once(config: ClientConfig, question: &str) -> Result<String> {
    let client = QueryClient::new(config)?;
    let mut conversation = Conversation::new();
    conversation.input_mut().set(question);

    match conversation.ask_with(&client).await {
        None => bail!("question must not be empty"),
        Some(Err(e)) => bail!("{}", e),
        Some(Ok(())) => Ok(conversation
            .messages()
            .iter()
            .rev()
            .find(|m| m.sender == Sender::Assistant)
            .map(|m| m.text.clone())
            .unwrap_or_default()),
    }
}

fn config_summary(config: &ClientConfig) -> String {
    format!(
        "endpoint: {}\ntimeout:  {}s",
        config.ask_url(),
        config.timeout.as_secs()
    )
}

fn show_config(config: &ClientConfig, save: bool) -> Result<()> {
    println!("{}", config_summary(config));

    if save {
        let path = config.to_saved().save()?;
        println!("saved to {}", path.display());
    } else {
        println!("config file: {}", Config::get_config_path()?.display());
    }
    Ok(())
}
