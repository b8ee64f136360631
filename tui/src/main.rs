//! twinchat TUI Entry Point
//!
//! Launches the terminal chat surface.
//!
//! Usage:
//!   twinchat [OPTIONS]
//!
//! Options:
//!   --conversation <ID>  Conversation to open
//!   --agent <ID>         Agent to address (overrides the configured default)
//!   --config <FILE>      Configuration file (default: ~/.config/twinchat/client.toml)
//!   --base-url <URL>     Backend base URL
//!   --rate-ms <N>        Typewriter rate in milliseconds per character
//!   --demo               Use the built-in demo conversations instead of a backend
//!   --verbose            Debug logging

use std::io::{self, IsTerminal};
use std::panic;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use twinchat_core::config::{load_config, load_config_from_path, ConfigOverrides};
use twinchat_core::{ConversationBackend, ConversationId, HttpBackend};
use twinchat_tui::demo;
use twinchat_tui::App;

/// twinchat - chat with your digital twins' agents from the terminal
#[derive(Parser, Debug)]
#[command(name = "twinchat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Conversation to open
    #[arg(short = 'C', long, env = "TWINCHAT_CONVERSATION", value_name = "ID")]
    conversation: Option<String>,

    /// Agent to address
    #[arg(short = 'a', long, value_name = "ID")]
    agent: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Backend base URL
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Typewriter rate in milliseconds per character
    #[arg(long, value_name = "MS")]
    rate_ms: Option<u64>,

    /// Use the built-in demo backend
    #[arg(long)]
    demo: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short = 'v', long)]
    verbose: bool,
}

/// Log to a file; stdout belongs to the terminal UI
fn init_logging(verbose: bool) -> Result<Option<PathBuf>> {
    let Some(dir) = dirs::state_dir().or_else(dirs::cache_dir) else {
        return Ok(None);
    };
    let dir = dir.join("twinchat");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    let path = dir.join("twinchat.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();

    Ok(Some(path))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_path = init_logging(args.verbose)?;

    // Configuration: file < env < CLI
    let mut config = match args.config {
        Some(ref path) => load_config_from_path(Some(path.clone()))?,
        None => load_config()?,
    };
    let mut overrides = ConfigOverrides::new();
    if let Some(ref url) = args.base_url {
        overrides = overrides.with_base_url(url.clone());
    }
    if let Some(ms) = args.rate_ms {
        overrides = overrides.with_typewriter_rate_ms(ms);
    }
    if let Some(ref agent) = args.agent {
        overrides = overrides.with_agent(agent.clone());
    }
    overrides.apply(&mut config)?;
    tracing::info!(source = %config.source(), log = ?log_path, "Configuration loaded");

    let (backend, conversations) = if args.demo {
        let conversations = match args.conversation {
            Some(id) => vec![ConversationId::new(id)],
            None => demo::demo_conversations(),
        };
        let backend: Arc<dyn ConversationBackend> = Arc::new(demo::demo_backend());
        (backend, conversations)
    } else {
        let Some(id) = args.conversation else {
            bail!("--conversation is required unless --demo is given");
        };
        let http = HttpBackend::from_settings(&config.backend)?;
        tracing::info!(base_url = http.base_url(), "Using HTTP backend");
        let backend: Arc<dyn ConversationBackend> = Arc::new(http);
        (backend, vec![ConversationId::new(id)])
    };

    // Check if we have a TTY before attempting initialization
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        bail!("twinchat requires a terminal (TTY); try running it interactively");
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;

    // Run the app
    let result = runtime.block_on(async {
        let mut app = App::new(backend, &config, conversations);
        app.start();
        app.run(&mut terminal).await
    });

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Propagate any errors
    result
}
