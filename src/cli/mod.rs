use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::api::HttpClient;
use crate::app::App;
use crate::config::{AppConfig, ConfigLoader, CONFIG_ENV, DATA_ENV};
use crate::session::SessionStore;

pub mod commands;

use self::commands::{AuthArgs, DeleteArgs, EditArgs, ListArgs, NewArgs};

#[derive(Parser, Debug)]
#[command(
    name = "notes-remote",
    version,
    about = "Terminal client for a remote notes service"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over NOTES_REMOTE_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the session data directory (takes precedence over NOTES_REMOTE_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Service base URL, overriding [api].base_url from the config file
    #[arg(long)]
    pub base_url: Option<String>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive TUI (default)
    Tui,
    /// Log in and remember the session
    Login(AuthArgs),
    /// Create an account and remember the session
    Signup(AuthArgs),
    /// Forget the saved session
    Logout,
    /// Show who the saved session belongs to
    Whoami,
    /// Print notes, optionally filtered by a search term
    List(ListArgs),
    /// Create a note
    New(NewArgs),
    /// Replace the title and/or content of a note
    Edit(EditArgs),
    /// Delete a note after confirmation
    Delete(DeleteArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();

    let command = cli.command.unwrap_or(Commands::Tui);
    let log_target = match command {
        Commands::Tui => LogTarget::File(paths.log_dir.join("notes-remote.log")),
        _ => LogTarget::Stderr,
    };
    init_tracing(&cli.log_level, &log_target)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;

    let mut config = loader.load_or_init()?;
    if let Some(base_url) = &cli.base_url {
        config
            .override_base_url(base_url)
            .context("applying --base-url")?;
    }
    tracing::debug!(base_url = %config.api.base_url, "configuration loaded");

    let store = session_store(&config);
    let client = HttpClient::from_options(&config.api)?;
    let config = Arc::new(config);

    match command {
        Commands::Tui => {
            let mut app = App::new(config, store, client)?;
            commands::run_tui(&mut app)
        }
        Commands::Login(args) => commands::login(client, store, args),
        Commands::Signup(args) => commands::signup(client, store, args),
        Commands::Logout => commands::logout(client, store),
        Commands::Whoami => commands::whoami(&store),
        Commands::List(args) => commands::list_notes(client, store, args),
        Commands::New(args) => commands::new_note(client, store, args),
        Commands::Edit(args) => commands::edit_note(client, store, args),
        Commands::Delete(args) => commands::delete_note(client, store, args),
    }
}

fn session_store(config: &AppConfig) -> SessionStore {
    if config.session.persist {
        SessionStore::new(config.session.path.clone())
    } else {
        SessionStore::ephemeral()
    }
}

enum LogTarget {
    Stderr,
    /// The TUI owns the terminal, so its logs go to a file instead.
    File(PathBuf),
}

fn init_tracing(level: &str, target: &LogTarget) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        match target {
            LogTarget::Stderr => fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init(),
            LogTarget::File(path) => {
                let file = open_log_file(path)?;
                fmt()
                    .with_env_filter(env_filter)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .init()
            }
        }
        Ok(())
    })
    .map(|_| ())
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}
