mod api;
mod app;
mod cache;
mod compat;
mod config;
mod deps;
mod error;
mod library;
mod models;
mod query;
mod recommended;
mod security;
mod transient;
mod ui;
mod version;

use crate::config::Config;
use crate::library::{
    DemoLibrary, FILTER_NONCE_ACTION, FilterRequest, REFRESH_NONCE_ACTION, RefreshOutcome,
};
use crate::models::Catalog;
use crate::query::TemplateFilters;
use crate::recommended::PluginMap;
use crate::security::Requester;
use crate::transient::TransientStore;
use crate::ui::draw;
use anyhow::{Context, Result};
use app::{App, InputMode};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use directories::ProjectDirs;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::{fs, io, time::Duration};
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "prisma-companion",
    version,
    about = "Browse and filter the Prisma Core demo library"
)]
struct Cli {
    /// Path to config.toml (defaults to the user config directory)
    #[arg(long, env = "PRISMA_COMPANION_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive demo library browser (default)
    Browse,
    /// Print the filtered catalog as a JSON response
    List {
        #[arg(long, default_value = "")]
        category: String,
        #[arg(long, default_value = "")]
        builder: String,
        #[arg(long, short = 's', default_value = "")]
        search: String,
    },
    /// Clear the cached catalog so the next read fetches it again
    Refresh,
    /// Show recommended plugins and whether they are installed
    Plugins,
}

enum AppEvent {
    Tick,
    Key(event::KeyEvent),
    CatalogLoaded(Catalog),
    Error(String),
}

struct TerminalSession {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalSession {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }

    fn terminal_mut(&mut self) -> &mut Terminal<CrosstermBackend<io::Stdout>> {
        &mut self.terminal
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        );
        let _ = self.terminal.show_cursor();
    }
}

/// Logs go to a file while the TUI owns the terminal, to stderr otherwise.
fn init_logging(verbose: bool, log_file: Option<PathBuf>) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("prisma_companion=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("prisma_companion=info"))
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    match log_file {
        Some(path) => {
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(io::stderr).init(),
    }
    Ok(())
}

fn spawn_catalog_load(library: Arc<DemoLibrary>, tx: mpsc::Sender<AppEvent>) {
    tokio::spawn(async move {
        let catalog = library.templates().await;
        let _ = tx.send(AppEvent::CatalogLoaded(catalog)).await;
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let proj_dirs = ProjectDirs::from("com", "prisma-companion", "prisma-companion")
        .ok_or_else(|| anyhow::anyhow!("Failed to determine config and cache directories"))?;
    let cache_dir = proj_dirs.cache_dir().to_path_buf();
    fs::create_dir_all(&cache_dir)?;

    let command = cli.command.unwrap_or(Command::Browse);
    let log_file =
        matches!(command, Command::Browse).then(|| cache_dir.join("prisma-companion.log"));
    init_logging(cli.verbose, log_file)?;

    let config_path = cli
        .config
        .unwrap_or_else(|| proj_dirs.config_dir().join("config.toml"));
    let config = Config::load(&config_path)?;
    debug!("Loaded config from {}", config_path.display());

    let store = Arc::new(TransientStore::persistent(cache_dir.join("transients"))?);
    let library = Arc::new(DemoLibrary::from_config(&config, store)?);
    let requester = Requester::new(config.user.capabilities.iter().copied());

    match command {
        Command::Browse => browse(library).await,
        Command::List {
            category,
            builder,
            search,
        } => {
            let request = FilterRequest {
                requester,
                nonce: Some(library.nonces().issue(FILTER_NONCE_ACTION)),
                filters: Some(TemplateFilters {
                    category,
                    builder,
                    search,
                }),
            };
            let response = library.filter_templates(request).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            if !response.success {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Refresh => {
            let token = library.nonces().issue(REFRESH_NONCE_ACTION);
            match library.refresh_templates(Some(&token)) {
                RefreshOutcome::Redirect(view) => {
                    println!("Demo library cache cleared. Open {} to reload.", view)
                }
                RefreshOutcome::Ignored => println!("Refresh was not authorized."),
            }
            Ok(())
        }
        Command::Plugins => {
            let plugins = library.recommended_plugins(PluginMap::new()).await;
            if plugins.is_empty() {
                println!("No recommended plugins available.");
            }
            for (slug, plugin) in &plugins {
                let status = library
                    .registry()
                    .map(|r| deps::plugin_status(r, slug).label())
                    .unwrap_or("unknown");
                println!("{:<32} {:<40} {}", slug, plugin.name, status);
            }
            Ok(())
        }
    }
}

async fn browse(library: Arc<DemoLibrary>) -> Result<()> {
    let mut session = TerminalSession::new()?;
    let mut app = App::new();
    let (tx, mut rx) = mpsc::channel(100);

    spawn_catalog_load(library.clone(), tx.clone());

    // Event loop thread
    let tx_c = tx.clone();
    tokio::spawn(async move {
        loop {
            if event::poll(Duration::from_millis(100)).unwrap_or(false) {
                match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                        let _ = tx_c.send(AppEvent::Key(key)).await;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        let _ = tx_c.send(AppEvent::Error(err.to_string())).await;
                    }
                }
            }
            let _ = tx_c.send(AppEvent::Tick).await;
        }
    });

    loop {
        session.terminal_mut().draw(|f| draw(f, &mut app))?;

        let Some(ev) = rx.recv().await else {
            break;
        };
        match ev {
            AppEvent::Tick => {}
            AppEvent::Error(e) => {
                app.error = Some(e);
                app.is_loading = false;
            }
            AppEvent::CatalogLoaded(catalog) => {
                info!("Loaded {} demos", catalog.len());
                app.notification = None;
                if catalog.is_empty() {
                    app.error = Some("Demo library is unavailable right now.".to_string());
                }
                app.set_catalog(catalog);
            }
            AppEvent::Key(key) => match app.input_mode {
                InputMode::Editing => match key.code {
                    KeyCode::Char(c) => {
                        app.notification = None;
                        app.error = None;
                        app.search_query.push(c);
                        app.apply_filter();
                    }
                    KeyCode::Backspace => {
                        app.search_query.pop();
                        app.apply_filter();
                    }
                    KeyCode::Esc | KeyCode::Enter => {
                        app.input_mode = InputMode::Normal;
                    }
                    KeyCode::Down => app.next(),
                    KeyCode::Up => app.previous(),
                    _ => {}
                },
                InputMode::Normal => match key.code {
                    KeyCode::Char('i') | KeyCode::Char('/') => {
                        app.notification = None;
                        app.error = None;
                        app.input_mode = InputMode::Editing;
                    }
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Down | KeyCode::Char('j')
                        if key.modifiers.contains(KeyModifiers::ALT) =>
                    {
                        let line_count = app.get_details_line_count();
                        if (app.details_scroll as usize) < line_count.saturating_sub(2) {
                            app.details_scroll = app.details_scroll.saturating_add(1);
                        }
                    }
                    KeyCode::Up | KeyCode::Char('k')
                        if key.modifiers.contains(KeyModifiers::ALT) =>
                    {
                        app.details_scroll = app.details_scroll.saturating_sub(1);
                    }
                    KeyCode::Down | KeyCode::Char('j') => app.next(),
                    KeyCode::Up | KeyCode::Char('k') => app.previous(),
                    KeyCode::Char('c') => app.cycle_category(),
                    KeyCode::Char('b') => app.cycle_builder(),
                    KeyCode::Char('x') => app.clear_filters(),
                    KeyCode::Char('r') => {
                        let token = library.nonces().issue(REFRESH_NONCE_ACTION);
                        let outcome = library.refresh_templates(Some(&token));
                        if let RefreshOutcome::Redirect(_) = outcome {
                            app.error = None;
                            app.notification = Some("Refreshing demo library...".to_string());
                            app.is_loading = true;
                            spawn_catalog_load(library.clone(), tx.clone());
                        }
                    }
                    _ => {}
                },
            },
        }
    }

    Ok(())
}
