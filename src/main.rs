use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    poll as event_poll, read as event_read, Event as CrosstermEvent, KeyEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use parley::app::{App, AppEvent};
use parley::config::Config;
use parley::store::SessionStore;
use parley::view::{self, theme::Theme};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::fs::File;
use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Redraw cadence while idle; also paces the typing-indicator animation.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A terminal chat client for the Gemini API
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(about = "Chat with Gemini from your terminal", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory for the saved session (default: platform data dir)
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Path to log file for diagnostics (default: system temp dir)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Override the color theme (dark or light)
    #[arg(long, value_name = "NAME")]
    theme: Option<String>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

fn init_tracing(log_file_path: &PathBuf) {
    let Ok(log_file) = File::create(log_file_path) else {
        return;
    };
    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let fmt_layer = fmt::layer()
        .with_writer(Arc::new(log_file))
        .with_ansi(false);
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    if args.dump_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let log_file = args
        .log_file
        .unwrap_or_else(|| std::env::temp_dir().join("parley.log"));
    init_tracing(&log_file);
    tracing::info!("Starting parley (model: {})", config.model);

    let theme_name = args.theme.as_deref().unwrap_or(&config.theme);
    let theme = Theme::from_name(theme_name).unwrap_or_else(|| {
        tracing::warn!("Unknown theme {theme_name:?}, falling back to dark");
        Theme::dark()
    });

    let store = match &args.data_dir {
        Some(dir) => SessionStore::in_dir(dir),
        None => SessionStore::new(SessionStore::default_path()),
    };
    let session = store.load();

    let (event_tx, event_rx) = mpsc::channel::<AppEvent>();
    let mut app = App::new(session, store, config, event_tx);

    if app.config.resolved_api_key().is_none() {
        app.status = Some(format!(
            "No API key: set {} or add api_key to {}",
            parley::config::API_KEY_ENV_VAR,
            Config::default_path().display()
        ));
    }

    let mut terminal = setup_terminal().context("Failed to initialize terminal")?;
    let result = run(&mut terminal, &mut app, &theme, &event_rx);
    restore_terminal();
    result
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    crossterm::execute!(stdout(), EnterAlternateScreen)?;

    // Put the terminal back even when a draw panics.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore_terminal();
        default_hook(info);
    }));

    Ok(Terminal::new(CrosstermBackend::new(stdout()))?)
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = crossterm::execute!(stdout(), LeaveAlternateScreen);
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    theme: &Theme,
    events: &mpsc::Receiver<AppEvent>,
) -> Result<()> {
    loop {
        terminal.draw(|frame| view::draw(frame, app, theme))?;

        if event_poll(POLL_INTERVAL)? {
            match event_read()? {
                CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => {
                    app.handle_key(key);
                }
                CrosstermEvent::Resize(_, _) => {}
                _ => {}
            }
        }

        while let Ok(event) = events.try_recv() {
            app.handle_event(event);
        }

        if app.should_quit {
            tracing::info!("Shutting down");
            return Ok(());
        }
    }
}
