//! relstrength TUI entry point.
//!
//! Keys:
//! - `f`: show/hide the factor series
//! - `s`: show only equities labelled strong
//! - `r`: reload both tables (the last good data stays on failure)
//! - `q` / `Esc`: quit

use std::fs::File;
use std::io::{self, stdout};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::EnvFilter;

use relstrength_core::{PresentationAdapter, StrengthConfig, Toggle, ViewOptions};
use relstrength_runner::{DefaultFetcher, FallbackLoader, RetryPolicy, SourcePair};
use relstrength_tui::input::{self, Action};
use relstrength_tui::worker::{self, LoadJob, WorkerCommand, WorkerResponse};
use relstrength_tui::{App, TerminalAdapter};

#[derive(Parser)]
#[command(
    name = "relstrength-tui",
    about = "Interactive relative strength chart"
)]
struct Args {
    /// Factor table: URL or path.
    #[arg(long)]
    factors: String,

    /// Fallback factor table.
    #[arg(long)]
    factors_fallback: Option<String>,

    /// Equity table: URL or path.
    #[arg(long)]
    equities: String,

    /// Fallback equity table.
    #[arg(long)]
    equities_fallback: Option<String>,

    /// TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Momentum regression window.
    #[arg(long)]
    window: Option<usize>,

    /// Write logs here. The terminal is owned by the UI, so nothing is logged otherwise.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

type Term = Terminal<CrosstermBackend<io::Stdout>>;

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = &args.log_file {
        init_file_logging(path)?;
    }

    let mut config = match &args.config {
        Some(p) => StrengthConfig::from_file(p)?,
        None => StrengthConfig::default(),
    };
    if let Some(w) = args.window {
        config.window = w;
    }
    config.validate()?;

    let fetcher = DefaultFetcher::new(RetryPolicy::default()).context("failed to build fetcher")?;
    let job = LoadJob {
        loader: FallbackLoader::new(fetcher, config.date_column.clone()),
        factors: pair(&args.factors, args.factors_fallback.as_deref()),
        equities: pair(&args.equities, args.equities_fallback.as_deref()),
        config,
    };

    // Worker channels
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (resp_tx, resp_rx) = mpsc::channel();
    let worker_handle =
        worker::spawn_worker(job, cmd_rx, resp_tx).context("failed to spawn loader thread")?;

    // Install a panic hook that restores the terminal before printing the panic.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stderr(), LeaveAlternateScreen);
        default_hook(info);
    }));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;

    let mut adapter = TerminalAdapter::new(terminal);
    let (toggle_tx, toggle_rx) = mpsc::channel();
    adapter.on_toggle(Box::new(move |t| {
        let _ = toggle_tx.send(t);
    }));

    let mut app = App::new(ViewOptions::default());
    app.loading = true;
    app.set_status("Loading tables...");

    let result = run_app(&mut adapter, &mut app, &cmd_tx, &resp_rx, &toggle_rx);

    // Shutdown worker. A load in flight finishes first.
    let _ = cmd_tx.send(WorkerCommand::Shutdown);
    drop(resp_rx);
    let _ = worker_handle.join();

    // Restore terminal
    disable_raw_mode()?;
    let terminal: &mut Term = adapter.terminal_mut();
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    adapter: &mut TerminalAdapter<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    cmd_tx: &mpsc::Sender<WorkerCommand>,
    resp_rx: &mpsc::Receiver<WorkerResponse>,
    toggle_rx: &mpsc::Receiver<Toggle>,
) -> Result<()> {
    loop {
        // 1. Apply reported toggles and finished loads
        while let Ok(t) = toggle_rx.try_recv() {
            app.apply_toggle(t);
        }
        while let Ok(resp) = resp_rx.try_recv() {
            handle_worker_response(app, resp);
        }

        // 2. Render
        adapter.set_status(app.status.clone());
        match app.frame() {
            Some(frame) => adapter.render(&frame, &app.options)?,
            None if app.loading => adapter.render_message("Loading tables...")?,
            None => adapter.render_message("No data. Press r to retry.")?,
        }

        // 3. Poll for input events (50ms timeout for ~20 FPS tick)
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                match input::action_for(key) {
                    Some(Action::Toggle(t)) => adapter.dispatch(t),
                    Some(Action::Reload) if !app.loading => {
                        if cmd_tx.send(WorkerCommand::Reload).is_ok() {
                            app.loading = true;
                            app.set_status("Reloading...");
                        } else {
                            app.load_failed("loader thread has stopped".into());
                        }
                    }
                    Some(Action::Reload) => app.set_warning("Reload already in progress"),
                    Some(Action::Quit) => app.running = false,
                    None => {}
                }
            }
        }

        // 4. Check quit
        if !app.running {
            break;
        }
    }
    Ok(())
}

fn handle_worker_response(app: &mut App, resp: WorkerResponse) {
    match resp {
        WorkerResponse::Loaded {
            evaluation,
            changed,
            loaded_at,
            warnings,
        } => {
            app.set_evaluation(*evaluation, changed, loaded_at);
            if !warnings.is_empty() {
                app.set_warning(warnings.join("; "));
            }
        }
        WorkerResponse::Failed { error } => app.load_failed(error),
    }
}

fn pair(primary: &str, fallback: Option<&str>) -> SourcePair {
    let pair = SourcePair::new(primary);
    match fallback {
        Some(f) => pair.with_fallback(f),
        None => pair,
    }
}

fn init_file_logging(path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
