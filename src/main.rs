//! sheetcalc - terminal spreadsheet
//!
//! Opens the interactive grid by default. With `--eval` or `--save` it runs
//! headless instead: load, apply assignments, print values, write the file.

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use sheetcalc::application::{App, AppMode};
use sheetcalc::domain::{format_number, normalize_reference, Spreadsheet};
use sheetcalc::infrastructure::{Config, FileRepository};
use sheetcalc::presentation::{render_ui, viewport_for, InputHandler};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// sheetcalc - a small spreadsheet with formulas, ranges and aggregates
#[derive(Parser)]
#[command(name = "sheetcalc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Sheet to open (.s2v, or .json for a snapshot)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Assign content to a cell before anything else, e.g. --set 'A3==A1+A2'
    #[arg(short, long, value_name = "REF=CONTENT")]
    set: Vec<String>,

    /// Print the value of a cell (runs without the interactive grid)
    #[arg(short, long, value_name = "REF")]
    eval: Vec<String>,

    /// Write the sheet to this file (runs without the interactive grid)
    #[arg(long, value_name = "PATH")]
    save: Option<PathBuf>,

    /// Configuration file (defaults to the per-user config.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Append logs to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Log to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn is_headless(&self) -> bool {
        !self.eval.is_empty() || self.save.is_some()
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let config = Config::load(cli.config.as_deref()).context("Failed to read configuration")?;

    if cli.is_headless() {
        run_headless(&cli, &config)
    } else {
        run_tui(&cli, &config)
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(path) = &cli.log_file {
        let file = File::options()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(io::stderr)
            .init();
    }

    Ok(())
}

fn open_sheet(file: Option<&Path>, config: &Config) -> Result<Spreadsheet> {
    match file {
        Some(path) => FileRepository::load_spreadsheet(path, config.max_depth)
            .with_context(|| format!("Failed to load {}", path.display())),
        None => Ok(Spreadsheet::with_max_depth(config.max_depth)),
    }
}

fn apply_assignments(sheet: &mut Spreadsheet, assignments: &[String]) -> Result<()> {
    for assignment in assignments {
        let (reference, content) = assignment.split_once('=').with_context(|| {
            format!("Invalid assignment: '{assignment}'. Expected REF=CONTENT")
        })?;
        sheet
            .set_cell(reference, content)
            .with_context(|| format!("Failed to set {}", normalize_reference(reference)))?;
    }
    Ok(())
}

fn run_headless(cli: &Cli, config: &Config) -> Result<()> {
    let mut sheet = open_sheet(cli.file.as_deref(), config)?;
    apply_assignments(&mut sheet, &cli.set)?;

    for reference in &cli.eval {
        let value = sheet
            .evaluate(reference)
            .with_context(|| format!("Failed to evaluate {}", normalize_reference(reference)))?;
        println!("{} = {}", normalize_reference(reference), format_number(value));
    }

    if let Some(path) = &cli.save {
        FileRepository::save_spreadsheet(&sheet, path)
            .with_context(|| format!("Failed to save {}", path.display()))?;
    }

    Ok(())
}

fn run_tui(cli: &Cli, config: &Config) -> Result<()> {
    let mut app = App::new(config);
    if let Some(path) = &cli.file {
        let result = FileRepository::load_spreadsheet(path, config.max_depth);
        app.set_load_result(path.display().to_string(), result);
    }
    apply_assignments(&mut app.spreadsheet, &cli.set)?;
    app.refresh_values();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    info!("interactive session started");
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    res.context("Terminal error")
}

/// Draws and dispatches key presses until the user quits.
fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        let size = terminal.size()?;
        let (rows, cols) = viewport_for(app, size.width, size.height);
        app.update_viewport_size(rows, cols);
        app.ensure_cursor_visible();

        terminal.draw(|f| render_ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let quit = match key.code {
                KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
                KeyCode::Char('q') => app.mode == AppMode::Normal && key.modifiers.is_empty(),
                _ => false,
            };
            if quit {
                return Ok(());
            }
            InputHandler::handle_key_event(app, key.code, key.modifiers);
        }
    }
}
