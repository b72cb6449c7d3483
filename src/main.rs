//! midifall - A terminal MIDI playback trainer.
//!
//! Loads a Standard MIDI File, lets the player choose which tracks to play
//! themselves, then plays the rest while judging the player's timing.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- song.mid --soundfont piano.sf2
//! ```

use midifall::app::{App, Screen};
use midifall::audio::AudioEngine;
use midifall::config::PlayConfig;
use midifall::midi::import_from_midi;
use midifall::play::MidiOutput;
use midifall::ui;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::fs::File;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

/// Command-line options for the application.
struct CliOptions {
    /// The MIDI file to play.
    song: PathBuf,
    /// Path to a SoundFont file for the synthesizer.
    soundfont: Option<PathBuf>,
    /// Run without sound.
    no_audio: bool,
    /// Run without computer-keyboard input; nothing is judged.
    no_input: bool,
    /// JSON file with play settings.
    config: Option<PathBuf>,
    /// Write logs to this file instead of stderr.
    log: Option<PathBuf>,
}

fn print_help(program: &str) {
    eprintln!("midifall - Terminal MIDI playback trainer");
    eprintln!();
    eprintln!("Usage: {} <SONG.mid> [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -sf, --soundfont PATH  Load a SoundFont file (.sf2) for sound");
    eprintln!("      --no-audio         Play silently");
    eprintln!("      --no-input         Do not take computer-keyboard input");
    eprintln!("      --config PATH      Load play settings from a JSON file");
    eprintln!("      --log PATH         Write logs to a file");
    eprintln!("  -h, --help             Print this help message");
}

impl CliOptions {
    /// Parses command-line arguments.
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let program = args.first().map(String::as_str).unwrap_or("midifall");
        let mut song: Option<PathBuf> = None;
        let mut soundfont: Option<PathBuf> = None;
        let mut no_audio = false;
        let mut no_input = false;
        let mut config: Option<PathBuf> = None;
        let mut log: Option<PathBuf> = None;
        let mut i = 1;

        // Options that take a path read the next argument.
        let value = |i: usize, flag: &str| -> Result<PathBuf> {
            args.get(i)
                .map(PathBuf::from)
                .with_context(|| format!("{} requires a path argument", flag))
        };

        while i < args.len() {
            match args[i].as_str() {
                "--soundfont" | "-sf" => {
                    i += 1;
                    soundfont = Some(value(i, "--soundfont")?);
                }
                "--config" => {
                    i += 1;
                    config = Some(value(i, "--config")?);
                }
                "--log" => {
                    i += 1;
                    log = Some(value(i, "--log")?);
                }
                "--no-audio" => no_audio = true,
                "--no-input" => no_input = true,
                "--help" | "-h" => {
                    print_help(program);
                    std::process::exit(0);
                }
                other if other.ends_with(".sf2") => soundfont = Some(PathBuf::from(other)),
                other if !other.starts_with('-') && song.is_none() => {
                    song = Some(PathBuf::from(other))
                }
                other => {
                    eprintln!("Unknown option: {}", other);
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
            }
            i += 1;
        }

        let Some(song) = song else {
            print_help(program);
            std::process::exit(1);
        };

        Ok(Self {
            song,
            soundfont,
            no_audio,
            no_input,
            config,
            log,
        })
    }
}

/// Installs the tracing subscriber, writing to `log` if given.
fn init_logging(log: Option<&PathBuf>) -> Result<()> {
    let builder =
        tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env());
    match log {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file: {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

/// Opens the synthesizer unless sound is off. A missing or broken SoundFont
/// only costs the sound.
fn open_output(cli: &CliOptions) -> Option<Box<dyn MidiOutput>> {
    if cli.no_audio {
        return None;
    }
    let Some(path) = cli.soundfont.as_ref() else {
        eprintln!("No SoundFont given (--soundfont), playing silently.");
        return None;
    };
    match AudioEngine::new(path) {
        Ok(engine) => Some(Box::new(engine)),
        Err(e) => {
            tracing::error!("Audio unavailable: {:#}", e);
            eprintln!("Warning: {:#}. Playing silently.", e);
            None
        }
    }
}

/// Main entry point.
fn main() -> Result<()> {
    // Parse CLI options first (before any terminal setup)
    let cli = CliOptions::parse()?;
    init_logging(cli.log.as_ref())?;

    let config = match &cli.config {
        Some(path) => PlayConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => PlayConfig::default(),
    };

    let song = import_from_midi(&cli.song)
        .with_context(|| format!("Failed to load song: {}", cli.song.display()))?;

    let output = open_output(&cli);
    let mut app = App::new(song, config, output, !cli.no_input);

    let mut terminal = setup_terminal().context("Failed to setup terminal")?;
    let result = run_app(&mut terminal, &mut app);
    restore_terminal(&mut terminal).context("Failed to restore terminal")?;

    result
}

/// Sets up the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("Failed to create terminal")?;
    Ok(terminal)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Main application loop.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        app.update();

        terminal.draw(|frame| ui::render(frame, app))?;

        // Handle events with a short timeout so the song keeps moving
        if event::poll(Duration::from_millis(16))? {
            if let Event::Key(key) = event::read()? {
                // Only handle key press events (not release)
                if key.kind == KeyEventKind::Press && handle_key(app, key.code, key.modifiers)? {
                    return Ok(());
                }
            }
        }
    }
}

/// Handles a key press.
///
/// # Returns
///
/// `true` if the application should quit
fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Result<bool> {
    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        return Ok(true);
    }

    match app.screen {
        Screen::TrackSelection => handle_track_selection(app, code),
        Screen::Playing(_) => {
            handle_playing(app, code);
            Ok(false)
        }
        Screen::Stats(_) => {
            if matches!(code, KeyCode::Enter | KeyCode::Esc) {
                app.dismiss_stats();
            }
            Ok(false)
        }
    }
}

fn handle_track_selection(app: &mut App, code: KeyCode) -> Result<bool> {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
        KeyCode::Up | KeyCode::Char('k') => app.select_prev_track(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next_track(),
        KeyCode::Right | KeyCode::Char('l') => app.cycle_mode(true),
        KeyCode::Left | KeyCode::Char('h') => app.cycle_mode(false),
        KeyCode::Char('c') => app.cycle_color(),
        KeyCode::Enter => app.start_playing()?,
        _ => {}
    }
    Ok(false)
}

fn handle_playing(app: &mut App, code: KeyCode) {
    // Piano keys go to the live input first.
    if let KeyCode::Char(c) = code {
        if app.press_key(c) {
            return;
        }
    }

    match code {
        KeyCode::Esc => return app.leave_session(),
        KeyCode::Backspace => return app.restart_session(),
        KeyCode::Char(',') => return app.change_octave(-1),
        KeyCode::Char('.') => return app.change_octave(1),
        _ => {}
    }

    let Screen::Playing(state) = &mut app.screen else {
        return;
    };
    match code {
        KeyCode::Char(' ') => state.toggle_pause(),
        KeyCode::Left => state.speed_down(),
        KeyCode::Right => state.speed_up(),
        KeyCode::Up => state.shorten_show_duration(),
        KeyCode::Down => state.lengthen_show_duration(),
        KeyCode::Char('+') | KeyCode::Char('=') => state.shift_view(1),
        KeyCode::Char('-') => state.shift_view(-1),
        _ => {}
    }
}
