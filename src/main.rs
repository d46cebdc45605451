//! Pianoroll — command-line entry point.
//!
//! `edit` opens the terminal piano roll; the other subcommands run headless.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};

use pianoroll::audio::{open_default_backend, open_engine};
use pianoroll::config::AppConfig;
use pianoroll::logging;
use pianoroll::playback::Transport;
use pianoroll::session::Session;
use pianoroll::tui::{self, App};

#[derive(Parser)]
#[command(name = "pianoroll", version, about)]
struct Cli {
    /// Configuration file (default: ~/.pianoroll/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open the piano roll, optionally on an interchange file
    Edit { file: Option<PathBuf> },
    /// Play an interchange file through the audio output
    Play {
        file: PathBuf,
        /// Beat to start from
        #[arg(long, default_value_t = 0.0)]
        from: f64,
    },
    /// Validate an interchange file and print a summary
    Check { file: PathBuf },
    /// Ask the compose service for a new piece
    #[cfg(feature = "remote")]
    Generate {
        prompt: String,
        /// Write the JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export an interchange file to MIDI through the compose service
    #[cfg(feature = "remote")]
    Export {
        file: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
}

type CliResult = Result<(), Box<dyn Error>>;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult {
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    let interactive = matches!(cli.command, Command::Edit { .. });
    logging::init(&config.log, interactive)?;

    match cli.command {
        Command::Edit { file } => edit(&config, file),
        Command::Play { file, from } => play(&config, &file, from),
        Command::Check { file } => check(&file),
        #[cfg(feature = "remote")]
        Command::Generate { prompt, output } => generate(&config, &prompt, output.as_deref()),
        #[cfg(feature = "remote")]
        Command::Export { file, output } => export(&config, &file, &output),
    }
}

/// A fresh session carrying the configured tempo and snap.
fn new_session(config: &AppConfig) -> Session {
    let mut session = Session::default();
    session.set_bpm(config.bpm);
    session.set_snap(config.snap);
    session
}

fn load_session(config: &AppConfig, path: &Path) -> Result<Session, Box<dyn Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let mut session = new_session(config);
    session.import_json(&text)?;
    Ok(session)
}

fn edit(config: &AppConfig, file: Option<PathBuf>) -> CliResult {
    let session = match &file {
        Some(path) if path.exists() => load_session(config, path)?,
        _ => new_session(config),
    };
    let backend = open_default_backend();
    let mut app = App::new(session, backend, config, file);
    tui::run_app(&mut app)?;
    Ok(())
}

fn play(config: &AppConfig, file: &Path, from: f64) -> CliResult {
    let session = load_session(config, file)?;
    // Playing into a silent clock is pointless; report the device error.
    let mut backend = open_engine()?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;

    let mut transport = Transport::new(config.scheduler_config()?);
    let document = session.document();
    println!(
        "playing {} notes at {:.0} BPM from beat {from}",
        document.notes().len(),
        document.bpm()
    );

    transport.play(&session, &mut backend, Some(from));
    while transport.is_playing() {
        if interrupted.load(Ordering::SeqCst) {
            transport.stop();
            println!("stopped at beat {:.2}", transport.playhead());
            return Ok(());
        }
        transport.poll(&mut backend);
        thread::sleep(Duration::from_millis(5));
    }

    // Let the last release tail ring out.
    thread::sleep(Duration::from_millis(300));
    println!("done.");
    Ok(())
}

fn check(file: &Path) -> CliResult {
    let session = load_session(&AppConfig::default(), file)?;
    let document = session.document();
    println!("{}: ok", file.display());
    println!("  bpm:    {}", document.bpm());
    println!("  notes:  {}", document.notes().len());
    println!("  length: {:.2} beats", document.end_beat());
    for track in document.tracks() {
        println!(
            "  {:<10} {:<14} {:>4} notes{}",
            track.id,
            track.name,
            document.note_count(&track.id),
            if track.muted { " (muted)" } else { "" }
        );
    }
    Ok(())
}

#[cfg(feature = "remote")]
fn generate(config: &AppConfig, prompt: &str, output: Option<&Path>) -> CliResult {
    use pianoroll::remote::HttpComposeService;

    let service = HttpComposeService::new(&config.remote.base_url, config.remote.timeout())?;
    let mut session = new_session(config);
    let count = session.generate(&service, prompt)?;
    let json = session.export_json()?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            eprintln!("wrote {count} notes to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(feature = "remote")]
fn export(config: &AppConfig, file: &Path, output: &Path) -> CliResult {
    use pianoroll::remote::HttpComposeService;

    let mut session = load_session(config, file)?;
    let service = HttpComposeService::new(&config.remote.base_url, config.remote.timeout())?;
    let bytes = session.export(&service)?;
    std::fs::write(output, &bytes)?;
    eprintln!("wrote {} bytes to {}", bytes.len(), output.display());
    Ok(())
}
