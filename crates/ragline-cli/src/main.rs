//! ragline - terminal client for retrieval-augmented question answering

mod commands;
mod config;
mod plain;
mod ui;

use clap::Parser;
use config::Config;
use ragline_client::{HttpBackend, Sanitizer};
use ragline_core::{Engine, EngineConfig, FileStorage, SendOutcome};
use std::io::IsTerminal;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// ragline - ask questions of a RAG backend
#[derive(Parser, Debug)]
#[command(name = "ragline")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Query endpoint to use (saved for later runs)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Stream answers as server-sent events (saved)
    #[arg(long, conflicts_with = "no_stream")]
    stream: bool,

    /// Request whole answers (saved)
    #[arg(long)]
    no_stream: bool,

    /// Answer with local dummy data (saved)
    #[arg(long, conflicts_with = "no_mock")]
    mock: bool,

    /// Use the real backend (saved)
    #[arg(long)]
    no_mock: bool,

    /// Ask a single question and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Clear the conversation history before starting
    #[arg(long)]
    clear: bool,

    /// Print the conversation history and exit
    #[arg(long)]
    history: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Disable TUI mode (use simple stdin/stdout)
    #[arg(long)]
    no_tui: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

/// Collapse an `--x` / `--no-x` pair into an override
fn flag(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

/// Log filter: `--verbose` forces debug, otherwise `RUST_LOG` or warnings only
fn log_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("ragline=debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ragline=warn"))
}

fn init_tracing(verbose: bool, log_dir: Option<&Path>) {
    let filter = log_filter(verbose);

    // The TUI owns the screen, so logs go to a file
    if let Some(dir) = log_dir {
        let file = std::fs::create_dir_all(dir).and_then(|_| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("ragline.log"))
        });
        match file {
            Ok(file) => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init(),
            Err(e) => eprintln!(
                "Logging disabled: cannot open {}: {}",
                dir.join("ragline.log").display(),
                e
            ),
        }
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize config and exit
    if args.init_config {
        let path = Config::config_path();
        match Config::init_at(&path) {
            Ok(()) => {
                println!("Config file at: {}", path.display());
                println!(
                    "Note: endpoint, streaming and mock here are first-run defaults; \
                     once saved, change them with flags or /commands"
                );
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let use_tui = !args.no_tui
        && !args.history
        && args.command.is_none()
        && config.tui.unwrap_or(true)
        && std::io::stdout().is_terminal();

    let data_dir = config.data_dir();
    init_tracing(args.verbose, use_tui.then_some(data_dir.as_path()));
    if let Some(e) = config_error {
        tracing::warn!("{:#}; using defaults", e);
    }

    let defaults = config.default_settings();
    let origin = config
        .origin
        .clone()
        .unwrap_or_else(|| defaults.endpoint.clone());
    let sanitizer = Sanitizer::from_origin(&origin);

    let engine_config = EngineConfig {
        mock_delay: config.mock_delay(),
        defaults,
        sanitizer: sanitizer.clone(),
    };
    let mut engine = Engine::new(
        Arc::new(HttpBackend::new()),
        Arc::new(FileStorage::new(data_dir)),
        engine_config,
    );

    if let Some(endpoint) = &args.endpoint {
        engine.settings_mut().set_endpoint(endpoint);
    }
    if let Some(on) = flag(args.stream, args.no_stream) {
        engine.settings_mut().set_streaming(on);
    }
    if let Some(on) = flag(args.mock, args.no_mock) {
        engine.settings_mut().set_mock(on);
    }

    if args.clear {
        engine.clear();
        eprintln!("Cleared conversation.");
    }

    if args.history {
        plain::print_history(engine.messages(), &sanitizer, &mut std::io::stdout())?;
        return Ok(());
    }

    // Non-interactive mode
    if let Some(question) = args.command {
        match plain::send_and_print(&mut engine, &question).await? {
            SendOutcome::Failed(reason) => {
                eprintln!("Error: {}", reason);
                std::process::exit(1);
            }
            SendOutcome::Skipped => {
                eprintln!("Nothing to send.");
                std::process::exit(2);
            }
            _ => {}
        }
        return Ok(());
    }

    if use_tui {
        return ui::run_tui(&mut engine).await;
    }

    plain::run_interactive(&mut engine).await?;
    // A stdin read left pending at the prompt would block runtime shutdown
    std::process::exit(0);
}
