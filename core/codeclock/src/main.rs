//! codeclock: time accounting launcher for an external code editor.
//!
//! ## Subcommands
//!
//! - `run`: Runs the timers. Emits JSON-line events on stdout and accepts
//!   launch requests as JSON lines on stdin until stdin closes, Ctrl-C or
//!   SIGTERM.
//! - `status`: Prints today / last 14 days / total per project
//! - `config`: Prints the effective configuration and file locations

mod bridge;
mod logging;
mod status;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use codeclock_core::{
    Clock, ClockConfig, ClockError, Result, StorageConfig, SystemClock, TimeStore, TimerEngine,
};
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{error, info, warn};

use bridge::{BridgeRequest, JsonLineSink};

#[derive(Parser)]
#[command(name = "codeclock")]
#[command(about = "Tracks time spent in editor projects")]
#[command(version)]
struct Cli {
    /// Data directory (default: the platform data directory + /codeclock)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the timers (events on stdout, requests on stdin)
    Run {
        /// Project to open at start-up (repeatable)
        #[arg(long = "launch", value_name = "PATH")]
        launch: Vec<String>,
    },

    /// Print tracked time per project
    Status {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration and file locations
    Config,
}

fn main() {
    let cli = Cli::parse();

    let storage = match cli.data_dir {
        Some(dir) => Ok(StorageConfig::with_root(dir)),
        None => StorageConfig::new(),
    };
    let _logging_guard = logging::init(storage.as_ref().ok().map(|s| s.logs_dir()).as_deref());

    let storage = match storage {
        Ok(storage) => storage,
        Err(err) => {
            error!(error = %err, "Failed to resolve data directory");
            eprintln!("codeclock: {}", err);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run { launch } => run(storage, launch),
        Commands::Status { json } => print_status(&storage, json),
        Commands::Config => print_config(&storage),
    };

    if let Err(err) = result {
        error!(error = %err, "codeclock failed");
        eprintln!("codeclock: {}", err);
        std::process::exit(1);
    }
}

/// Loads the config file, falling back to defaults when it is malformed.
fn load_config_or_default(storage: &StorageConfig) -> ClockConfig {
    match ClockConfig::load(&storage.config_file()) {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "Failed to load config; using defaults");
            ClockConfig::default()
        }
    }
}

fn run(storage: StorageConfig, launch: Vec<String>) -> Result<()> {
    let config = load_config_or_default(&storage);
    if let Err(err) = storage.ensure_dirs() {
        warn!(error = %err, root = %storage.root().display(), "Failed to create data directory");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| ClockError::Io {
            context: "Failed to start async runtime".to_string(),
            source: e,
        })?;

    let result = runtime.block_on(async move {
        info!(
            root = %storage.root().display(),
            tick_interval_ms = config.tick_interval_ms,
            path_match = ?config.detection.path_match,
            "codeclock starting"
        );
        let sink = Arc::new(JsonLineSink::new(std::io::stdout()));
        let engine = TimerEngine::from_config(storage, &config, sink);
        serve(&engine, &launch, BufReader::new(tokio::io::stdin())).await
    });

    // Stdin reads sit on a blocking thread that never finishes on its own.
    runtime.shutdown_timeout(Duration::from_millis(500));
    result
}

/// Runs the engine until stdin closes or a shutdown signal arrives, then
/// stops every timer and writes both records.
async fn serve<R>(engine: &TimerEngine, launch: &[String], input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    engine.start_global(true);

    for path in launch {
        // Failures are already reported as launch-failed events.
        let _ = engine.launch_project(path);
    }

    let requests = bridge::serve_requests(input, |request| match request {
        BridgeRequest::LaunchProject { path } => {
            let _ = engine.launch_project(&path);
        }
    });

    tokio::select! {
        _ = requests => info!("Bridge input closed, shutting down"),
        signal = shutdown_signal() => info!(signal, "Received shutdown signal"),
    }

    engine.shutdown()
}

/// Resolves on Ctrl-C or SIGTERM. Returns the signal's name.
#[cfg(unix)]
async fn shutdown_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = ctrl_c() => "ctrl-c",
                _ = sigterm.recv() => "SIGTERM",
            }
        }
        Err(err) => {
            warn!(error = %err, "Failed to register SIGTERM handler");
            ctrl_c().await;
            "ctrl-c"
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> &'static str {
    ctrl_c().await;
    "ctrl-c"
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

fn print_status(storage: &StorageConfig, json: bool) -> Result<()> {
    let store = TimeStore::new(storage.clone());
    let report = status::build_report(&store, SystemClock.today());

    if json {
        let rendered = serde_json::to_string_pretty(&report).map_err(|e| ClockError::Json {
            context: "Failed to render status".to_string(),
            source: e,
        })?;
        println!("{}", rendered);
    } else {
        print!("{}", status::render_text(&report));
    }
    Ok(())
}

fn print_config(storage: &StorageConfig) -> Result<()> {
    let config_file = storage.config_file();
    let config = ClockConfig::load(&config_file)?;
    let source = if config_file.exists() {
        "loaded"
    } else {
        "not found, using defaults"
    };

    println!("Data directory: {}", storage.root().display());
    println!("Config file:    {} ({})", config_file.display(), source);
    println!("Global timer:   {}", storage.global_timer_file().display());
    println!("Project timers: {}", storage.project_timers_file().display());
    println!("Logs:           {}", storage.logs_dir().display());
    println!();
    print!("{}", config.to_toml()?);
    Ok(())
}
