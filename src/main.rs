//! Binary entrypoint for the photo kiosk.
//!
//! Wires configuration, discovery, the preloading session, signal handling
//! and console input around the library crate.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use photo_kiosk::config::Configuration;
use photo_kiosk::events::ViewerCommand;
use photo_kiosk::session::Session;
use photo_kiosk::tasks::files;
use photo_kiosk::tasks::loader::ImageDecoder;
use photo_kiosk::tasks::viewer::{self, LogRenderer, ViewerOptions};
use photo_kiosk::visited::VisitedStore;

#[derive(Debug, Parser)]
#[command(name = "photo-kiosk", version, about = "Kiosk-style photo slideshow")]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG", default_value = "config.yaml")]
    config: PathBuf,
    /// Deterministic RNG seed for image sampling
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
    /// Override the slide interval (e.g. "10s")
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    dwell: Option<Duration>,
    /// Override the visited-history file
    #[arg(long = "visited-db", value_name = "FILE")]
    visited_db: Option<PathBuf>,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // RUST_LOG wins; otherwise map -v to a level for this crate
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!("photo_kiosk={level}"))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let Args {
        config,
        seed,
        dwell,
        visited_db,
        verbose,
    } = Args::parse();
    init_tracing(verbose)?;

    let mut cfg = Configuration::from_yaml_file(&config)
        .with_context(|| format!("failed to load configuration from {}", config.display()))?;
    if let Some(seed) = seed {
        cfg.preload.seed = Some(seed);
    }
    if let Some(dwell) = dwell {
        cfg.dwell = dwell;
    }
    if let Some(path) = visited_db {
        cfg.visited_db_path = path;
    }
    let cfg = cfg.validated().context("invalid configuration values")?;
    info!(
        config = %config.display(),
        library = %cfg.photo_library_path.display(),
        filter = ?cfg.folder_filter,
        dwell = %humantime::format_duration(cfg.dwell),
        "loaded configuration"
    );

    let catalog = files::discover_catalog(&cfg).context("image discovery failed")?;
    info!(images = catalog.len(), "catalog ready");

    let visited = VisitedStore::load(&cfg.visited_db_path);
    let mut session = Session::new(catalog, visited, cfg.preload.clone())
        .context("failed to set up session")?;
    session.start(ImageDecoder).context("failed to start preloader")?;

    let shutdown = session.shutdown_token();
    let signals = spawn_signal_watcher(shutdown.clone())?;

    let (command_tx, command_rx) = crossbeam_channel::bounded::<ViewerCommand>(16);
    if io::stdin().is_terminal() {
        viewer::spawn_console_input(command_tx).context("failed to spawn console input")?;
        info!("console controls: <enter>/n next, p previous, pause, q quit");
    } else {
        debug!("stdin is not a terminal; console controls disabled");
        drop(command_tx);
    }

    let mut renderer = LogRenderer::new(cfg.overlay);
    let result = viewer::run(
        &session,
        command_rx,
        &mut renderer,
        &ViewerOptions::from(&cfg),
    )
    .context("viewer failed");

    // Ensure the preloader and signal watcher are asked to stop
    session.stop();
    if signals.join().is_err() {
        warn!("signal watcher thread panicked");
    }
    result
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM. The watcher exits on its own once
/// `shutdown` is cancelled from elsewhere.
fn spawn_signal_watcher(shutdown: CancellationToken) -> Result<JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build signal runtime")?;
    let handle = thread::Builder::new()
        .name("signals".into())
        .spawn(move || runtime.block_on(wait_for_signal(shutdown)))
        .context("failed to spawn signal watcher")?;
    Ok(handle)
}

async fn wait_for_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("failed to register SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = shutdown.cancelled() => return,
        res = tokio::signal::ctrl_c() => {
            if let Err(err) = res {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; initiating shutdown");
        }
        _ = terminate => info!("SIGTERM received; initiating shutdown"),
    }
    shutdown.cancel();
}
