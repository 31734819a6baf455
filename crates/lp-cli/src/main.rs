mod config;
mod engine;
mod server;
mod services;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::Mutex;

use lp_core::now_unix_secs;
use lp_store::Store;

use crate::config::Config;
use crate::engine::LifecycleEngine;

#[derive(Parser)]
#[command(name = "linkpet", about = "Pet lifecycle simulation server and CLI")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, default_value = "linkpet.toml")]
    config: PathBuf,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API with the background simulation sweep
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1:8000")]
        bind: String,
    },

    /// Run one simulation sweep and exit (cron-friendly)
    Sweep,

    /// Show database statistics
    Stats,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn build_engine(config: &Config) -> Result<LifecycleEngine> {
    let store = Store::open(std::path::Path::new(&config.database.path))
        .with_context(|| format!("failed to open database {}", config.database.path))?;
    Ok(LifecycleEngine::new(
        store,
        services::narrator_from(&config.services.chat),
        services::embedder_from(&config.services.embedding),
        services::illustrator_from(&config.services.image),
        config.simulation.seed,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(&cli.config)?;

    match &cli.command {
        Commands::Serve { bind } => cmd_serve(&config, bind).await,
        Commands::Sweep => cmd_sweep(&config).await,
        Commands::Stats => cmd_stats(&config),
    }
}

// ---------------------------------------------------------------------------
// Advisory pidfile for observability
// ---------------------------------------------------------------------------

fn pidfile_path(config: &Config) -> PathBuf {
    let mut path = PathBuf::from(&config.database.path);
    path.set_extension("pid");
    path
}

/// Check for an existing pidfile and log accordingly, then write our own.
fn acquire_pidfile(config: &Config) -> Option<PathBuf> {
    let path = pidfile_path(config);
    if let Ok(content) = std::fs::read_to_string(&path)
        && let Ok(pid) = content.trim().parse::<u32>()
    {
        if is_process_alive(pid) {
            tracing::warn!(
                "another linkpet serve (PID {pid}) is running — coexisting with busy_timeout"
            );
        } else {
            tracing::info!("cleaned up stale pidfile (PID {pid} is dead)");
            let _ = std::fs::remove_file(&path);
        }
    }

    match std::fs::File::create(&path) {
        Ok(mut f) => {
            let _ = write!(f, "{}", std::process::id());
            tracing::info!("wrote pidfile: {}", path.display());
            Some(path)
        }
        Err(e) => {
            tracing::warn!("failed to write pidfile: {e}");
            None
        }
    }
}

fn release_pidfile(path: &std::path::Path) {
    let _ = std::fs::remove_file(path);
    tracing::info!("removed pidfile: {}", path.display());
}

#[cfg(unix)]
fn is_process_alive(pid: u32) -> bool {
    // kill(pid, 0) checks existence without sending a signal
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    false // conservative: assume dead on non-unix
}

async fn cmd_serve(config: &Config, bind: &str) -> Result<()> {
    let engine = build_engine(config)?;
    tracing::info!("starting linkpet server on {bind}");

    let pidfile = acquire_pidfile(config);

    let shared = Arc::new(Mutex::new(engine));
    let result = server::serve(shared, bind, config.simulation.tick_interval_secs).await;

    if let Some(path) = pidfile {
        release_pidfile(&path);
    }
    result
}

async fn cmd_sweep(config: &Config) -> Result<()> {
    let mut engine = build_engine(config)?;
    let summary = engine.sweep_all(now_unix_secs()).await?;

    println!(
        "swept {} pets: {} transitions, {} trips resolved, {} errors",
        summary.pets, summary.transitions, summary.trips_resolved, summary.errors
    );
    Ok(())
}

fn cmd_stats(config: &Config) -> Result<()> {
    let engine = build_engine(config)?;
    let stats = engine.stats()?;

    println!("database: {}", config.database.path);
    println!("pets:     {}", stats.pets);
    println!("memories: {}", stats.memories);
    println!("diaries:  {}", stats.diaries);
    Ok(())
}
