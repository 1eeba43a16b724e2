//! vigild - self-installing fail-safe supervisor daemon
//!
//! Headless: the log stream is the only user-visible surface. Exit code
//! 0 covers the install handoff and interrupt-initiated shutdown;
//! anything non-zero is an unrecoverable top-level error, left to the
//! service manager to restart.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use vigil_config::logging::{init_logging, LogLevel};
use vigil_config::Config;
use vigil_core::supervisor;
use vigil_core::{Installer, WatchdogTick, WorkerSupervisor, WorkerTick};
use vigil_sys::{ControlFile, PgrepTable, ProcUptime, ShellSpawner, Systemctl};

/// Vigil - self-installing supervisor with a dead-man-switch fail-safe
#[derive(Parser)]
#[command(name = "vigild")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file path (defaults to /etc/vigil/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the sentinel file; power off when it goes stale
    Watchdog,
    /// Keep the worker pool running per the resource plan
    Workers,
    /// Print the default configuration as TOML
    PrintConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(LogLevel::Debug);

    let cli = Cli::parse();
    let config =
        Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Watchdog => run_watchdog(&config).await,
        Commands::Workers => run_workers(&config).await,
        Commands::PrintConfig => {
            print!("{}", Config::default_toml());
            Ok(())
        }
    }
}

/// Resolves on SIGINT or SIGTERM. systemd stops units with SIGTERM, so
/// both take the orderly shutdown path.
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            tracing::error!(error = %e, "cannot install SIGTERM handler");
            // Ctrl-C alone still gives an orderly path.
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}

async fn run_watchdog(config: &Config) -> Result<()> {
    let services = Systemctl;
    let installer = Installer::new(&config.install, &services);
    let failsafe = ControlFile::new(config.failsafe.control_path.clone());
    let uptime = ProcUptime::default();

    let tick = WatchdogTick::new(&config.sentinel, &config.supervisor, &failsafe, &uptime)
        .context("Failed to sample host uptime")?;
    let end = supervisor::install_or_run(&installer, tick, shutdown_signal())
        .await
        .context("Fatal error in watchdog loop")?;

    info!(?end, "vigild exiting");
    Ok(())
}

async fn run_workers(config: &Config) -> Result<()> {
    let services = Systemctl;
    let installer = Installer::new(&config.install, &services);
    let table = PgrepTable;
    let spawner = ShellSpawner;

    let tick = WorkerTick::new(
        WorkerSupervisor::new(&config.workers, &table, &spawner),
        num_cpus::get(),
        &config.supervisor,
    );
    let end = supervisor::install_or_run(&installer, tick, shutdown_signal())
        .await
        .context("Fatal error in worker loop")?;

    info!(?end, "vigild exiting");
    Ok(())
}
