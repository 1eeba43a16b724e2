//! The supervisor loop.
//!
//! Both operating modes share one state machine: install-or-run
//! decision, optional warm-up delay, then a poll loop with a pluggable
//! per-tick action and a terminal cleanup. The watchdog and worker
//! variants differ only in the [`TickAction`] plugged in, so their
//! failure-handling paths cannot drift apart.

use std::future::Future;
use std::time::{Duration, SystemTime};

use tracing::{error, info, warn};
use vigil_config::{SentinelConfig, SupervisorConfig};
use vigil_sys::{Failsafe, UptimeSource};

use crate::install::{InstallOutcome, Installer};
use crate::plan::ResourcePlan;
use crate::sentinel;
use crate::workers::WorkerSupervisor;
use crate::Result;

/// What one tick decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// Terminal action reached; the loop exits without cleanup.
    Stop,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// Fresh install performed; the service manager relaunches us.
    InstallHandoff,
    /// The tick action reached its terminal state.
    Completed,
    /// External interrupt; workers were cleaned up.
    Interrupted,
}

/// Per-tick behavior plugged into the shared loop.
pub trait TickAction {
    /// Mode name for logs.
    fn label(&self) -> &'static str;

    /// One-time delay before the first tick.
    fn warmup(&self) -> Duration {
        Duration::ZERO
    }

    /// Pause between ticks.
    fn interval(&self) -> Duration;

    /// One poll step. Errors are fatal to the loop.
    fn tick(&mut self) -> Result<TickOutcome>;

    /// Cleanup on interrupt or fatal error. Not called after `Stop`.
    fn shutdown(&mut self);
}

/// Run the install-or-run decision, then the steady-state loop.
///
/// Install failure is logged and the run continues — the next process
/// start re-evaluates from the fingerprint comparison and self-heals.
pub async fn install_or_run<A, F>(
    installer: &Installer<'_>,
    action: A,
    shutdown: F,
) -> Result<RunEnd>
where
    A: TickAction,
    F: Future<Output = ()>,
{
    match installer.ensure_installed() {
        Ok(InstallOutcome::Installed) => {
            info!("installed; exiting so the service manager takes over");
            return Ok(RunEnd::InstallHandoff);
        }
        Ok(InstallOutcome::NotNeeded) => {}
        Err(e) => {
            warn!(error = %e, "installation failed; continuing this run");
        }
    }
    run(action, shutdown).await
}

/// The steady-state loop: warm-up, then tick / sleep until a terminal
/// outcome, an interrupt, or a fatal error.
pub async fn run<A, F>(mut action: A, shutdown: F) -> Result<RunEnd>
where
    A: TickAction,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let warmup = action.warmup();
    if !warmup.is_zero() {
        info!(
            mode = action.label(),
            delay_secs = warmup.as_secs(),
            "warm-up delay before first tick"
        );
        tokio::select! {
            _ = &mut shutdown => {
                info!(mode = action.label(), "interrupted during warm-up");
                action.shutdown();
                return Ok(RunEnd::Interrupted);
            }
            _ = tokio::time::sleep(warmup) => {}
        }
    }

    info!(mode = action.label(), "entering steady-state loop");
    loop {
        match action.tick() {
            Ok(TickOutcome::Continue) => {}
            Ok(TickOutcome::Stop) => {
                info!(mode = action.label(), "terminal tick; loop exiting");
                return Ok(RunEnd::Completed);
            }
            Err(e) => {
                error!(mode = action.label(), error = %e, "fatal error in supervisor loop");
                action.shutdown();
                return Err(e);
            }
        }

        tokio::select! {
            _ = &mut shutdown => {
                info!(mode = action.label(), "interrupt received; shutting down");
                action.shutdown();
                return Ok(RunEnd::Interrupted);
            }
            _ = tokio::time::sleep(action.interval()) => {}
        }
    }
}

/// Watchdog mode: poll the sentinel; fire the fail-safe once on
/// staleness, then stop.
pub struct WatchdogTick<'a> {
    sentinel: &'a SentinelConfig,
    failsafe: &'a dyn Failsafe,
    warmup: Duration,
    interval: Duration,
}

impl<'a> WatchdogTick<'a> {
    /// Sample uptime once and derive the warm-up remainder.
    ///
    /// An unreadable uptime is fatal for the run: without it the
    /// warm-up gate cannot be honored.
    pub fn new(
        sentinel: &'a SentinelConfig,
        timing: &SupervisorConfig,
        failsafe: &'a dyn Failsafe,
        uptime: &dyn UptimeSource,
    ) -> Result<Self> {
        let up = uptime.uptime()?;
        let warmup = timing.warmup_uptime().saturating_sub(up);
        info!(
            uptime_secs = up.as_secs(),
            warmup_secs = warmup.as_secs(),
            "uptime sampled"
        );
        Ok(Self {
            sentinel,
            failsafe,
            warmup,
            interval: timing.watchdog_interval(),
        })
    }
}

impl TickAction for WatchdogTick<'_> {
    fn label(&self) -> &'static str {
        "watchdog"
    }

    fn warmup(&self) -> Duration {
        self.warmup
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn tick(&mut self) -> Result<TickOutcome> {
        if !sentinel::is_triggered(
            &self.sentinel.path,
            self.sentinel.staleness(),
            SystemTime::now(),
        ) {
            return Ok(TickOutcome::Continue);
        }

        error!(
            path = %self.sentinel.path.display(),
            "sentinel stale; executing fail-safe"
        );
        // Terminal either way: the trigger is invoked exactly once and
        // the loop ends even if the write fails.
        if let Err(e) = self.failsafe.execute() {
            error!(error = %e, "fail-safe execution failed");
        }
        Ok(TickOutcome::Stop)
    }

    fn shutdown(&mut self) {}
}

/// Worker mode: reconcile the pool every tick; kill all workers on the
/// way out.
pub struct WorkerTick<'a> {
    supervisor: WorkerSupervisor<'a>,
    plan: ResourcePlan,
    interval: Duration,
}

impl<'a> WorkerTick<'a> {
    pub fn new(
        supervisor: WorkerSupervisor<'a>,
        total_cores: usize,
        timing: &SupervisorConfig,
    ) -> Self {
        let plan = ResourcePlan::compute(total_cores);
        info!(cores = total_cores, ?plan, "resource plan computed");
        Self {
            supervisor,
            plan,
            interval: timing.worker_interval(),
        }
    }
}

impl TickAction for WorkerTick<'_> {
    fn label(&self) -> &'static str {
        "workers"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn tick(&mut self) -> Result<TickOutcome> {
        self.supervisor.reconcile(&self.plan);
        Ok(TickOutcome::Continue)
    }

    fn shutdown(&mut self) {
        self.supervisor.kill_all();
    }
}
