//! Service manager seam.
//!
//! Three idempotent calls cover everything the installer needs:
//! reload the unit registry, enable the unit at boot, start-or-restart
//! it. Callers treat all three as fire-and-forget; a non-zero exit is
//! surfaced as an error for the caller to log, never acted on beyond
//! that.

use std::process::Command;

use tracing::debug;

use crate::{Result, SysError};

/// OS service registry operations used during self-installation.
pub trait ServiceManager: Send + Sync {
    /// Reload the service registry so a freshly written unit is seen.
    fn reload(&self) -> Result<()>;
    /// Register the unit to start at boot.
    fn enable(&self, unit: &str) -> Result<()>;
    /// Start the unit, restarting it if already running.
    fn restart(&self, unit: &str) -> Result<()>;
}

/// Real implementation shelling out to `systemctl`.
#[derive(Debug, Default)]
pub struct Systemctl;

impl Systemctl {
    fn run(&self, args: &[&str]) -> Result<()> {
        let status = Command::new("systemctl").args(args).status()?;
        debug!(?args, %status, "systemctl invoked");
        if status.success() {
            Ok(())
        } else {
            Err(SysError::CommandFailed {
                command: format!("systemctl {}", args.join(" ")),
                status,
            })
        }
    }
}

impl ServiceManager for Systemctl {
    fn reload(&self) -> Result<()> {
        self.run(&["daemon-reload"])
    }

    fn enable(&self, unit: &str) -> Result<()> {
        self.run(&["enable", unit])
    }

    fn restart(&self, unit: &str) -> Result<()> {
        self.run(&["restart", unit])
    }
}
