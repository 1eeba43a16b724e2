//! Privileged control interface: the fail-safe trigger.
//!
//! The entire implementation is one write of a one-character command to
//! the kernel's sysrq trigger file. The `o` command forces an immediate,
//! unclean power-off; there is no acknowledgement and no rollback. The
//! trigger is terminal — callers invoke it exactly once and then stop.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, error};

use crate::Result;

/// Sysrq command forcing an immediate power-off.
pub const POWER_OFF_COMMAND: &str = "o";

/// Settle pause after writing a sysrq command, giving the kernel a
/// moment to act before anything else runs.
pub const COMMAND_SETTLE: Duration = Duration::from_secs(1);

/// Terminal system action taken when the dead-man switch fires.
pub trait Failsafe: Send + Sync {
    /// Execute the irreversible fail-safe action.
    fn execute(&self) -> Result<()>;
}

/// Real implementation writing to the sysrq trigger file.
#[derive(Debug)]
pub struct ControlFile {
    path: PathBuf,
}

impl ControlFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Default for ControlFile {
    fn default() -> Self {
        Self::new(PathBuf::from("/proc/sysrq-trigger"))
    }
}

impl Failsafe for ControlFile {
    fn execute(&self) -> Result<()> {
        debug!(path = %self.path.display(), command = POWER_OFF_COMMAND, "writing power-off command");
        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        if let Err(e) = file.write_all(POWER_OFF_COMMAND.as_bytes()) {
            error!(error = %e, "fail-safe write failed");
            return Err(e.into());
        }
        std::thread::sleep(COMMAND_SETTLE);
        Ok(())
    }
}
