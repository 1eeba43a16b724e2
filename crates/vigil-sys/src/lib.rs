//! # vigil-sys
//!
//! Narrow interfaces to the OS facilities the supervisor depends on:
//! service registration, the process table, the privileged control file,
//! and the host uptime counter.
//!
//! Each facility is a trait with one real implementation. The supervisor
//! core only ever sees the traits, so every side-effecting path can be
//! exercised against the recorders in [`testing`].

pub mod failsafe;
pub mod proc;
pub mod service;
pub mod testing;
pub mod uptime;

pub use failsafe::{ControlFile, Failsafe};
pub use proc::{reap_exited_children, PgrepTable, ProcessTable, ShellSpawner, Spawner};
pub use service::{ServiceManager, Systemctl};
pub use uptime::{ProcUptime, UptimeSource};

use std::process::ExitStatus;

/// Errors from OS facility calls
#[derive(Debug, thiserror::Error)]
pub enum SysError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("command `{command}` exited with {status}")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("signal delivery failed: {0}")]
    Signal(#[from] nix::Error),

    #[error("malformed {what}: {detail}")]
    Malformed { what: &'static str, detail: String },
}

pub type Result<T> = std::result::Result<T, SysError>;
