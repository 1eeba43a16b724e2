//! Host uptime source.
//!
//! Reads `/proc/uptime`, whose first field is the uptime in seconds with
//! fractional precision. The warm-up gate needs exact seconds, so this
//! deliberately avoids the minute-granular `uptime -p` text output.

use std::path::PathBuf;
use std::time::Duration;

use crate::{Result, SysError};

/// Monotonic count of seconds the host has been running.
pub trait UptimeSource: Send + Sync {
    fn uptime(&self) -> Result<Duration>;
}

/// Real implementation parsing `/proc/uptime`.
#[derive(Debug)]
pub struct ProcUptime {
    path: PathBuf,
}

impl ProcUptime {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Default for ProcUptime {
    fn default() -> Self {
        Self::new(PathBuf::from("/proc/uptime"))
    }
}

impl UptimeSource for ProcUptime {
    fn uptime(&self) -> Result<Duration> {
        let contents = std::fs::read_to_string(&self.path)?;
        let first = contents
            .split_whitespace()
            .next()
            .ok_or_else(|| SysError::Malformed {
                what: "uptime file",
                detail: contents.clone(),
            })?;
        let secs: f64 = first.parse().map_err(|_| SysError::Malformed {
            what: "uptime file",
            detail: first.to_string(),
        })?;
        Duration::try_from_secs_f64(secs).map_err(|_| SysError::Malformed {
            what: "uptime file",
            detail: first.to_string(),
        })
    }
}
