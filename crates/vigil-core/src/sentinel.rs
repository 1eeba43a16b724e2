//! Sentinel dead-man switch.
//!
//! The sole observed signal is the sentinel file's modification time.
//! The policy is deliberately asymmetric: a missing file or a read
//! error means the switch is NOT considered triggered — absence of
//! evidence is not evidence of staleness. Only a readable mtime older
//! than the threshold fires.

use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing::{debug, error, warn};

/// Whether the sentinel at `path` has gone stale.
///
/// Returns true only when `now − mtime > threshold`. `now` is passed in
/// so threshold boundaries can be tested without racing the clock.
pub fn is_triggered(path: &Path, threshold: Duration, now: SystemTime) -> bool {
    let mtime = match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(mtime) => mtime,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "sentinel file not found");
            return false;
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "cannot read sentinel mtime");
            return false;
        }
    };

    match now.duration_since(mtime) {
        Ok(age) if age > threshold => {
            debug!(
                path = %path.display(),
                age_secs = age.as_secs(),
                threshold_secs = threshold.as_secs(),
                "sentinel staleness condition met"
            );
            true
        }
        Ok(_) => false,
        // mtime in the future counts as fresh.
        Err(_) => false,
    }
}
