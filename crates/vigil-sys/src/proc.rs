//! Process table seam.
//!
//! Liveness and kill are keyed on a process-name match, not on held
//! child handles: workers may be respawned outside the supervisor's
//! sight, so the OS process table is the source of truth. Name matching
//! is an accepted approximation — an unrelated process that happens to
//! share the worker binary name will be counted (and killed by
//! `kill_all`).

use std::ffi::OsStr;
use std::process::{Command, Stdio};

use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tracing::debug;

use crate::{Result, SysError};

/// Query-by-name and kill against the OS process table.
pub trait ProcessTable: Send + Sync {
    /// PIDs of processes whose name exactly matches `name`.
    fn pids_of(&self, name: &str) -> Result<Vec<Pid>>;
    /// Unconditionally terminate `pid` (SIGKILL).
    fn kill(&self, pid: Pid) -> Result<()>;
}

/// Real implementation backed by `pgrep -x` and `SIGKILL`.
#[derive(Debug, Default)]
pub struct PgrepTable;

impl ProcessTable for PgrepTable {
    fn pids_of(&self, name: &str) -> Result<Vec<Pid>> {
        let output = Command::new("pgrep").arg("-x").arg(name).output()?;

        // Exit 1 means "no processes matched", which is a normal answer.
        if !output.status.success() && output.status.code() != Some(1) {
            return Err(SysError::CommandFailed {
                command: format!("pgrep -x {name}"),
                status: output.status,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut pids = Vec::new();
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            let raw: i32 = line.trim().parse().map_err(|_| SysError::Malformed {
                what: "pgrep output",
                detail: line.to_string(),
            })?;
            pids.push(Pid::from_raw(raw));
        }
        debug!(name, count = pids.len(), "process table queried");
        Ok(pids)
    }

    fn kill(&self, pid: Pid) -> Result<()> {
        kill(pid, Signal::SIGKILL)?;
        debug!(pid = pid.as_raw(), "SIGKILL delivered");
        Ok(())
    }
}

/// Detached subprocess launch.
///
/// The supervisor never holds on to child handles — after a successful
/// spawn the process is tracked only through [`ProcessTable`] name
/// queries, so respawns elsewhere don't invalidate anything.
pub trait Spawner: Send + Sync {
    /// Launch `program` with `args`, detached; returns the child PID.
    fn spawn(&self, program: &OsStr, args: &[String]) -> Result<Pid>;
}

/// Real implementation using `std::process::Command`.
#[derive(Debug, Default)]
pub struct ShellSpawner;

impl Spawner for ShellSpawner {
    fn spawn(&self, program: &OsStr, args: &[String]) -> Result<Pid> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        let pid = Pid::from_raw(child.id() as i32);
        debug!(program = %program.to_string_lossy(), pid = pid.as_raw(), "worker spawned");
        // Handle dropped deliberately: liveness is tracked by name.
        // Exited children are collected by reap_exited_children.
        Ok(pid)
    }
}

/// Collect every exited child of this process, without blocking.
///
/// Dropped spawn handles mean exited workers linger as zombies, and a
/// zombie still matches a name query — left uncollected it would keep
/// counting as "running" and suppress respawns forever. Callers sweep
/// this before every liveness decision. Returns the number reaped.
pub fn reap_exited_children() -> usize {
    let mut reaped = 0;
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(status) => {
                if let Some(pid) = status.pid() {
                    debug!(pid = pid.as_raw(), "exited child reaped");
                }
                reaped += 1;
            }
            // ECHILD: no children left to wait for.
            Err(_) => break,
        }
    }
    reaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    fn wait_for_zombie(pid: Pid) {
        let stat_path = format!("/proc/{}/stat", pid.as_raw());
        for _ in 0..50 {
            if let Ok(stat) = fs::read_to_string(&stat_path) {
                if stat.contains(") Z ") {
                    return;
                }
            }
            std::thread::sleep(Duration::from_millis(100));
        }
        panic!("child never reached zombie state");
    }

    /// A crashed worker must stop counting as running once swept:
    /// unreaped it stays a zombie that still matches a name query,
    /// which would suppress respawns forever.
    #[test]
    fn test_exited_child_counts_as_running_until_reaped() {
        // Unique short name (comm is truncated to 15 chars).
        let dir = tempfile::tempdir().unwrap();
        let name = format!("vreap{}", std::process::id());
        let binary = dir.path().join(&name);
        fs::copy("/bin/sh", &binary).unwrap();

        let pid = ShellSpawner
            .spawn(binary.as_os_str(), &["-c".to_string(), "exit 0".to_string()])
            .unwrap();
        wait_for_zombie(pid);

        // Zombie still matches by name.
        let table = PgrepTable;
        assert_eq!(table.pids_of(&name).unwrap(), vec![pid]);

        assert!(reap_exited_children() >= 1, "exited child was never reaped");
        assert!(
            table.pids_of(&name).unwrap().is_empty(),
            "reaped child still matched by name"
        );
        assert!(!Path::new(&format!("/proc/{}", pid.as_raw())).exists());
    }
}
