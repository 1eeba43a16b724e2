//! Recording and fixed-value implementations of the OS seams.
//!
//! These back the supervisor's unit tests: the idempotency and
//! exactly-once properties are asserted by counting calls recorded here
//! rather than by touching the real system.

use std::collections::VecDeque;
use std::ffi::OsStr;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use nix::unistd::Pid;

use crate::failsafe::Failsafe;
use crate::proc::{ProcessTable, Spawner};
use crate::service::ServiceManager;
use crate::uptime::UptimeSource;
use crate::Result;

/// Records every service-manager call as a formatted string.
#[derive(Debug, Default)]
pub struct RecordingServiceManager {
    pub calls: Mutex<Vec<String>>,
}

impl RecordingServiceManager {
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ServiceManager for RecordingServiceManager {
    fn reload(&self) -> Result<()> {
        self.calls.lock().unwrap().push("reload".to_string());
        Ok(())
    }

    fn enable(&self, unit: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("enable {unit}"));
        Ok(())
    }

    fn restart(&self, unit: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("restart {unit}"));
        Ok(())
    }
}

/// Process table with scripted query responses.
///
/// `pids_of` pops the front of the scripted queue; once the queue is
/// empty it returns the configured steady-state answer.
#[derive(Debug, Default)]
pub struct FakeProcessTable {
    scripted: Mutex<VecDeque<Vec<Pid>>>,
    steady: Mutex<Vec<Pid>>,
    pub killed: Mutex<Vec<Pid>>,
}

impl FakeProcessTable {
    pub fn script(&self, pids: Vec<i32>) {
        self.scripted
            .lock()
            .unwrap()
            .push_back(pids.into_iter().map(Pid::from_raw).collect());
    }

    pub fn set_steady(&self, pids: Vec<i32>) {
        *self.steady.lock().unwrap() = pids.into_iter().map(Pid::from_raw).collect();
    }

    pub fn killed_pids(&self) -> Vec<i32> {
        self.killed.lock().unwrap().iter().map(|p| p.as_raw()).collect()
    }
}

impl ProcessTable for FakeProcessTable {
    fn pids_of(&self, _name: &str) -> Result<Vec<Pid>> {
        if let Some(front) = self.scripted.lock().unwrap().pop_front() {
            return Ok(front);
        }
        Ok(self.steady.lock().unwrap().clone())
    }

    fn kill(&self, pid: Pid) -> Result<()> {
        self.killed.lock().unwrap().push(pid);
        Ok(())
    }
}

/// Spawner that records command lines instead of launching anything.
#[derive(Debug)]
pub struct RecordingSpawner {
    pub spawned: Mutex<Vec<String>>,
    next_pid: AtomicI32,
}

impl Default for RecordingSpawner {
    fn default() -> Self {
        Self {
            spawned: Mutex::new(Vec::new()),
            next_pid: AtomicI32::new(1000),
        }
    }
}

impl RecordingSpawner {
    pub fn spawn_count(&self) -> usize {
        self.spawned.lock().unwrap().len()
    }
}

impl Spawner for RecordingSpawner {
    fn spawn(&self, program: &OsStr, args: &[String]) -> Result<Pid> {
        let mut line = program.to_string_lossy().to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.spawned.lock().unwrap().push(line);
        Ok(Pid::from_raw(self.next_pid.fetch_add(1, Ordering::Relaxed)))
    }
}

/// Counts fail-safe executions.
#[derive(Debug, Default)]
pub struct RecordingFailsafe {
    fired: AtomicUsize,
}

impl RecordingFailsafe {
    pub fn fire_count(&self) -> usize {
        self.fired.load(Ordering::Relaxed)
    }
}

impl Failsafe for RecordingFailsafe {
    fn execute(&self) -> Result<()> {
        self.fired.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Uptime source returning a fixed value.
#[derive(Debug)]
pub struct FixedUptime(pub Duration);

impl UptimeSource for FixedUptime {
    fn uptime(&self) -> Result<Duration> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_process_table_scripting() {
        let table = FakeProcessTable::default();
        table.script(vec![]);
        table.script(vec![42]);
        table.set_steady(vec![7]);

        assert!(table.pids_of("w").unwrap().is_empty());
        assert_eq!(table.pids_of("w").unwrap(), vec![Pid::from_raw(42)]);
        assert_eq!(table.pids_of("w").unwrap(), vec![Pid::from_raw(7)]);
    }

    #[test]
    fn test_recording_spawner_formats_command_line() {
        let spawner = RecordingSpawner::default();
        spawner
            .spawn(OsStr::new("/bin/worker"), &["--threads=2".to_string()])
            .unwrap();
        assert_eq!(
            spawner.spawned.lock().unwrap()[0],
            "/bin/worker --threads=2"
        );
    }
}
