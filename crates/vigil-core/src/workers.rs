//! Worker pool supervision.
//!
//! The supervisor owns no long-lived child handles. Liveness is a
//! process-table name query, because the workers it cares about may be
//! restarted by paths it never sees; the managed identity is the worker
//! binary name, nothing more. Reconciliation is drift correction: when
//! nothing matching that identity is observed, respawn the whole plan
//! and verify each role landed.

use std::ffi::OsString;

use tracing::{debug, error, info, warn};
use vigil_config::WorkerConfig;
use vigil_sys::{ProcessTable, Spawner};

use crate::plan::{ResourcePlan, WorkerRole};

/// One launchable worker invocation derived from a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub role: &'static str,
    pub program: OsString,
    pub args: Vec<String>,
}

/// What a reconcile pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Managed identity observed; nothing to do.
    AlreadyRunning,
    /// Plan respawned: `spawned` processes launched, `verified` of them
    /// observed running afterwards.
    Spawned { spawned: usize, verified: usize },
}

pub struct WorkerSupervisor<'a> {
    config: &'a WorkerConfig,
    table: &'a dyn ProcessTable,
    spawner: &'a dyn Spawner,
}

impl<'a> WorkerSupervisor<'a> {
    pub fn new(
        config: &'a WorkerConfig,
        table: &'a dyn ProcessTable,
        spawner: &'a dyn Spawner,
    ) -> Self {
        Self {
            config,
            table,
            spawner,
        }
    }

    /// Build the command line for one role.
    ///
    /// Throttled roles run under the limiter wrapper with their ceiling;
    /// unconstrained roles run the worker binary directly.
    fn command_for(&self, role: &WorkerRole) -> WorkerCommand {
        let worker_args = vec![
            "-o".to_string(),
            self.config.endpoint.clone(),
            format!("--threads={}", role.threads),
        ];
        match role.cpu_ceiling {
            Some(ceiling) => {
                let mut args = vec![
                    "-l".to_string(),
                    ceiling.to_string(),
                    "--".to_string(),
                    self.config.binary.display().to_string(),
                ];
                args.extend(worker_args);
                WorkerCommand {
                    role: role.name,
                    program: self.config.limiter.clone().into_os_string(),
                    args,
                }
            }
            None => WorkerCommand {
                role: role.name,
                program: self.config.binary.clone().into_os_string(),
                args: worker_args,
            },
        }
    }

    /// Command set for every non-empty role in the plan.
    pub fn commands(&self, plan: &ResourcePlan) -> Vec<WorkerCommand> {
        plan.roles.iter().map(|r| self.command_for(r)).collect()
    }

    /// Whether any process matching the managed identity is observed.
    ///
    /// Exited children are reaped first: a zombie still matches a name
    /// query, and counting one as running would suppress respawns of
    /// crashed workers indefinitely. A process-table error is absorbed
    /// as "not observed" and logged; the next tick retries.
    pub fn is_any_running(&self) -> bool {
        vigil_sys::reap_exited_children();
        match self.table.pids_of(&self.config.process_name) {
            Ok(pids) => !pids.is_empty(),
            Err(e) => {
                error!(error = %e, "process table query failed");
                false
            }
        }
    }

    /// Per-tick drift correction.
    ///
    /// Spawn failures and verification misses are logged, never fatal:
    /// remaining roles are still attempted and the next tick retries.
    pub fn reconcile(&self, plan: &ResourcePlan) -> ReconcileOutcome {
        if self.is_any_running() {
            debug!(name = %self.config.process_name, "worker observed running");
            return ReconcileOutcome::AlreadyRunning;
        }

        info!(
            name = %self.config.process_name,
            roles = plan.roles.len(),
            "no worker observed; spawning plan"
        );
        self.spawn_all(plan)
    }

    /// Launch every non-empty role, verifying each landed.
    ///
    /// Verification is logged per role and a miss never blocks the
    /// remaining roles.
    pub fn spawn_all(&self, plan: &ResourcePlan) -> ReconcileOutcome {
        let mut spawned = 0;
        let mut verified = 0;
        for command in self.commands(plan) {
            match self.spawner.spawn(&command.program, &command.args) {
                Ok(pid) => {
                    spawned += 1;
                    info!(role = command.role, pid = pid.as_raw(), "worker spawned");
                    if self.is_any_running() {
                        verified += 1;
                        debug!(role = command.role, "post-spawn verification passed");
                    } else {
                        error!(
                            role = command.role,
                            "worker not observed after spawn; will retry next tick"
                        );
                    }
                }
                Err(e) => {
                    error!(
                        role = command.role,
                        error = %e,
                        "spawn failed; will retry next tick"
                    );
                }
            }
        }
        ReconcileOutcome::Spawned { spawned, verified }
    }

    /// Terminate every process matching the managed identity.
    ///
    /// Used on shutdown, interrupt, and fatal-error paths; best effort
    /// by construction.
    pub fn kill_all(&self) {
        let pids = match self.table.pids_of(&self.config.process_name) {
            Ok(pids) => pids,
            Err(e) => {
                warn!(error = %e, "cannot enumerate workers for kill");
                return;
            }
        };
        for pid in pids {
            match self.table.kill(pid) {
                Ok(()) => info!(pid = pid.as_raw(), "worker killed"),
                Err(e) => warn!(pid = pid.as_raw(), error = %e, "kill failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_sys::testing::{FakeProcessTable, RecordingSpawner};

    fn test_config() -> WorkerConfig {
        WorkerConfig {
            binary: "/opt/vigil/worker".into(),
            process_name: "worker".to_string(),
            endpoint: "hub.test:3333".to_string(),
            limiter: "/usr/bin/cpulimit".into(),
        }
    }

    #[test]
    fn test_commands_throttle_limited_role_only() {
        let config = test_config();
        let table = FakeProcessTable::default();
        let spawner = RecordingSpawner::default();
        let supervisor = WorkerSupervisor::new(&config, &table, &spawner);

        let commands = supervisor.commands(&ResourcePlan::compute(8));
        assert_eq!(commands.len(), 3);

        let main = &commands[0];
        assert_eq!(main.program, OsString::from("/opt/vigil/worker"));
        assert!(main.args.contains(&"--threads=6".to_string()));

        let limited = &commands[1];
        assert_eq!(limited.program, OsString::from("/usr/bin/cpulimit"));
        assert_eq!(limited.args[..3], ["-l", "40", "--"]);
        assert!(limited.args.contains(&"--threads=1".to_string()));

        let free = &commands[2];
        assert_eq!(free.program, OsString::from("/opt/vigil/worker"));
        assert!(free.args.contains(&"--threads=1".to_string()));
    }

    #[test]
    fn test_reconcile_noop_when_worker_observed() {
        let config = test_config();
        let table = FakeProcessTable::default();
        table.set_steady(vec![4242]);
        let spawner = RecordingSpawner::default();
        let supervisor = WorkerSupervisor::new(&config, &table, &spawner);

        let outcome = supervisor.reconcile(&ResourcePlan::compute(4));
        assert_eq!(outcome, ReconcileOutcome::AlreadyRunning);
        assert_eq!(spawner.spawn_count(), 0);
    }

    #[test]
    fn test_reconcile_spawns_every_role_and_verifies_each() {
        let config = test_config();
        let table = FakeProcessTable::default();
        // First query sees nothing; verifications then observe workers.
        table.script(vec![]);
        table.set_steady(vec![1000]);
        let spawner = RecordingSpawner::default();
        let supervisor = WorkerSupervisor::new(&config, &table, &spawner);

        // plan(4): two non-empty roles.
        let outcome = supervisor.reconcile(&ResourcePlan::compute(4));
        assert_eq!(
            outcome,
            ReconcileOutcome::Spawned {
                spawned: 2,
                verified: 2
            }
        );
        assert_eq!(spawner.spawn_count(), 2);
    }

    #[test]
    fn test_failed_verification_does_not_block_remaining_roles() {
        let config = test_config();
        let table = FakeProcessTable::default();
        // Initial check, then both verifications, all see nothing.
        table.set_steady(vec![]);
        let spawner = RecordingSpawner::default();
        let supervisor = WorkerSupervisor::new(&config, &table, &spawner);

        let outcome = supervisor.reconcile(&ResourcePlan::compute(4));
        assert_eq!(
            outcome,
            ReconcileOutcome::Spawned {
                spawned: 2,
                verified: 0
            }
        );
        // Both roles were still attempted.
        assert_eq!(spawner.spawn_count(), 2);
    }

    #[test]
    fn test_kill_all_signals_every_match() {
        let config = test_config();
        let table = FakeProcessTable::default();
        table.set_steady(vec![11, 22, 33]);
        let spawner = RecordingSpawner::default();
        let supervisor = WorkerSupervisor::new(&config, &table, &spawner);

        supervisor.kill_all();
        assert_eq!(table.killed_pids(), vec![11, 22, 33]);
    }
}
