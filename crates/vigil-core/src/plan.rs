//! CPU resource planning.
//!
//! Pure policy: given the live core count, partition capacity into a
//! small fixed set of worker roles, leaving headroom for the host. One
//! role is always throttled as a safety valve so the machine stays
//! responsive even at the one-core floor.

/// Core count at which the full three-role split applies.
pub const CORE_THRESHOLD: usize = 8;

/// CPU ceiling (percent) applied to the throttled role.
pub const LIMITED_CPU_CEILING: u8 = 40;

/// Named worker category with a fixed thread count and optional
/// CPU throttling ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerRole {
    pub name: &'static str,
    pub threads: usize,
    /// Percent ceiling enforced by the limiter wrapper; `None` runs
    /// unconstrained.
    pub cpu_ceiling: Option<u8>,
}

/// Ordered role list computed fresh each run; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePlan {
    pub roles: Vec<WorkerRole>,
}

impl ResourcePlan {
    /// Partition `total_cores` into worker roles.
    ///
    /// - `total_cores >= 8`: main = cores − 2 unconstrained, limited =
    ///   1 throttled, free = 1 unconstrained.
    /// - below 8: main = cores − 1, limited = 1, no free role.
    ///
    /// A role that would get zero threads is omitted entirely. At one
    /// core only the throttled role remains — the ceiling is what
    /// keeps the host usable there.
    pub fn compute(total_cores: usize) -> Self {
        let (main, limited, free) = if total_cores >= CORE_THRESHOLD {
            (total_cores - 2, 1, 1)
        } else {
            (total_cores.saturating_sub(1), 1, 0)
        };

        let mut roles = Vec::new();
        if main > 0 {
            roles.push(WorkerRole {
                name: "main",
                threads: main,
                cpu_ceiling: None,
            });
        }
        if limited > 0 {
            roles.push(WorkerRole {
                name: "limited",
                threads: limited,
                cpu_ceiling: Some(LIMITED_CPU_CEILING),
            });
        }
        if free > 0 {
            roles.push(WorkerRole {
                name: "free",
                threads: free,
                cpu_ceiling: None,
            });
        }
        Self { roles }
    }

    /// Total threads handed to workers, throttled or not.
    pub fn total_threads(&self) -> usize {
        self.roles.iter().map(|r| r.threads).sum()
    }

    /// Threads that can each saturate a full core. The throttled role
    /// is excluded: its ceiling is what guarantees the host headroom,
    /// so it never counts as a full allocation.
    pub fn allocated_threads(&self) -> usize {
        self.roles
            .iter()
            .filter(|r| r.cpu_ceiling.is_none())
            .map(|r| r.threads)
            .sum()
    }

    pub fn role(&self, name: &str) -> Option<&WorkerRole> {
        self.roles.iter().find(|r| r.name == name)
    }
}
