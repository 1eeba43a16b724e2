//! # vigil-core
//!
//! The supervisor's moving parts: content fingerprinting, idempotent
//! self-installation, CPU resource planning, worker reconciliation, the
//! sentinel dead-man switch, and the loop that ties them together.
//!
//! All OS side effects go through the `vigil-sys` traits; nothing in
//! this crate touches the service manager, process table, or control
//! file directly.

pub mod error;
pub mod fingerprint;
pub mod install;
pub mod plan;
pub mod sentinel;
pub mod supervisor;
pub mod workers;

pub use error::{CoreError, Result};
pub use fingerprint::{fingerprint, ContentFingerprint};
pub use install::{InstallOutcome, Installer};
pub use plan::{ResourcePlan, WorkerRole};
pub use supervisor::{RunEnd, TickAction, TickOutcome, WatchdogTick, WorkerTick};
pub use workers::{ReconcileOutcome, WorkerSupervisor};
