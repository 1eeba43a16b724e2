//! Error taxonomy for the supervisor core.
//!
//! Four families: file I/O, process lifecycle, external command
//! invocation, and logic errors (states that should be unreachable).
//! Component operations log and absorb their own failures; only the
//! installer's own-fingerprint failure and the loop's top-level error
//! propagate out of this crate.

use vigil_sys::SysError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("process error: {0}")]
    Process(#[source] SysError),

    #[error("external command error: {0}")]
    ExternalCommand(#[source] SysError),

    #[error("logic error: {0}")]
    Logic(String),
}

impl From<SysError> for CoreError {
    fn from(err: SysError) -> Self {
        match err {
            SysError::Io(e) => CoreError::Io(e),
            e @ SysError::CommandFailed { .. } => CoreError::ExternalCommand(e),
            e @ SysError::Signal(_) => CoreError::Process(e),
            e @ SysError::Malformed { .. } => CoreError::Logic(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
