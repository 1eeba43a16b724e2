//! Idempotent self-installation.
//!
//! The invariant that matters: once the deployed copy matches the
//! running binary byte-for-byte, repeated runs perform zero writes and
//! zero service-manager calls. Everything else is self-healing — a
//! partial install leaves its completed work in place and the next run
//! re-evaluates from the fingerprint comparison.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};
use vigil_config::InstallConfig;
use vigil_sys::ServiceManager;

use crate::fingerprint::fingerprint;
use crate::Result;

/// Rendered with one substitution: the absolute installed path.
fn render_unit(exec_path: &Path) -> String {
    format!(
        "[Unit]\n\
         Description=Vigil supervisor daemon\n\
         \n\
         [Service]\n\
         ExecStart={}\n\
         Restart=always\n\
         \n\
         [Install]\n\
         WantedBy=multi-user.target\n",
        exec_path.display()
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Deployed copy already matches the running binary.
    NotNeeded,
    /// Binary deployed and service registered; caller should exit and
    /// let the service manager take over.
    Installed,
}

pub struct Installer<'a> {
    config: &'a InstallConfig,
    services: &'a dyn ServiceManager,
}

impl<'a> Installer<'a> {
    pub fn new(config: &'a InstallConfig, services: &'a dyn ServiceManager) -> Self {
        Self { config, services }
    }

    /// Ensure the running executable is deployed and registered.
    ///
    /// Fails only when the running binary itself cannot be
    /// fingerprinted — without that there is nothing safe to compare.
    pub fn ensure_installed(&self) -> Result<InstallOutcome> {
        let source = std::env::current_exe()?;
        self.ensure_installed_from(&source)
    }

    /// Same as [`ensure_installed`](Self::ensure_installed) with an
    /// explicit source path.
    pub fn ensure_installed_from(&self, source: &Path) -> Result<InstallOutcome> {
        let source_fp = fingerprint(source)?;
        let target = &self.config.target_path;

        if target.exists() {
            match fingerprint(target) {
                Ok(target_fp) if target_fp == source_fp => {
                    debug!(target = %target.display(), "already installed and up to date");
                    return Ok(InstallOutcome::NotNeeded);
                }
                Ok(target_fp) => {
                    info!(
                        source = %source_fp.to_hex(),
                        installed = %target_fp.to_hex(),
                        "installed copy out of date"
                    );
                }
                Err(e) => {
                    warn!(error = %e, "cannot fingerprint installed copy; reinstalling");
                }
            }
        }

        self.deploy_binary(source)?;
        self.write_unit()?;
        self.register_service();
        info!(target = %target.display(), "installation complete");
        Ok(InstallOutcome::Installed)
    }

    /// Copy the binary into place via temp file + rename, so a partial
    /// copy can never be mistaken for a valid install.
    fn deploy_binary(&self, source: &Path) -> Result<()> {
        let target = &self.config.target_path;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp = temp_sibling(target);
        fs::copy(source, &temp)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp, fs::Permissions::from_mode(0o755))?;
        }
        if let Err(e) = fs::rename(&temp, target) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        debug!(target = %target.display(), "binary deployed");
        Ok(())
    }

    /// Write the service unit with the same write-then-rename
    /// discipline, so the service manager never sees a half-written
    /// descriptor.
    fn write_unit(&self) -> Result<()> {
        let unit_path = &self.config.unit_path;
        if let Some(parent) = unit_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp = temp_sibling(unit_path);
        fs::write(&temp, render_unit(&self.config.target_path))?;
        if let Err(e) = fs::rename(&temp, unit_path) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        debug!(unit = %unit_path.display(), "service unit written");
        Ok(())
    }

    /// Fire-and-forget registration: a non-zero systemctl exit is
    /// logged but does not fail the install.
    fn register_service(&self) {
        let unit = &self.config.unit_name;
        if let Err(e) = self.services.reload() {
            warn!(error = %e, "service registry reload failed");
        }
        if let Err(e) = self.services.enable(unit) {
            warn!(unit, error = %e, "service enable failed");
        }
        if let Err(e) = self.services.restart(unit) {
            warn!(unit, error = %e, "service restart failed");
        }
    }
}

fn temp_sibling(path: &Path) -> std::path::PathBuf {
    let name = format!(
        "{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id()
    );
    path.with_file_name(name)
}
