//! Toolchain and dependency checks: one-shot external collaborators whose
//! success or failure we observe but do not orchestrate.

use std::path::Path;
use std::process::Command;
use tracing::info;

use lanserve_core::{LanserveError, Result};

/// Probes `<tool> --version`, returning the reported version on success.
pub fn toolchain_version(tool: &str) -> Option<String> {
    let output = Command::new(tool).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if version.is_empty() {
        None
    } else {
        Some(version)
    }
}

/// Fails with `EnvironmentMissing` if the tool cannot be probed.
pub fn require_tool(tool: &str) -> Result<()> {
    match toolchain_version(tool) {
        Some(version) => {
            info!(tool, version = %version, "toolchain found");
            Ok(())
        }
        None => Err(LanserveError::EnvironmentMissing {
            tool: tool.to_string(),
        }),
    }
}

pub fn has_node_modules(dir: &Path) -> bool {
    dir.join("node_modules").is_dir()
}

/// Runs `npm install` in `dir` with inherited stdio so the operator sees
/// npm's own progress output. A non-zero exit is fatal.
pub fn install_dependencies(dir: &Path, name: &str) -> Result<()> {
    info!(service = name, "installing npm dependencies");
    let status = Command::new("npm")
        .arg("install")
        .current_dir(dir)
        .status()
        .map_err(|_| LanserveError::DependencyInstallFailure {
            name: name.to_string(),
        })?;

    if status.success() {
        info!(service = name, "dependencies installed");
        Ok(())
    } else {
        Err(LanserveError::DependencyInstallFailure {
            name: name.to_string(),
        })
    }
}

/// Installs dependencies only when `node_modules` is missing.
pub fn ensure_dependencies(dir: &Path, name: &str) -> Result<()> {
    if has_node_modules(dir) {
        info!(service = name, "dependencies already installed");
        Ok(())
    } else {
        install_dependencies(dir, name)
    }
}
