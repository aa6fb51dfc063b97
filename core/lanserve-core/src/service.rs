//! Service data model: launch specifications and live handles.

use std::path::PathBuf;
use std::process::Child;

/// How to launch a supervised service.
///
/// Immutable once built: a restart derives a fresh process from the same
/// spec, never a mutated one.
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    pub name: String,
    /// argv, program first. Never empty.
    pub command: Vec<String>,
    pub dir: PathBuf,
    /// Extra environment on top of the inherited parent environment.
    pub env: Vec<(String, String)>,
}

impl ServiceSpec {
    pub fn new(
        name: impl Into<String>,
        command: &[&str],
        dir: impl Into<PathBuf>,
        env: &[(&str, &str)],
    ) -> Self {
        Self {
            name: name.into(),
            command: command.iter().map(|s| s.to_string()).collect(),
            dir: dir.into(),
            env: env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Starting,
    Running,
    Exited(i32),
    /// Restart budget exhausted; the whole session is going down.
    Failed,
}

/// A launched service. Owned exclusively by the supervisor table and removed
/// only when its process group has been terminated during cleanup.
pub struct ServiceHandle {
    pub(crate) spec: ServiceSpec,
    pub(crate) child: Child,
    /// Process-group id (the child is its group leader).
    pub(crate) pgid: i32,
    pub(crate) restarts: u32,
    pub(crate) state: ServiceState,
}

impl ServiceHandle {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn pgid(&self) -> i32 {
        self.pgid
    }

    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }
}
