//! Process supervision: group spawning, liveness polling, bounded restart.
//!
//! One supervisor owns the whole table of services. The loop is cooperative
//! and strictly sequential: services are polled in table order, one cycle per
//! `poll_interval`, so no locking is needed anywhere. Restarts are bounded;
//! exhausting the budget for any one service fails the whole session, because
//! the frontend proxies to the backend and neither is useful alone.

use std::process::{Child, Command};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::cancel::CancelFlag;
use crate::error::{LanserveError, Result};
use crate::service::{ServiceHandle, ServiceSpec, ServiceState};

/// Process-wide supervision constants, set once at startup.
#[derive(Debug, Clone, Copy)]
pub struct SupervisionPolicy {
    /// Cadence of liveness checks.
    pub poll_interval: Duration,
    /// Wait after (re)launching a service before it is next inspected,
    /// letting it reach a minimally-ready state.
    pub startup_grace: Duration,
    /// Automatic relaunch budget per service.
    pub max_restarts: u32,
}

impl Default for SupervisionPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            startup_grace: Duration::from_secs(3),
            max_restarts: 3,
        }
    }
}

/// Non-blocking liveness answer for a single service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Running,
    Exited(i32),
}

/// Why the supervisory loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Operator interrupt or explicit cancellation.
    Interrupted,
    /// The named service exhausted its restart budget.
    ServiceFailed(String),
}

/// Owns the table of supervised services.
pub struct Supervisor {
    handles: Vec<ServiceHandle>,
    policy: SupervisionPolicy,
}

impl Supervisor {
    pub fn new(policy: SupervisionPolicy) -> Self {
        Self {
            handles: Vec::new(),
            policy,
        }
    }

    pub fn policy(&self) -> &SupervisionPolicy {
        &self.policy
    }

    pub fn handles(&self) -> &[ServiceHandle] {
        &self.handles
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Spawns `spec` as the leader of a new process group and registers the
    /// handle in the table.
    pub fn launch(&mut self, spec: ServiceSpec) -> Result<()> {
        let child = spawn_group(&spec).map_err(|source| LanserveError::Spawn {
            name: spec.name.clone(),
            source,
        })?;
        let pgid = child.id() as i32;
        info!(service = %spec.name, pid = child.id(), "service launched");
        self.handles.push(ServiceHandle {
            spec,
            child,
            pgid,
            restarts: 0,
            state: ServiceState::Starting,
        });
        Ok(())
    }

    /// Re-derives a fresh process from the slot's spec, preserving its
    /// restart history.
    fn relaunch(&mut self, index: usize) -> Result<()> {
        let spec = self.handles[index].spec.clone();
        let child = spawn_group(&spec).map_err(|source| LanserveError::Spawn {
            name: spec.name.clone(),
            source,
        })?;
        let handle = &mut self.handles[index];
        info!(service = %handle.spec.name, pid = child.id(), "service relaunched");
        handle.pgid = child.id() as i32;
        handle.child = child;
        handle.state = ServiceState::Starting;
        Ok(())
    }

    /// Non-blocking liveness check. Updates the handle's state but never
    /// restarts anything by itself.
    pub fn poll(&mut self, index: usize) -> Liveness {
        let handle = &mut self.handles[index];
        match handle.child.try_wait() {
            Ok(Some(status)) => {
                let code = status.code().unwrap_or(-1);
                handle.state = ServiceState::Exited(code);
                Liveness::Exited(code)
            }
            Ok(None) => {
                handle.state = ServiceState::Running;
                Liveness::Running
            }
            Err(err) => {
                // Transient wait failure; treat as alive and retry next cycle.
                warn!(service = %handle.spec.name, error = %err, "liveness check failed");
                Liveness::Running
            }
        }
    }

    /// Runs the supervisory loop until a service exhausts its restart budget
    /// or `cancel` trips. Does not terminate anything itself; the caller runs
    /// the shutdown path on every outcome.
    pub fn run(&mut self, cancel: &CancelFlag) -> Result<Outcome> {
        loop {
            if cancel.is_cancelled() {
                return Ok(Outcome::Interrupted);
            }

            for index in 0..self.handles.len() {
                let Liveness::Exited(code) = self.poll(index) else {
                    continue;
                };
                let name = self.handles[index].spec.name.clone();
                let restarts = self.handles[index].restarts;
                if restarts < self.policy.max_restarts {
                    self.handles[index].restarts += 1;
                    warn!(
                        service = %name,
                        code,
                        attempt = restarts + 1,
                        max = self.policy.max_restarts,
                        "service exited unexpectedly; restarting"
                    );
                    thread::sleep(self.policy.startup_grace);
                    self.relaunch(index)?;
                } else {
                    self.handles[index].state = ServiceState::Failed;
                    error!(
                        service = %name,
                        code,
                        restarts,
                        "service failed after exhausting restarts"
                    );
                    return Ok(Outcome::ServiceFailed(name));
                }
            }

            thread::sleep(self.policy.poll_interval);
        }
    }

    /// Sends a termination request to the service's whole process group.
    /// A group that has already exited is a no-op, not an error.
    pub fn terminate_group(&mut self, index: usize) -> std::io::Result<()> {
        let handle = &mut self.handles[index];
        debug!(
            service = handle.name(),
            pid = handle.pid(),
            pgid = handle.pgid(),
            "terminating process group"
        );
        signal_group(handle.pgid)?;
        // Reap the leader if it has already gone down; termination itself is
        // fire-and-forget.
        let _ = handle.child.try_wait();
        Ok(())
    }

    /// Terminates every tracked group in table order and empties the table.
    /// Per-service failures are collected, never raised, so one stuck group
    /// cannot shield the rest.
    pub fn shutdown_all(&mut self) -> Vec<(String, std::io::Error)> {
        let mut failures = Vec::new();
        for index in 0..self.handles.len() {
            if let Err(err) = self.terminate_group(index) {
                failures.push((self.handles[index].spec.name.clone(), err));
            }
        }
        self.handles.clear();
        failures
    }
}

fn spawn_group(spec: &ServiceSpec) -> std::io::Result<Child> {
    let (program, args) = spec.command.split_first().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty service command")
    })?;

    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(&spec.dir);
    for (key, value) in &spec.env {
        cmd.env(key, value);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Make the child a session/group leader so npm's own children are
        // terminable as one unit.
        unsafe {
            cmd.pre_exec(|| {
                if libc::setsid() == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
    }

    cmd.spawn()
}

#[cfg(unix)]
fn signal_group(pgid: i32) -> std::io::Result<()> {
    let rc = unsafe { libc::kill(-pgid, libc::SIGTERM) };
    if rc == -1 {
        let err = std::io::Error::last_os_error();
        // Group already gone: idempotent no-op.
        if err.raw_os_error() == Some(libc::ESRCH) {
            return Ok(());
        }
        return Err(err);
    }
    Ok(())
}

#[cfg(windows)]
fn signal_group(pgid: i32) -> std::io::Result<()> {
    // No process-group signal on Windows; kill the process tree instead.
    let status = Command::new("taskkill")
        .args(["/F", "/T", "/PID", &pgid.to_string()])
        .status()?;
    // taskkill reports 128 for "not found", which is the idempotent case.
    if status.success() || status.code() == Some(128) {
        Ok(())
    } else {
        Err(std::io::Error::other(format!(
            "taskkill exited with {:?}",
            status.code()
        )))
    }
}
