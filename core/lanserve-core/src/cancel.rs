//! Cancellation and the single cleanup path.
//!
//! A [`CancelFlag`] is an explicit, passed-around object so that tests can
//! build isolated supervisors and trip cancellation by hand; only
//! [`install_signal_hook`] touches process-global state, and it is installed
//! at most once per run. [`ShutdownGuard`] is the one cleanup routine every
//! exit path flows through: normal loop exit, operator interrupt, or fatal
//! orchestration error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use crate::supervisor::Supervisor;

/// Cooperative cancellation flag observed by the supervisory loop.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

static SIGNAL_FLAG: OnceLock<CancelFlag> = OnceLock::new();

extern "C" fn on_termination_signal(_signal: libc::c_int) {
    // Only an atomic store; safe in signal context.
    if let Some(flag) = SIGNAL_FLAG.get() {
        flag.cancel();
    }
}

/// Routes SIGINT/SIGTERM to `flag`. Installing a second hook in the same
/// process is a no-op; the first flag stays wired.
///
/// On non-Unix platforms this is a stub and Ctrl-C falls through to the
/// default console handling.
pub fn install_signal_hook(flag: &CancelFlag) {
    if SIGNAL_FLAG.set(flag.clone()).is_err() {
        warn!("signal hook already installed; keeping the existing flag");
        return;
    }

    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGINT, on_termination_signal as libc::sighandler_t);
        libc::signal(libc::SIGTERM, on_termination_signal as libc::sighandler_t);
    }
}

/// The single cleanup routine. Safe to invoke any number of times; only the
/// first invocation terminates anything.
#[derive(Default)]
pub struct ShutdownGuard {
    done: bool,
}

impl ShutdownGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Terminates every tracked process group in table order. Per-service
    /// failures are reported and swallowed so one stuck group cannot prevent
    /// the others from being attempted.
    pub fn run(&mut self, supervisor: &mut Supervisor) {
        if self.done {
            debug!("shutdown already ran; nothing to do");
            return;
        }
        self.done = true;

        if supervisor.is_empty() {
            debug!("no services to terminate");
            return;
        }

        info!(services = supervisor.handles().len(), "shutting down services");
        for (name, err) in supervisor.shutdown_all() {
            warn!(service = %name, error = %err, "failed to terminate process group");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::SupervisionPolicy;

    #[test]
    fn cancel_flag_trips_once_and_stays_tripped() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());
        flag.cancel();
        assert!(flag.is_cancelled());
        flag.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn clones_share_the_same_flag() {
        let flag = CancelFlag::new();
        let observer = flag.clone();
        flag.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn shutdown_on_empty_table_is_a_no_op() {
        let mut supervisor = Supervisor::new(SupervisionPolicy::default());
        let mut guard = ShutdownGuard::new();
        guard.run(&mut supervisor);
        guard.run(&mut supervisor);
        assert!(supervisor.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn shutdown_terminates_every_service_exactly_once() {
        use crate::service::ServiceSpec;
        use std::time::Duration;
        use tempfile::TempDir;

        let dir = TempDir::new().unwrap();
        let policy = SupervisionPolicy {
            poll_interval: Duration::from_millis(10),
            startup_grace: Duration::from_millis(1),
            max_restarts: 0,
        };
        let mut supervisor = Supervisor::new(policy);
        for name in ["api", "ui"] {
            let spec = ServiceSpec::new(name, &["/bin/sh", "-c", "sleep 30"], dir.path(), &[]);
            supervisor.launch(spec).unwrap();
        }

        let mut guard = ShutdownGuard::new();
        guard.run(&mut supervisor);
        assert!(supervisor.is_empty());

        // Second invocation observes an empty table and does nothing.
        guard.run(&mut supervisor);
        assert!(supervisor.is_empty());
    }
}
