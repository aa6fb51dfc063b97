//! # lanserve-core
//!
//! Supervision and configuration-synthesis engine for `lanserve`, a LAN
//! development supervisor for a backend + Vite frontend pair.
//!
//! ## Design principles
//!
//! - **Synchronous**: one supervisory thread, a cooperative polling loop, no
//!   async runtime. Blocking points are bounded sleeps only.
//! - **Single owner**: the supervision table is owned by [`Supervisor`] and
//!   mutated only by its loop; no locking is needed.
//! - **No orphans**: every launched process group is terminated on every exit
//!   path (normal, interrupt, or error) via [`ShutdownGuard`].
//! - **Best-effort identity**: LAN address detection may be wrong (loopback);
//!   everything downstream still works for same-machine access.

pub mod cancel;
pub mod devserver;
pub mod envfile;
pub mod error;
pub mod net;
pub mod service;
pub mod supervisor;

pub use cancel::{install_signal_hook, CancelFlag, ShutdownGuard};
pub use devserver::DevServerConfig;
pub use envfile::{merge_env_file, EnvDocument};
pub use error::{LanserveError, Result};
pub use net::resolve_local_addr;
pub use service::{ServiceSpec, ServiceState};
pub use supervisor::{Liveness, Outcome, SupervisionPolicy, Supervisor};
