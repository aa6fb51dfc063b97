//! Error types for lanserve operations.
//!
//! Everything here is fatal to the session. Recoverable conditions (a service
//! crash within its restart budget) never surface as errors; termination
//! failures during cleanup are logged, not raised.

use std::path::PathBuf;

/// All errors that can abort a lanserve run.
#[derive(Debug, thiserror::Error)]
pub enum LanserveError {
    #[error("{tool} is required but was not found (install from https://nodejs.org/)")]
    EnvironmentMissing { tool: String },

    #[error("dependency install failed for {name}")]
    DependencyInstallFailure { name: String },

    #[error("service directory not found: {0}")]
    MissingServiceDir(PathBuf),

    #[error("config I/O failed: {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{name} exhausted its restart budget")]
    RestartExhausted { name: String },
}

/// Convenience type alias for Results using LanserveError.
pub type Result<T> = std::result::Result<T, LanserveError>;
