//! lanserve: LAN development supervisor for a backend + Vite frontend pair.
//!
//! Sequences one run end to end: verify the toolchain, resolve the machine's
//! LAN address, synthesize configuration for both services, launch them as
//! process groups, supervise with bounded restarts, and terminate every group
//! on the way out. Exit code 0 on a clean exit or operator interrupt, 1 on
//! any fatal condition.

mod checks;

use clap::Parser;
use std::env;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lanserve_core::{
    install_signal_hook, merge_env_file, resolve_local_addr, CancelFlag, DevServerConfig,
    LanserveError, Outcome, Result, ServiceSpec, ShutdownGuard, SupervisionPolicy, Supervisor,
};

const BACKEND_PORT: u16 = 3001;
const FRONTEND_PORT: u16 = 5173;

const ENV_DEFAULTS: [(&str, &str); 5] = [
    ("DB_HOST", "localhost"),
    ("DB_USER", "root"),
    ("DB_PASSWORD", ""),
    ("DB_NAME", "caderno_chef"),
    ("SECRET_JWT", "your-secret-key-here-change-in-production"),
];

#[derive(Parser)]
#[command(name = "lanserve")]
#[command(about = "Expose the local backend + frontend pair on the LAN")]
#[command(version)]
struct Cli {}

fn main() {
    init_logging();
    let Cli {} = Cli::parse();

    if let Err(err) = run() {
        error!(error = %err, "lanserve failed");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run() -> Result<()> {
    let root = env::current_dir().map_err(|source| LanserveError::ConfigIo {
        path: PathBuf::from("."),
        source,
    })?;
    let backend = service_dir(&root, "backend")?;
    let frontend = service_dir(&root, "frontend")?;

    checks::require_tool("node")?;
    checks::require_tool("npm")?;
    checks::ensure_dependencies(&backend, "backend")?;
    checks::ensure_dependencies(&frontend, "frontend")?;

    let host = resolve_local_addr();
    info!(%host, "LAN address resolved");

    synthesize_config(&backend, &frontend, host)?;

    let cancel = CancelFlag::new();
    install_signal_hook(&cancel);

    let mut supervisor = Supervisor::new(SupervisionPolicy::default());
    let mut guard = ShutdownGuard::new();

    let outcome = supervise(&mut supervisor, &cancel, &backend, &frontend, host);
    guard.run(&mut supervisor);

    match outcome? {
        Outcome::Interrupted => {
            info!("interrupt received; services terminated");
            Ok(())
        }
        Outcome::ServiceFailed(name) => Err(LanserveError::RestartExhausted { name }),
    }
}

fn service_dir(root: &Path, name: &str) -> Result<PathBuf> {
    let dir = root.join(name);
    if dir.is_dir() {
        Ok(dir)
    } else {
        Err(LanserveError::MissingServiceDir(dir))
    }
}

fn synthesize_config(backend: &Path, frontend: &Path, host: Ipv4Addr) -> Result<()> {
    let host_value = host.to_string();
    let port_value = BACKEND_PORT.to_string();
    let required = [("HOST", host_value.as_str()), ("PORT", port_value.as_str())];
    merge_env_file(&backend.join(".env"), &required, &ENV_DEFAULTS)?;
    info!("backend .env synthesized");

    let dev_server = DevServerConfig {
        host,
        port: FRONTEND_PORT,
        backend_port: BACKEND_PORT,
    };
    dev_server.write_to(&frontend.join("vite.config.js"))?;
    info!("frontend vite.config.js generated");
    Ok(())
}

/// Launches both services and runs the supervisory loop. Termination is the
/// caller's job (the shutdown guard runs on every outcome, ok or error).
fn supervise(
    supervisor: &mut Supervisor,
    cancel: &CancelFlag,
    backend: &Path,
    frontend: &Path,
    host: Ipv4Addr,
) -> Result<Outcome> {
    let host_value = host.to_string();
    let grace = supervisor.policy().startup_grace;

    let backend_port = BACKEND_PORT.to_string();
    let backend_spec = ServiceSpec::new(
        "backend",
        &["npm", "start"],
        backend,
        &[("HOST", &host_value), ("PORT", &backend_port)],
    );
    supervisor.launch(backend_spec)?;
    // Let the API come up before the frontend starts proxying to it.
    thread::sleep(grace);

    let frontend_port = FRONTEND_PORT.to_string();
    let frontend_spec = ServiceSpec::new(
        "frontend",
        &["npm", "run", "dev"],
        frontend,
        &[("HOST", &host_value), ("PORT", &frontend_port)],
    );
    supervisor.launch(frontend_spec)?;
    thread::sleep(grace);

    print_access_info(host);
    supervisor.run(cancel)
}

fn print_access_info(host: Ipv4Addr) {
    info!("servers started");
    info!(url = %format!("http://localhost:{FRONTEND_PORT}"), "frontend (local)");
    info!(url = %format!("http://localhost:{BACKEND_PORT}"), "backend (local)");
    info!(url = %format!("http://{host}:{FRONTEND_PORT}"), "frontend (LAN)");
    info!(url = %format!("http://{host}:{BACKEND_PORT}"), "backend (LAN)");
    info!("press Ctrl+C to stop");
}

#[cfg(test)]
mod tests {
    use super::*;
    use fs_err as fs;
    use tempfile::TempDir;

    #[test]
    fn missing_service_dir_is_fatal() {
        let temp = TempDir::new().unwrap();
        let err = service_dir(temp.path(), "backend").unwrap_err();
        assert!(matches!(err, LanserveError::MissingServiceDir(_)));
    }

    #[test]
    fn synthesize_config_writes_both_artifacts() {
        let temp = TempDir::new().unwrap();
        let backend = temp.path().join("backend");
        let frontend = temp.path().join("frontend");
        fs::create_dir(&backend).unwrap();
        fs::create_dir(&frontend).unwrap();

        let host = Ipv4Addr::new(10, 0, 0, 5);
        synthesize_config(&backend, &frontend, host).unwrap();

        let env = fs::read_to_string(backend.join(".env")).unwrap();
        assert!(env.contains("HOST=10.0.0.5"));
        assert!(env.contains("PORT=3001"));
        assert!(env.contains("DB_HOST=localhost"));

        let vite = fs::read_to_string(frontend.join("vite.config.js")).unwrap();
        assert!(vite.contains(r#"target: "http://10.0.0.5:3001""#));
        assert!(vite.contains("port: 5173"));
    }
}
