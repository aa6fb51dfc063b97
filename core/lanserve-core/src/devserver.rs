//! Vite dev-server configuration rendering.
//!
//! The frontend's `vite.config.js` is wholly owned by the supervisor: it is
//! regenerated from typed fields on every run, never patched. This replaces
//! textual pattern-substitution over arbitrary file content with an explicit
//! serializer over known fields.

use fs_err as fs;
use std::net::Ipv4Addr;
use std::path::Path;

use crate::error::{LanserveError, Result};

/// Network descriptor for the Vite dev server.
///
/// `host`/`port` are where the dev server binds; requests under `/api` are
/// proxied to the backend at `http://{host}:{backend_port}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevServerConfig {
    pub host: Ipv4Addr,
    pub port: u16,
    pub backend_port: u16,
}

impl DevServerConfig {
    /// Renders the complete `vite.config.js` text.
    pub fn render(&self) -> String {
        format!(
            r#"import {{ defineConfig }} from "vite";
import react from "@vitejs/plugin-react";

export default defineConfig({{
  plugins: [react()],
  server: {{
    host: "{host}",
    port: {port},
    strictPort: true,
    proxy: {{
      "/api": {{
        target: "http://{host}:{backend_port}",
        changeOrigin: true,
        secure: false,
      }},
    }},
  }},
}});
"#,
            host = self.host,
            port = self.port,
            backend_port = self.backend_port,
        )
    }

    /// Writes the rendered artifact to `path`, replacing any previous content.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render()).map_err(|source| LanserveError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })
    }
}
