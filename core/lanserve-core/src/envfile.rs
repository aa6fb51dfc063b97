//! Persisted `.env` synthesis for the backend service.
//!
//! The file is user-owned: we overwrite the keys that must reflect the
//! current run (host, port), fill in defaults for keys that are merely
//! absent, and preserve everything else verbatim and in its original
//! relative order. Rendering uses a fixed section layout so that repeated
//! merges with unchanged inputs produce a byte-identical file.

use fs_err as fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::{LanserveError, Result};

const SERVER_KEYS: [&str; 2] = ["HOST", "PORT"];
const DATABASE_KEYS: [&str; 4] = ["DB_HOST", "DB_USER", "DB_PASSWORD", "DB_NAME"];
const SECURITY_KEYS: [&str; 1] = ["SECRET_JWT"];

/// An ordered `KEY=VALUE` document.
///
/// Entry order is insertion order: keys parsed from an existing file keep
/// their original relative position, keys added by a merge append at the end.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnvDocument {
    entries: Vec<(String, String)>,
}

impl EnvDocument {
    /// Parses `KEY=VALUE` lines. Blank lines, `#` comments, and lines
    /// without `=` are ignored. A duplicated key keeps its first position
    /// and the last value.
    pub fn parse(text: &str) -> Self {
        let mut doc = Self::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                doc.set(key.trim(), value.trim());
            }
        }
        doc
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Sets `key` to `value`, overwriting in place if present.
    pub fn set(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    /// Sets `key` to `value` only if the key is absent.
    pub fn set_if_absent(&mut self, key: &str, value: &str) {
        if self.get(key).is_none() {
            self.entries.push((key.to_string(), value.to_string()));
        }
    }

    /// Renders the document: server block, database block, security block,
    /// then all remaining keys in their original order. Only keys actually
    /// present are emitted, so rendering adds nothing the merge didn't.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.push_section(&mut out, "# Server", &SERVER_KEYS);
        self.push_section(&mut out, "# Database", &DATABASE_KEYS);
        self.push_section(&mut out, "# Security", &SECURITY_KEYS);
        for (key, value) in &self.entries {
            if is_sectioned(key) {
                continue;
            }
            out.push_str(&format!("{}={}\n", key, value));
        }
        out
    }

    fn push_section(&self, out: &mut String, header: &str, keys: &[&str]) {
        let present: Vec<(&str, &str)> = keys
            .iter()
            .filter_map(|key| self.get(key).map(|value| (*key, value)))
            .collect();
        if present.is_empty() {
            return;
        }
        out.push_str(header);
        out.push('\n');
        for (key, value) in present {
            out.push_str(&format!("{}={}\n", key, value));
        }
        out.push('\n');
    }
}

fn is_sectioned(key: &str) -> bool {
    SERVER_KEYS.contains(&key) || DATABASE_KEYS.contains(&key) || SECURITY_KEYS.contains(&key)
}

/// Merges required and defaulted keys into the `.env` file at `path`.
///
/// `required` entries always overwrite (the network identity must reflect the
/// current run); `defaults` entries only fill gaps. The write is atomic
/// (temp + rename) so a crash cannot leave a half-written file. Idempotent:
/// merging an already-merged file with the same inputs is byte-identical.
pub fn merge_env_file(
    path: &Path,
    required: &[(&str, &str)],
    defaults: &[(&str, &str)],
) -> Result<()> {
    let config_io = |source: std::io::Error| LanserveError::ConfigIo {
        path: path.to_path_buf(),
        source,
    };

    let mut doc = match fs::read_to_string(path) {
        Ok(text) => EnvDocument::parse(&text),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => EnvDocument::default(),
        Err(err) => return Err(config_io(err)),
    };

    for (key, value) in required {
        doc.set(key, value);
    }
    for (key, value) in defaults {
        doc.set_if_absent(key, value);
    }

    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp = match parent {
        Some(dir) => NamedTempFile::new_in(dir),
        None => NamedTempFile::new(),
    }
    .map_err(config_io)?;
    tmp.write_all(doc.render().as_bytes()).map_err(config_io)?;
    tmp.flush().map_err(config_io)?;
    tmp.persist(path).map_err(|err| config_io(err.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn merge(path: &Path) {
        merge_env_file(
            path,
            &[("ADDR", "10.0.0.5"), ("PORT", "3001")],
            &[("DB_HOST", "localhost")],
        )
        .unwrap();
    }

    #[test]
    fn fresh_file_contains_exactly_the_merged_keys() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".env");

        merge(&path);

        let doc = EnvDocument::parse(&fs::read_to_string(&path).unwrap());
        assert_eq!(doc.get("ADDR"), Some("10.0.0.5"));
        assert_eq!(doc.get("PORT"), Some("3001"));
        assert_eq!(doc.get("DB_HOST"), Some("localhost"));
        assert_eq!(doc.entries.len(), 3);
    }

    #[test]
    fn existing_values_survive_and_defaults_do_not_overwrite() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".env");
        fs::write(&path, "DB_HOST=remote\nFOO=bar\n").unwrap();

        merge(&path);

        let content = fs::read_to_string(&path).unwrap();
        let doc = EnvDocument::parse(&content);
        assert_eq!(doc.get("DB_HOST"), Some("remote"));
        assert_eq!(doc.get("FOO"), Some("bar"));
        assert_eq!(doc.get("ADDR"), Some("10.0.0.5"));
        assert_eq!(doc.get("PORT"), Some("3001"));
    }

    #[test]
    fn merge_is_idempotent_byte_for_byte() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".env");
        fs::write(&path, "# hand-written comment\nFOO=bar\nHOST=stale\n").unwrap();

        merge(&path);
        let first = fs::read_to_string(&path).unwrap();
        merge(&path);
        let second = fs::read_to_string(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn unrelated_keys_keep_their_relative_order() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".env");
        fs::write(&path, "ZETA=1\nALPHA=2\nMIDDLE=3\n").unwrap();

        merge(&path);

        let content = fs::read_to_string(&path).unwrap();
        let zeta = content.find("ZETA=1").unwrap();
        let alpha = content.find("ALPHA=2").unwrap();
        let middle = content.find("MIDDLE=3").unwrap();
        assert!(zeta < alpha && alpha < middle);
    }

    #[test]
    fn required_keys_always_reflect_the_current_run() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".env");
        fs::write(&path, "HOST=192.168.0.99\nPORT=9999\n").unwrap();

        merge_env_file(&path, &[("HOST", "10.0.0.5"), ("PORT", "3001")], &[]).unwrap();

        let doc = EnvDocument::parse(&fs::read_to_string(&path).unwrap());
        assert_eq!(doc.get("HOST"), Some("10.0.0.5"));
        assert_eq!(doc.get("PORT"), Some("3001"));
    }

    #[test]
    fn parse_ignores_comments_and_blank_lines() {
        let doc = EnvDocument::parse("# comment\n\n  \nKEY=value\nnot a pair\n");
        assert_eq!(doc.entries.len(), 1);
        assert_eq!(doc.get("KEY"), Some("value"));
    }

    #[test]
    fn sectioned_keys_render_under_their_headers() {
        let mut doc = EnvDocument::default();
        doc.set("EXTRA", "1");
        doc.set("HOST", "10.0.0.5");
        doc.set("SECRET_JWT", "shhh");

        let rendered = doc.render();
        let server = rendered.find("# Server").unwrap();
        let security = rendered.find("# Security").unwrap();
        let extra = rendered.find("EXTRA=1").unwrap();
        assert!(server < security && security < extra);
    }
}
