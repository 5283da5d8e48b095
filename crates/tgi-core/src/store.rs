use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::Result;

/// Flat `key=value` configuration store.
///
/// Keys are `{account_id}_{field}` plus global settings such as
/// `API_BEARER_TOKEN`. Nothing is ever deleted through this interface.
pub trait ConfigStore: Send + Sync {
    /// All entries in file order. Duplicate keys are reported as-is.
    fn read_all(&self) -> Result<Vec<(String, String)>>;

    /// Last value stored for `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .read_all()?
            .into_iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v))
    }

    /// Replace `key` in place or append it. Atomic with respect to other
    /// upserts on the same store.
    fn upsert(&self, key: &str, value: &str) -> Result<()>;
}

/// `.env`-style file store.
#[derive(Debug)]
pub struct EnvFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl EnvFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_raw(&self) -> Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(s) => Ok(s),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_atomic(&self, contents: &str) -> Result<()> {
        let file_name = self
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(".env");
        let tmp = self
            .path
            .with_file_name(format!(".{file_name}.tmp-{}", std::process::id()));

        fs::write(&tmp, contents)?;
        if let Ok(md) = fs::metadata(&self.path) {
            fs::set_permissions(&tmp, md.permissions())?;
        }
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

impl ConfigStore for EnvFileStore {
    fn read_all(&self) -> Result<Vec<(String, String)>> {
        Ok(parse_env(&self.read_raw()?))
    }

    fn upsert(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let current = self.read_raw()?;
        let updated = upsert_line(&current, key, value);
        self.write_atomic(&updated)?;

        tracing::debug!(key, path = %self.path.display(), "config store updated");
        Ok(())
    }
}

/// Parse one `KEY=VALUE` line. Blank lines and `#` comments yield `None`.
pub fn parse_env_line(raw: &str) -> Option<(String, String)> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (k, v) = line.split_once('=')?;
    let key = k.trim();
    if key.is_empty() {
        return None;
    }

    let mut val = v.trim();
    // Strip optional surrounding quotes.
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        val = &val[1..val.len() - 1];
    }

    Some((key.to_string(), val.to_string()))
}

pub fn parse_env(contents: &str) -> Vec<(String, String)> {
    contents.lines().filter_map(parse_env_line).collect()
}

/// Rewrite `contents` so that exactly one line holds `key=value`.
///
/// The first matching line is replaced in place and later duplicates are
/// dropped; without a match the line is appended. All other lines are kept
/// byte-for-byte, including a trailing newline.
fn upsert_line(contents: &str, key: &str, value: &str) -> String {
    let new_line = format!("{key}={value}");

    let trailing_newline = contents.is_empty() || contents.ends_with('\n');
    let body = contents.strip_suffix('\n').unwrap_or(contents);

    let mut lines: Vec<&str> = Vec::new();
    let mut found = false;
    if !body.is_empty() {
        for line in body.split('\n') {
            if parse_env_line(line).is_some_and(|(k, _)| k == key) {
                if !found {
                    lines.push(&new_line);
                    found = true;
                }
                continue;
            }
            lines.push(line);
        }
    }
    if !found {
        lines.push(&new_line);
    }

    let mut out = lines.join("\n");
    if trailing_newline {
        out.push('\n');
    }
    out
}
