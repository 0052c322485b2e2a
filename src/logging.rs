use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub const DEFAULT_LOG_DIR: &str = ".refactor";
const LOG_FILE: &str = "change_log.jsonl";
const MAX_ENTRIES: usize = 500;

#[derive(Debug, Serialize)]
pub struct ChangeLogEntry<'a> {
    pub timestamp: &'a str,
    pub action: &'a str,
    pub path: &'a Path,
    pub detail: &'a str,
}

/// Rolling JSONL record of files rewritten or renamed.
#[derive(Debug, Clone)]
pub struct ChangeLog {
    dir: PathBuf,
}

impl ChangeLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }

    /// Adds one entry, dropping the oldest so at most 500 remain.
    pub fn record(&self, action: &str, path: &Path, detail: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".into());
        let json = serde_json::to_string(&ChangeLogEntry {
            timestamp: &timestamp,
            action,
            path,
            detail,
        })?;

        let log_path = self.path();
        let existing = match fs::read_to_string(&log_path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(err) => {
                return Err(err).with_context(|| format!("reading {}", log_path.display()));
            }
        };
        let stale = existing.lines().count().saturating_sub(MAX_ENTRIES - 1);
        let mut rolled: String = existing
            .lines()
            .skip(stale)
            .flat_map(|line| [line, "\n"])
            .collect();
        rolled.push_str(&json);
        rolled.push('\n');
        fs::write(&log_path, rolled).with_context(|| format!("writing {}", log_path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn entries_are_json_lines() {
        let temp = tempdir().expect("temp dir");
        let log = ChangeLog::new(temp.path().join("logs"));
        log.record("applied", Path::new("/tmp/a.txt"), "3 replacements")
            .expect("record");

        let content = fs::read_to_string(log.path()).expect("read log");
        let value: serde_json::Value =
            serde_json::from_str(content.trim_end()).expect("valid json");
        assert_eq!(value["action"], "applied");
        assert_eq!(value["path"], "/tmp/a.txt");
        assert_eq!(value["detail"], "3 replacements");
        assert!(value["timestamp"].as_str().is_some());
    }

    #[test]
    fn log_is_capped() {
        let temp = tempdir().expect("temp dir");
        let log = ChangeLog::new(temp.path());
        for idx in 0..(MAX_ENTRIES + 5) {
            log.record("renamed", Path::new("x"), &idx.to_string())
                .expect("record");
        }
        let content = fs::read_to_string(log.path()).expect("read log");
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), MAX_ENTRIES);
        assert!(lines[0].contains("\"detail\":\"5\""));
    }
}
