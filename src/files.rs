use std::collections::HashSet;
use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use is_terminal::IsTerminal;

#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub metadata: FileMetadata,
}

#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub is_dir: bool,
}

impl FileEntry {
    pub fn is_file(&self) -> bool {
        !self.metadata.is_dir
    }
}

/// Reads one path per line from stdin when it is piped rather than a terminal.
pub fn read_piped_paths() -> Result<Vec<String>> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(Vec::new());
    }
    read_path_lines(stdin.lock())
}

fn read_path_lines(reader: impl BufRead) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line.context("reading file paths from stdin")?;
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if !trimmed.is_empty() {
            lines.push(trimmed.to_string());
        }
    }
    Ok(lines)
}

/// Piped paths come first, then `-i` paths; duplicates keep their first slot.
///
/// Nothing is opened here. Unreadable targets fail later, one file at a time.
pub fn resolve_targets(explicit: &[PathBuf], piped: &[String]) -> Vec<FileEntry> {
    let mut candidates: Vec<PathBuf> = Vec::new();

    for line in piped {
        if line == "." {
            continue;
        }
        let path = absolute(Path::new(line));
        if path.exists() {
            candidates.push(path);
        }
    }

    for path in explicit {
        if path.is_file() {
            candidates.push(absolute(path));
        } else {
            println!("warning: invalid file path supplied: {}", path.display());
        }
    }

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|path| seen.insert(path.clone()))
        .map(describe)
        .collect()
}

fn describe(path: PathBuf) -> FileEntry {
    // existence was checked above; a later race surfaces as a read error
    let is_dir = fs::metadata(&path).is_ok_and(|meta| meta.is_dir());
    FileEntry {
        metadata: FileMetadata { is_dir },
        path,
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
