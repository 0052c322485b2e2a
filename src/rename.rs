//! Cascades a replacement mapping onto file and directory names.
//!
//! Only the last component of each target is rewritten. Entries are ordered
//! deepest-first so a directory is renamed after everything inside it.

use std::fs;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use anyhow::{Context, Result};

use crate::mapping::ReplacementMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameEntry {
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenamePlan {
    pub entries: Vec<RenameEntry>,
    /// Paths whose rewritten name is empty or would span directories.
    pub rejected: Vec<PathBuf>,
}

pub enum RenameOutcome {
    Renamed,
    Skipped(String),
}

impl RenamePlan {
    pub fn build<'a>(paths: impl IntoIterator<Item = &'a Path>, map: &ReplacementMap) -> Self {
        let mut entries = Vec::new();
        let mut rejected = Vec::new();
        for path in paths {
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let renamed = map.apply(name);
            if renamed == name {
                continue;
            }
            if renamed.is_empty() || renamed.contains('/') || renamed.contains(MAIN_SEPARATOR) {
                rejected.push(path.to_path_buf());
                continue;
            }
            entries.push(RenameEntry {
                from: path.to_path_buf(),
                to: path.with_file_name(renamed),
            });
        }

        entries.sort_by(|a, b| {
            depth(&b.from)
                .cmp(&depth(&a.from))
                .then_with(|| a.from.cmp(&b.from))
        });
        entries.dedup_by(|a, b| a.from == b.from);
        rejected.sort();
        RenamePlan { entries, rejected }
    }
}

fn depth(path: &Path) -> usize {
    path.components().count()
}

/// Renames one entry unless the destination already exists.
pub fn apply_rename(entry: &RenameEntry) -> Result<RenameOutcome> {
    if entry.to.exists() {
        return Ok(RenameOutcome::Skipped(format!(
            "{} already exists",
            entry.to.display()
        )));
    }

    fs::rename(&entry.from, &entry.to).with_context(|| {
        format!(
            "renaming {} to {}",
            entry.from.display(),
            entry.to.display()
        )
    })?;
    Ok(RenameOutcome::Renamed)
}
