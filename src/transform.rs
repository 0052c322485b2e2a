use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use crate::encoding::{DecodedText, EncodingStrategy};
use crate::files::FileEntry;

pub struct TransformContext<'a> {
    pub entry: &'a FileEntry,
    pub encoding: &'a EncodingStrategy,
    pub include_binary: bool,
}

pub struct TransformResult {
    pub decoded: DecodedText,
    pub new_text: String,
}

/// Reads and decodes the entry; `None` for suspected binaries.
pub fn read_text(ctx: &TransformContext<'_>) -> Result<Option<DecodedText>> {
    let bytes = fs::read(&ctx.entry.path)
        .with_context(|| format!("failed to read {}", ctx.entry.path.display()))?;
    if !ctx.include_binary && ctx.encoding.looks_binary(&bytes) {
        println!(
            "skipping {} (suspected binary file)",
            ctx.entry.path.display()
        );
        return Ok(None);
    }

    let decoded = ctx.encoding.decode(&bytes);
    if decoded.had_errors {
        println!(
            "warning: decoding errors encountered for {} ({} via {}); continuing",
            ctx.entry.path.display(),
            decoded.decision.encoding.name(),
            decoded.decision.source
        );
    }

    Ok(Some(decoded))
}

/// Writes the result over the original file, returning the backup path if one was made.
pub fn write_result(path: &Path, result: &TransformResult, backup: bool) -> Result<Option<PathBuf>> {
    let (encoded, had_errors) = result.decoded.encode(&result.new_text);
    if had_errors {
        println!(
            "warning: encoding fallback occurred when writing {}; output may be lossy",
            path.display()
        );
    }
    let backup_path = if backup { Some(create_backup(path)?) } else { None };
    replace_contents(path, &encoded)?;
    Ok(backup_path)
}

/// Copies `path` to the first free `<name>.bak`, `<name>.bak1`, ... beside it.
fn create_backup(path: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name to back up", path.display()))?;
    let backup = std::iter::once(format!("{name}.bak"))
        .chain((1..).map(|n| format!("{name}.bak{n}")))
        .map(|candidate| path.with_file_name(candidate))
        .find(|candidate| !candidate.exists())
        .with_context(|| format!("no free backup name for {}", path.display()))?;
    fs::copy(path, &backup).with_context(|| format!("creating backup {}", backup.display()))?;
    Ok(backup)
}

/// Stages `data` in a sibling temp file, then renames it over `path`.
fn replace_contents(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staged = NamedTempFile::new_in(dir)
        .with_context(|| format!("staging rewrite of {}", path.display()))?;
    staged.write_all(data)?;
    staged.as_file().sync_all()?;
    if let Ok(original) = fs::metadata(path) {
        staged.as_file().set_permissions(original.permissions())?;
    }
    staged
        .persist(path)
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::FileMetadata;
    use tempfile::tempdir;

    fn entry_for(path: &Path) -> FileEntry {
        FileEntry {
            path: path.to_path_buf(),
            metadata: FileMetadata { is_dir: false },
        }
    }

    fn rewrite(path: &Path, new_text: &str) -> TransformResult {
        let entry = entry_for(path);
        let encoding = EncodingStrategy::default();
        let ctx = TransformContext {
            entry: &entry,
            encoding: &encoding,
            include_binary: false,
        };
        let decoded = read_text(&ctx).expect("read").expect("text file");
        TransformResult {
            decoded,
            new_text: new_text.to_string(),
        }
    }

    #[test]
    fn binary_entries_are_skipped_unless_included() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("a.bin");
        fs::write(&path, b"a\0b").expect("write");
        let entry = entry_for(&path);
        let encoding = EncodingStrategy::default();
        let mut ctx = TransformContext {
            entry: &entry,
            encoding: &encoding,
            include_binary: false,
        };
        assert!(read_text(&ctx).expect("read").is_none());
        ctx.include_binary = true;
        assert!(read_text(&ctx).expect("read").is_some());
    }

    #[test]
    fn write_result_replaces_content_and_backs_up() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("a.txt");
        fs::write(&path, "old").expect("write");
        fs::write(temp.path().join("a.txt.bak"), "older").expect("write");
        let result = rewrite(&path, "new");

        let backup = write_result(&path, &result, true).expect("write");
        assert_eq!(backup, Some(temp.path().join("a.txt.bak1")));
        assert_eq!(fs::read_to_string(&path).expect("read"), "new");
        assert_eq!(fs::read_to_string(temp.path().join("a.txt.bak1")).expect("read"), "old");
        assert_eq!(fs::read_to_string(temp.path().join("a.txt.bak")).expect("read"), "older");
    }

    #[test]
    fn write_without_backup_leaves_no_extra_files() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("a.txt");
        fs::write(&path, "old").expect("write");
        let result = rewrite(&path, "new");
        assert!(write_result(&path, &result, false).expect("write").is_none());
        let names: Vec<_> = fs::read_dir(temp.path())
            .expect("list")
            .map(|e| e.expect("entry").file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("a.txt")]);
    }

    #[cfg(unix)]
    #[test]
    fn rewrite_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("run.sh");
        fs::write(&path, "echo old").expect("write");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        let result = rewrite(&path, "echo new");

        write_result(&path, &result, false).expect("write");
        let mode = fs::metadata(&path).expect("meta").permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert_eq!(fs::read_to_string(&path).expect("read"), "echo new");
    }
}
