use anyhow::Result;

use crate::encoding::EncodingStrategy;
use crate::files::FileEntry;
use crate::mapping::ReplacementMap;
use crate::transform::{TransformContext, TransformResult, read_text, write_result};

#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    pub backup: bool,
    pub include_binary: bool,
}

/// What a plan pass found in one file.
pub struct PlannedFile {
    pub matched: ReplacementMap,
    pub old_text: String,
    pub new_text: String,
}

pub enum ApplyOutcome {
    Applied {
        replacements: usize,
        backup: Option<std::path::PathBuf>,
    },
    Unchanged,
    /// Suspected binary, left alone.
    Skipped,
}

/// Read-only: the mapping entries whose keys occur in the file.
pub fn plan_file(
    entry: &FileEntry,
    encoding: &EncodingStrategy,
    map: &ReplacementMap,
    include_binary: bool,
) -> Result<Option<PlannedFile>> {
    let ctx = TransformContext {
        entry,
        encoding,
        include_binary,
    };
    let Some(decoded) = read_text(&ctx)? else {
        return Ok(None);
    };

    let matched = map.matched_in(&decoded.text);
    let new_text = if matched.is_empty() {
        decoded.text.clone()
    } else {
        map.apply(&decoded.text)
    };
    Ok(Some(PlannedFile {
        matched,
        old_text: decoded.text,
        new_text,
    }))
}

/// Substitutes every mapping entry in map order and rewrites the file.
pub fn apply_file(
    entry: &FileEntry,
    encoding: &EncodingStrategy,
    map: &ReplacementMap,
    options: ApplyOptions,
) -> Result<ApplyOutcome> {
    let ctx = TransformContext {
        entry,
        encoding,
        include_binary: options.include_binary,
    };
    let Some(decoded) = read_text(&ctx)? else {
        return Ok(ApplyOutcome::Skipped);
    };

    let (new_text, replacements) = map.apply_counted(&decoded.text);
    if replacements == 0 || new_text == decoded.text {
        println!("no changes for {}", entry.path.display());
        return Ok(ApplyOutcome::Unchanged);
    }

    let result = TransformResult { decoded, new_text };
    let backup = write_result(&entry.path, &result, options.backup)?;
    Ok(ApplyOutcome::Applied {
        replacements,
        backup,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::FileMetadata;
    use crate::mapping::build_replacement_map;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn owned(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    fn entry_for(path: &Path) -> FileEntry {
        FileEntry {
            path: path.to_path_buf(),
            metadata: FileMetadata { is_dir: false },
        }
    }

    #[test]
    fn plan_reports_matches_without_touching_file() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("a.txt");
        fs::write(&path, "abc").expect("write");
        let map = build_replacement_map(&owned(&["a"]), &owned(&["x"])).expect("map");

        let planned = plan_file(&entry_for(&path), &EncodingStrategy::default(), &map, false)
            .expect("plan")
            .expect("text file");
        let pairs: Vec<_> = planned.matched.iter().collect();
        assert_eq!(pairs, vec![("a", "x")]);
        assert_eq!(planned.new_text, "xbc");
        assert_eq!(fs::read_to_string(&path).expect("read"), "abc");
    }

    #[test]
    fn apply_rewrites_all_case_styles() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("lib.rs");
        fs::write(
            &path,
            "struct FooBar;\nfn foo_bar() {}\nconst FOO_BAR: u8 = 1;\n// foo-bar.txt\n",
        )
        .expect("write");
        let map = build_replacement_map(&owned(&["foo", "bar"]), &owned(&["baz", "qux"]))
            .expect("map");

        let outcome = apply_file(
            &entry_for(&path),
            &EncodingStrategy::default(),
            &map,
            ApplyOptions::default(),
        )
        .expect("apply");
        assert!(matches!(outcome, ApplyOutcome::Applied { replacements: 4, backup: None }));
        assert_eq!(
            fs::read_to_string(&path).expect("read"),
            "struct BazQux;\nfn baz_qux() {}\nconst BAZ_QUX: u8 = 1;\n// baz-qux.txt\n"
        );
    }

    #[test]
    fn apply_without_matches_leaves_file_alone() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("a.txt");
        fs::write(&path, "nothing here").expect("write");
        let map = build_replacement_map(&owned(&["zzz"]), &owned(&["y"])).expect("map");
        let outcome = apply_file(
            &entry_for(&path),
            &EncodingStrategy::default(),
            &map,
            ApplyOptions::default(),
        )
        .expect("apply");
        assert!(matches!(outcome, ApplyOutcome::Unchanged));
    }

    #[test]
    fn apply_reports_missing_file() {
        let temp = tempdir().expect("temp dir");
        let map = build_replacement_map(&owned(&["a"]), &owned(&["b"])).expect("map");
        let result = apply_file(
            &entry_for(&temp.path().join("missing.txt")),
            &EncodingStrategy::default(),
            &map,
            ApplyOptions::default(),
        );
        let err = result.err().expect("missing file fails");
        assert!(format!("{err:#}").contains("failed to read"));
    }

    #[test]
    fn apply_skips_binary_files() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("blob.bin");
        fs::write(&path, b"a\0a").expect("write");
        let map = build_replacement_map(&owned(&["a"]), &owned(&["b"])).expect("map");
        let outcome = apply_file(
            &entry_for(&path),
            &EncodingStrategy::default(),
            &map,
            ApplyOptions::default(),
        )
        .expect("apply");
        assert!(matches!(outcome, ApplyOutcome::Skipped));
        assert_eq!(fs::read(&path).expect("read"), b"a\0a");
    }

    #[test]
    fn apply_rewrites_utf16_text_in_place() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("wide.txt");
        fs::write(&path, [0xFF, 0xFE, b'f', 0, b'o', 0, b'o', 0]).expect("write");
        let map = build_replacement_map(&owned(&["foo"]), &owned(&["bar"])).expect("map");

        let outcome = apply_file(
            &entry_for(&path),
            &EncodingStrategy::default(),
            &map,
            ApplyOptions::default(),
        )
        .expect("apply");
        assert!(matches!(outcome, ApplyOutcome::Applied { replacements: 1, .. }));
        assert_eq!(
            fs::read(&path).expect("read"),
            vec![0xFF, 0xFE, b'b', 0, b'a', 0, b'r', 0]
        );
    }

    #[test]
    fn encoding_override_keeps_existing_bom() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("bom.txt");
        fs::write(&path, [0xEF, 0xBB, 0xBF, b'f', b'o', b'o']).expect("write");
        let map = build_replacement_map(&owned(&["foo"]), &owned(&["bar"])).expect("map");
        let encoding = EncodingStrategy::new(Some("utf-16le")).expect("known label");

        apply_file(&entry_for(&path), &encoding, &map, ApplyOptions::default()).expect("apply");
        assert_eq!(
            fs::read(&path).expect("read"),
            vec![0xEF, 0xBB, 0xBF, b'b', b'a', b'r']
        );
    }

    #[test]
    fn replacement_count_follows_substitution_order() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("a.txt");
        fs::write(&path, "abb").expect("write");
        let map: ReplacementMap = [
            ("ab".to_string(), "x".to_string()),
            ("b".to_string(), "y".to_string()),
        ]
        .into_iter()
        .collect();

        let outcome = apply_file(
            &entry_for(&path),
            &EncodingStrategy::default(),
            &map,
            ApplyOptions::default(),
        )
        .expect("apply");
        assert!(matches!(outcome, ApplyOutcome::Applied { replacements: 2, .. }));
        assert_eq!(fs::read_to_string(&path).expect("read"), "xy");
    }
}
