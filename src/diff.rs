use std::fmt::Write;

use similar::{ChangeTag, TextDiff};

/// Line diff of `old` against `new` with `context` unchanged lines around each hunk.
pub fn render_diff(old: &str, new: &str, context: usize) -> String {
    let diff = TextDiff::configure()
        .algorithm(similar::Algorithm::Myers)
        .diff_lines(old, new);

    let mut out = String::new();
    for (idx, group) in diff.grouped_ops(context).iter().enumerate() {
        if idx > 0 {
            out.push_str("...\n");
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let marker = match change.tag() {
                    ChangeTag::Delete => "- ",
                    ChangeTag::Insert => "+ ",
                    ChangeTag::Equal => "  ",
                };
                let _ = write!(out, "{marker}{change}");
                if change.missing_newline() {
                    out.push('\n');
                }
            }
        }
    }
    out
}

pub fn print_diff(old: &str, new: &str, context: usize) {
    print!("{}", render_diff(old, new, context));
}
