use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{ArgAction, Parser, ValueHint};

mod batch;
mod commands;
mod diff;
mod encoding;
mod files;
mod logging;
mod mapping;
mod rename;
mod tokens;
mod transform;
use commands::{ApplyOptions, ApplyOutcome, apply_file, plan_file};
use encoding::EncodingStrategy;
use files::FileEntry;
use logging::{ChangeLog, DEFAULT_LOG_DIR};
use mapping::{ReplacementMap, build_replacement_map, validate_inputs};
use rename::{RenameOutcome, RenamePlan, apply_rename};

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let steps = collect_steps(&cli)?;
    for step in &steps {
        validate_inputs(&step.find, &step.replace)?;
    }

    let ctx = RunContext {
        encoding: EncodingStrategy::new(cli.encoding.as_deref())?,
        change_log: (!cli.no_log).then(|| ChangeLog::new(&cli.log_dir)),
        show_diff: cli.diff,
        context: cli.context,
        apply: ApplyOptions {
            backup: cli.backup,
            include_binary: cli.include_binary,
        },
    };
    let piped = files::read_piped_paths()?;

    let mut stats = CommandStats::default();
    for step in &steps {
        run_step(step, &ctx, &piped, &mut stats)?;
    }
    stats.print("refactor");

    if stats.failed > 0 {
        bail!("{} path(s) could not be processed", stats.failed);
    }
    Ok(())
}

/// One find/replace pass with its effective flags.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    find: Vec<String>,
    replace: Vec<String>,
    input_files: Vec<PathBuf>,
    plan: bool,
    rename: bool,
}

struct RunContext {
    encoding: EncodingStrategy,
    change_log: Option<ChangeLog>,
    show_diff: bool,
    context: usize,
    apply: ApplyOptions,
}

/// Command line tokens run first, then any batch steps in file order.
fn collect_steps(cli: &Cli) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    if !cli.find.is_empty() || cli.batch.is_none() {
        steps.push(Step {
            find: cli.find.clone(),
            replace: cli.replace.clone(),
            input_files: cli.input_files.clone(),
            plan: cli.plan,
            rename: cli.rename,
        });
    }

    if let Some(path) = &cli.batch {
        let plan = batch::load_batch(path)?;
        if plan.steps.is_empty() {
            bail!("batch {} has no steps", path.display());
        }
        for step in plan.steps {
            let mut input_files = cli.input_files.clone();
            input_files.extend(step.input_files);
            steps.push(Step {
                find: step.find,
                replace: step.replace,
                input_files,
                plan: step.plan.unwrap_or(cli.plan),
                rename: step.rename.unwrap_or(cli.rename),
            });
        }
    }

    Ok(steps)
}

fn run_step(step: &Step, ctx: &RunContext, piped: &[String], stats: &mut CommandStats) -> Result<()> {
    let combinations = tokens::combination_count(step.find.len());
    if combinations > tokens::LARGE_COMBINATION_COUNT {
        println!(
            "warning: {} find tokens expand to {combinations} combinations; this may take a while",
            step.find.len()
        );
    }

    let map = build_replacement_map(&step.find, &step.replace)?;
    let entries = files::resolve_targets(&step.input_files, piped);

    if step.plan {
        for line in plan_entries(&entries, &map, ctx, stats) {
            println!("{line}");
        }
    } else {
        apply_entries(&entries, &map, ctx, stats);
    }

    if step.rename {
        rename_entries(&entries, &map, step.plan, ctx, stats);
    }
    Ok(())
}

/// `key -> value` for every mapping entry found in any target, in map order.
fn plan_entries(
    entries: &[FileEntry],
    map: &ReplacementMap,
    ctx: &RunContext,
    stats: &mut CommandStats,
) -> Vec<String> {
    let mut found = ReplacementMap::default();
    for entry in entries.iter().filter(|entry| entry.is_file()) {
        match plan_file(entry, &ctx.encoding, map, ctx.apply.include_binary) {
            Ok(Some(planned)) => {
                if planned.matched.is_empty() {
                    stats.no_op += 1;
                    continue;
                }
                stats.dry_run += 1;
                if ctx.show_diff {
                    println!("--- preview: {} ---", entry.path.display());
                    diff::print_diff(&planned.old_text, &planned.new_text, ctx.context);
                }
                for (key, value) in planned.matched.iter() {
                    found.insert(key.to_string(), value.to_string());
                }
            }
            Ok(None) => stats.skipped += 1,
            Err(err) => report_failure(&entry.path, &err, stats),
        }
    }

    map.iter()
        .filter(|(key, _)| found.get(key).is_some())
        .map(|(key, value)| format!("{key} -> {value}"))
        .collect()
}

fn apply_entries(entries: &[FileEntry], map: &ReplacementMap, ctx: &RunContext, stats: &mut CommandStats) {
    for entry in entries.iter().filter(|entry| entry.is_file()) {
        match apply_file(entry, &ctx.encoding, map, ctx.apply) {
            Ok(ApplyOutcome::Applied {
                replacements,
                backup,
            }) => {
                stats.applied += 1;
                if let Some(bak) = backup {
                    println!(
                        "backup saved: {} -> {}",
                        entry.path.display(),
                        bak.display()
                    );
                }
                println!("applied {} ({replacements} matches)", entry.path.display());
                log_change(
                    ctx,
                    "applied",
                    &entry.path,
                    &format!("{replacements} matches"),
                );
            }
            Ok(ApplyOutcome::Unchanged) => stats.no_op += 1,
            Ok(ApplyOutcome::Skipped) => stats.skipped += 1,
            Err(err) => report_failure(&entry.path, &err, stats),
        }
    }
}

fn rename_entries(
    entries: &[FileEntry],
    map: &ReplacementMap,
    plan_only: bool,
    ctx: &RunContext,
    stats: &mut CommandStats,
) {
    let plan = RenamePlan::build(entries.iter().map(|entry| entry.path.as_path()), map);
    for path in &plan.rejected {
        println!(
            "warning: not renaming {}: new name would be empty or contain a path separator",
            path.display()
        );
        stats.skipped += 1;
    }

    for entry in &plan.entries {
        if plan_only {
            println!("{} -> {}", entry.from.display(), entry.to.display());
            continue;
        }
        match apply_rename(entry) {
            Ok(RenameOutcome::Renamed) => {
                stats.renamed += 1;
                println!("renamed {} -> {}", entry.from.display(), entry.to.display());
                log_change(
                    ctx,
                    "renamed",
                    &entry.from,
                    &entry.to.display().to_string(),
                );
            }
            Ok(RenameOutcome::Skipped(reason)) => {
                stats.skipped += 1;
                println!("skipped rename of {}: {reason}", entry.from.display());
            }
            Err(err) => report_failure(&entry.from, &err, stats),
        }
    }
}

fn report_failure(path: &Path, err: &anyhow::Error, stats: &mut CommandStats) {
    stats.failed += 1;
    eprintln!("error: {}: {err:#}", path.display());
}

fn log_change(ctx: &RunContext, action: &str, path: &Path, detail: &str) {
    let Some(log) = &ctx.change_log else {
        return;
    };
    if let Err(err) = log.record(action, path, detail) {
        println!("warning: unable to update change log: {err:#}");
    }
}

#[derive(Default)]
struct CommandStats {
    applied: usize,
    renamed: usize,
    skipped: usize,
    dry_run: usize,
    no_op: usize,
    failed: usize,
}

impl CommandStats {
    fn print(&self, label: &str) {
        let total =
            self.applied + self.renamed + self.skipped + self.dry_run + self.no_op + self.failed;
        if total == 0 {
            return;
        }
        println!(
            "{label} summary: applied={}, renamed={}, skipped={}, dry-run={}, no-op={}, failed={}",
            self.applied, self.renamed, self.skipped, self.dry_run, self.no_op, self.failed
        );
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "refactor",
    version,
    about = "Intelligently find and replace tokens while keeping case constant"
)]
struct Cli {
    /// Path to file(s) to edit.
    #[arg(
        short = 'i',
        long = "input_file",
        visible_alias = "input-file",
        value_name = "PATH",
        num_args = 0..,
        value_hint = ValueHint::FilePath
    )]
    input_files: Vec<PathBuf>,
    /// Ordered list of tokens to find.
    #[arg(
        short = 'f',
        long,
        value_name = "TOKEN",
        num_args = 1..,
        required_unless_present = "batch"
    )]
    find: Vec<String>,
    /// Ordered list of replacement tokens; must not outnumber the find tokens.
    #[arg(
        short = 'r',
        long,
        value_name = "TOKEN",
        num_args = 0..,
        required_unless_present = "batch"
    )]
    replace: Vec<String>,
    /// Show planned replacements without modifying any file.
    #[arg(short = 'p', long, action = ArgAction::SetTrue)]
    plan: bool,
    /// Rename files and directories using the same replacements.
    #[arg(short = 'n', long, action = ArgAction::SetTrue)]
    rename: bool,
    /// YAML or JSON file listing additional find/replace steps.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    batch: Option<PathBuf>,
    /// Print a diff preview for every matching file in plan mode.
    #[arg(long, action = ArgAction::SetTrue)]
    diff: bool,
    #[arg(long, default_value_t = 3)]
    context: usize,
    #[arg(long, value_name = "ENCODING")]
    encoding: Option<String>,
    /// Keep a `.bak` copy of every rewritten file.
    #[arg(long, action = ArgAction::SetTrue)]
    backup: bool,
    #[arg(long = "include-binary", action = ArgAction::SetTrue)]
    include_binary: bool,
    #[arg(long = "log-dir", value_name = "DIR", default_value = DEFAULT_LOG_DIR, value_hint = ValueHint::DirPath)]
    log_dir: PathBuf,
    #[arg(long = "no-log", action = ArgAction::SetTrue)]
    no_log: bool,
}
