//! DupeHunter - Duplicate File Finder
//!
//! Finds byte-identical files in a directory tree. Candidates are grouped by
//! size first, and only files whose size collides are hashed (MD5, SHA-1 or
//! SHA-256) on a bounded worker pool. Confirmed duplicates can be reported as
//! text, JSON or CSV, deleted with an optional backup, or moved aside.
//!
//! The engine lives in [`scanner`] and [`duplicates`]; everything else is a
//! consumer of its [`ScanResult`](duplicates::ScanResult).

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod session;
pub mod signal;

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bytesize::ByteSize;

use crate::actions::{apply, plan_all, Action, BatchResult};
use crate::cli::{Cli, Commands, ConfigArgs, ScanArgs};
use crate::config::Config;
use crate::duplicates::{DuplicateFinder, ScanResult, ScanStatus};
use crate::error::ExitCode;
use crate::progress::ProgressReporter;

/// Run the application for parsed command-line arguments.
///
/// # Errors
///
/// Returns an error for invalid configuration or when the report cannot be
/// written. Scan problems are reported through the returned [`ExitCode`].
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    let machine_readable = match &cli.command {
        Commands::Scan(args) => args
            .output
            .is_some_and(output::OutputFormat::is_machine_readable),
        Commands::Config(_) => false,
    };
    logging::init_logging(cli.verbose, cli.quiet, machine_readable);

    match &cli.command {
        Commands::Scan(args) => run_scan(args, cli.config.as_deref(), cli.quiet),
        Commands::Config(args) => run_config(args, cli.config.as_deref()),
    }
}

fn run_scan(args: &ScanArgs, config_path: Option<&Path>, quiet: bool) -> Result<ExitCode> {
    let config = args.apply(Config::load(config_path)?);
    let scan_config = config
        .to_scan_config()
        .context("Invalid scan configuration")?;
    log::debug!("Effective configuration: {:?}", scan_config);

    let finder = Arc::new(DuplicateFinder::new(scan_config)?);

    // Keep stdout clean when a machine-readable report goes there.
    let report_on_stdout = args.output_file.is_none();
    let machine_stdout = config.output.is_machine_readable() && report_on_stdout;
    finder.set_progress_observer(Arc::new(ProgressReporter::new(quiet || machine_stdout)));

    let shutdown = match signal::install_handler() {
        Ok(handler) => Some(handler),
        Err(e) => {
            log::warn!("{}; Ctrl+C will not cancel the scan cleanly", e);
            None
        }
    };
    if let Some(handler) = &shutdown {
        handler.attach(Arc::clone(&finder));
    }
    let scanned = finder.scan(&args.path);
    if let Some(handler) = &shutdown {
        handler.detach();
    }
    let result = scanned?;

    output::emit_report(&result, config.output, args.output_file.as_deref())?;

    let mut code = ExitCode::for_result(&result);

    if args.wants_action() {
        if result.status == ScanStatus::Completed {
            let batch = run_actions(args, &config, &result, quiet, machine_stdout)?;
            if let Some(batch) = batch {
                if !batch.all_succeeded() && code == ExitCode::Success {
                    code = ExitCode::PartialSuccess;
                }
            }
        } else {
            log::warn!("Scan {}; no files were deleted or moved", result.status);
        }
    }

    Ok(code)
}

/// Plan and carry out the requested remediation.
///
/// Returns `None` when there was nothing to do or the user declined.
fn run_actions(
    args: &ScanArgs,
    config: &Config,
    result: &ScanResult,
    quiet: bool,
    machine_stdout: bool,
) -> Result<Option<BatchResult>> {
    let plans = plan_all(result.duplicate_groups.values(), config.keep);
    if plans.is_empty() {
        return Ok(None);
    }

    let action = match &args.move_to {
        Some(dest_dir) => Action::Move {
            dest_dir: dest_dir.clone(),
        },
        None => Action::Delete {
            backup_dir: config.backup_dir.clone(),
        },
    };
    let count: usize = plans.iter().map(|p| p.remove.len()).sum();
    let bytes: u64 = plans.iter().map(actions::ActionPlan::reclaimable_bytes).sum();

    let mut out: Box<dyn Write> = if machine_stdout {
        Box::new(io::stderr())
    } else {
        Box::new(io::stdout())
    };

    if args.dry_run {
        writeln!(out)?;
        for plan in &plans {
            writeln!(out, "Keep:         {}", plan.keep.path.display())?;
            for snapshot in &plan.remove {
                match &action {
                    Action::Delete { .. } => {
                        writeln!(out, "Would delete: {}", snapshot.path.display())?;
                    }
                    Action::Move { dest_dir } => writeln!(
                        out,
                        "Would move:   {} -> {}",
                        snapshot.path.display(),
                        dest_dir.display()
                    )?,
                }
            }
        }
    } else if !args.yes && !quiet {
        let verb = match &action {
            Action::Delete { .. } => "Delete",
            Action::Move { .. } => "Move",
        };
        let prompt = format!("{verb} {count} duplicate file(s) ({})?", ByteSize::b(bytes));
        if !confirm(&prompt)? {
            writeln!(out, "Aborted; no files were changed.")?;
            return Ok(None);
        }
    }

    let batch = apply(&plans, &action, args.dry_run);
    writeln!(out, "{}", batch.summary())?;
    for (path, reason) in &batch.failures {
        writeln!(out, "  failed: {}: {}", path.display(), reason)?;
    }
    Ok(Some(batch))
}

fn confirm(prompt: &str) -> Result<bool> {
    let mut stderr = io::stderr();
    write!(stderr, "{prompt} [y/N] ")?;
    stderr.flush()?;

    let mut answer = String::new();
    io::stdin()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn run_config(args: &ConfigArgs, config_path: Option<&Path>) -> Result<ExitCode> {
    if args.init {
        let path = match config_path {
            Some(p) => p.to_path_buf(),
            None => match Config::default_path() {
                Some(p) => p,
                None => bail!("Cannot determine the configuration directory; pass --config"),
            },
        };
        Config::write_default(&path, args.force)?;
        println!("Wrote {}", path.display());
        return Ok(ExitCode::Success);
    }

    let config = Config::load(config_path)?;
    print!("{}", config.to_toml()?);
    Ok(ExitCode::Success)
}
