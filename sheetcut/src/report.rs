//! Colored run summaries

use colored::*;
use sheetcut_core::{CleanupFailure, CutoverOutput, InstanceOutput, RunReport, WorkerOutcome};
use sheetcut_core::instantiate::NameColumn;
use std::path::Path;

/// Print one line per ledger, then totals
pub fn print_cutover(run: &RunReport<CutoverOutput>) {
    println!();
    for outcome in &run.outcomes {
        match &outcome.result {
            Ok(output) => {
                print_ok(outcome);
                println!(
                    "    archived {} rows to {}",
                    output.archive.kept,
                    output.archive_path.display()
                );
                let mut line = format!(
                    "    kept {} rows in {}, formulas through row {}",
                    output.current.kept,
                    output.current_path.display(),
                    output.fill.last_row
                );
                if let Some(row) = output.current.truncated_at {
                    line.push_str(&format!(" (scan stopped at row {})", row));
                }
                println!("{}", line);
                if output.fill.failed > 0 {
                    println!(
                        "    {}",
                        format!("{} formulas could not be relocated", output.fill.failed).yellow()
                    );
                }
            }
            Err(_) => print_failure(outcome),
        }
    }
    print_summary(run);
}

pub fn print_instances(run: &RunReport<InstanceOutput>) {
    println!();
    for outcome in &run.outcomes {
        match &outcome.result {
            Ok(output) => {
                print_ok(outcome);
                println!("    {}", output.path.display());
                if output.name_column == NameColumn::NotFound {
                    println!("    {}", "no name column in template header".yellow());
                }
            }
            Err(_) => print_failure(outcome),
        }
    }
    print_summary(run);
}

pub fn print_cleanup(dir: &Path, failures: &[CleanupFailure]) {
    if failures.is_empty() {
        println!("{}", format!("✓ Emptied {}", dir.display()).green().bold());
        return;
    }
    for failure in failures {
        println!(
            "{} {}. Reason: {}",
            "Failed to delete".red(),
            failure.path.display(),
            failure.reason
        );
    }
}

fn print_ok<R>(outcome: &WorkerOutcome<R>) {
    println!(
        "{} {} {}",
        "✓".green().bold(),
        outcome.label.bold(),
        format!("({:.2}s)", outcome.elapsed.as_secs_f64()).dimmed()
    );
}

fn print_failure<R>(outcome: &WorkerOutcome<R>) {
    if let Err(err) = &outcome.result {
        println!("{} {}", "✗".red().bold(), outcome.label.bold());
        println!("    {}", format!("{:#}", err).red());
    }
}

fn print_summary<R>(run: &RunReport<R>) {
    println!();
    let summary = format!("{} succeeded, {} failed", run.succeeded(), run.failed());
    if run.failed() == 0 {
        println!("{}", summary.green().bold());
    } else {
        println!("{}", summary.red().bold());
    }
    println!("Finished in {:.2}s", run.elapsed.as_secs_f64());
}
