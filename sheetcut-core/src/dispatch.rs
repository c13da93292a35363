//! Parallel fan-out of per-file jobs
//!
//! Each job owns its input for its whole life and reports back a result plus
//! timing. Jobs run on a rayon pool; a panicking job becomes a failed outcome
//! and its siblings carry on.

use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;
use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Stem markers of files that are never processed
const EXCLUDED_STEM_MARKERS: &[&str] = &["Template", "~$"];

/// Whether `path` names a ledger to process: an `.xlsx` file that is neither a
/// template nor an editor lock file
pub fn is_eligible(path: &Path) -> bool {
    let is_xlsx = path.extension().is_some_and(|ext| ext == "xlsx");
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    is_xlsx && !EXCLUDED_STEM_MARKERS.iter().any(|m| stem.contains(m))
}

/// Eligible files directly inside `dir`, sorted by path
pub fn eligible_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && is_eligible(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Result of one job
#[derive(Debug)]
pub struct WorkerOutcome<R> {
    pub label: String,
    pub result: Result<R>,
    pub elapsed: Duration,
}

/// All outcomes of a run, in submission order
#[derive(Debug)]
pub struct RunReport<R> {
    pub outcomes: Vec<WorkerOutcome<R>>,
    pub elapsed: Duration,
}

impl<R> RunReport<R> {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Run `work` once per `(label, input)` job and wait for all of them.
///
/// `workers` caps the thread count; by default every job gets its own thread.
pub fn fan_out<T, R, F>(jobs: Vec<(String, T)>, workers: Option<usize>, work: F) -> RunReport<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> Result<R> + Sync,
{
    let start = Instant::now();
    let threads = workers.unwrap_or(jobs.len()).max(1);

    let outcomes = match rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("sheetcut-worker-{}", i))
        .build()
    {
        Ok(pool) => pool.install(|| {
            jobs.into_par_iter()
                .map(|(label, input)| run_job(label, input, &work))
                .collect()
        }),
        Err(err) => {
            tracing::warn!("Worker pool unavailable, running jobs sequentially: {}", err);
            jobs.into_iter()
                .map(|(label, input)| run_job(label, input, &work))
                .collect()
        }
    };

    RunReport {
        outcomes,
        elapsed: start.elapsed(),
    }
}

fn run_job<T, R, F>(label: String, input: T, work: &F) -> WorkerOutcome<R>
where
    F: Fn(T) -> Result<R>,
{
    let start = Instant::now();
    tracing::debug!(job = %label, "Job started");
    let result = panic::catch_unwind(AssertUnwindSafe(|| work(input)))
        .unwrap_or_else(|payload| Err(anyhow!("worker panicked: {}", panic_message(&*payload))));
    let elapsed = start.elapsed();

    match &result {
        Ok(_) => tracing::info!(job = %label, ?elapsed, "Job finished"),
        Err(err) => tracing::warn!(job = %label, ?elapsed, "Job failed: {:#}", err),
    }
    WorkerOutcome { label, result, elapsed }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// A directory entry that could not be removed
#[derive(Debug)]
pub struct CleanupFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Delete every file, link and subdirectory inside `dir`, keeping `dir`.
///
/// A failing entry is logged and skipped; the rest are still removed.
pub fn empty_dir(dir: &Path) -> Result<Vec<CleanupFailure>> {
    let mut failures = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))? {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(err) => {
                failures.push(CleanupFailure {
                    path: dir.to_path_buf(),
                    reason: err.to_string(),
                });
                continue;
            }
        };

        let removed = match fs::symlink_metadata(&path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&path),
            Ok(_) => fs::remove_file(&path),
            Err(err) => Err(err),
        };
        if let Err(err) = removed {
            tracing::warn!("Failed to delete {}. Reason: {}", path.display(), err);
            failures.push(CleanupFailure {
                path,
                reason: err.to_string(),
            });
        }
    }
    Ok(failures)
}
