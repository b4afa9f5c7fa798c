//! Batch driver.
//!
//! Files are processed in fixed-size chunks: every file in a chunk is read,
//! rewritten, and written concurrently, and the next chunk starts only once
//! the whole chunk has finished. Chunk size bounds the number of open files.
//! Each file's outcome is independent of every other file's, so the summary
//! does not depend on the chunk size.

use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{MigrateError, Result};
use crate::rules::RuleSet;
use crate::transform;
use crate::types::{FileKind, FileRecord, RunSummary};
use crate::verify;
use crate::walk::{self, WalkOptions};

pub const DEFAULT_CHUNK_SIZE: usize = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Everything a run needs; nothing is read from ambient process state.
#[derive(Debug, Clone)]
pub struct MigrateOptions {
    pub root: PathBuf,
    pub walk: WalkOptions,
    pub rule_set: Arc<RuleSet>,
    pub chunk_size: usize,
    /// Per-file limit on read + rewrite. `None` disables it.
    pub timeout: Option<Duration>,
    pub dry_run: bool,
    pub verify: bool,
}

impl MigrateOptions {
    pub fn new(root: impl Into<PathBuf>, rule_set: RuleSet) -> Self {
        Self {
            root: root.into(),
            walk: WalkOptions::default(),
            rule_set: Arc::new(rule_set),
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            dry_run: false,
            verify: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Progress {
    /// 1-indexed.
    pub chunk: usize,
    pub chunks: usize,
    pub processed: usize,
    pub total: usize,
    pub modified: usize,
}

/// Enumerate the root and migrate every file found.
pub async fn run<F>(opts: &MigrateOptions, on_progress: F) -> Result<RunSummary>
where
    F: FnMut(&Progress),
{
    let root = opts.root.clone();
    let walk_opts = opts.walk.clone();
    let walked = tokio::task::spawn_blocking(move || walk::enumerate(&root, &walk_opts)).await?;

    let mut summary = run_files(opts, &walked.files, on_progress).await?;
    summary.skipped_dirs = walked.skipped;
    Ok(summary)
}

/// Migrate an explicit file list.
pub async fn run_files<F>(opts: &MigrateOptions, files: &[PathBuf], mut on_progress: F) -> Result<RunSummary>
where
    F: FnMut(&Progress),
{
    if opts.chunk_size == 0 {
        return Err(MigrateError::InvalidConfig(
            "chunk_size must be at least 1".to_string(),
        ));
    }

    let started_at = Utc::now();
    let clock = Instant::now();
    let chunks = files.len().div_ceil(opts.chunk_size);
    let mut records: Vec<FileRecord> = Vec::with_capacity(files.len());
    let mut modified = 0;

    for (i, chunk) in files.chunks(opts.chunk_size).enumerate() {
        let tasks = chunk.iter().map(|path| {
            process_file(
                Arc::clone(&opts.rule_set),
                path.clone(),
                opts.dry_run,
                opts.timeout,
            )
        });
        let results = futures::future::join_all(tasks).await;

        modified += results.iter().filter(|r| r.modified).count();
        records.extend(results);

        let progress = Progress {
            chunk: i + 1,
            chunks,
            processed: records.len(),
            total: files.len(),
            modified,
        };
        tracing::info!(
            chunk = progress.chunk,
            chunks,
            processed = progress.processed,
            modified,
            "chunk complete"
        );
        on_progress(&progress);
    }

    // Verifying a dry run would only list what the run would have fixed.
    let residuals = if opts.verify && !opts.dry_run {
        let set = Arc::clone(&opts.rule_set);
        let scan_files = files.to_vec();
        Some(tokio::task::spawn_blocking(move || verify::scan(&set, &scan_files)).await?)
    } else {
        None
    };

    let summary = RunSummary {
        rule_set: opts.rule_set.name.clone(),
        started_at,
        duration_ms: clock.elapsed().as_millis() as u64,
        dry_run: opts.dry_run,
        total_scanned: files.len(),
        total_modified: modified,
        modified: records
            .iter()
            .filter(|r| r.modified)
            .map(|r| r.path.clone())
            .collect(),
        errors: records.into_iter().filter(|r| r.error.is_some()).collect(),
        skipped_dirs: Vec::new(),
        residuals,
    };
    Ok(summary)
}

/// Run the per-file transformer on the blocking pool. With a timeout, the
/// read + rewrite half runs under it and a file that times out is never
/// written.
async fn process_file(
    set: Arc<RuleSet>,
    path: PathBuf,
    dry_run: bool,
    timeout: Option<Duration>,
) -> FileRecord {
    let kind = FileKind::of(&path);
    tracing::debug!(path = %path.display(), %kind, "processing");

    let Some(limit) = timeout else {
        let job_path = path.clone();
        return match tokio::task::spawn_blocking(move || {
            transform::transform_file(&set, &job_path, dry_run)
        })
        .await
        {
            Ok(record) => record,
            Err(e) => fail(path, kind, MigrateError::from(e)),
        };
    };

    let job = {
        let path = path.clone();
        tokio::task::spawn_blocking(move || transform::prepare(&set, &path))
    };
    let pending = match tokio::time::timeout(limit, job).await {
        Err(_) => return fail(path, kind, MigrateError::Timeout(limit.as_secs())),
        Ok(Err(e)) => return fail(path, kind, MigrateError::from(e)),
        Ok(Ok(Err(e))) => return fail(path, kind, e),
        Ok(Ok(Ok(pending))) => pending,
    };

    match tokio::task::spawn_blocking(move || pending.commit(dry_run)).await {
        Ok(record) => record,
        Err(e) => fail(path, kind, MigrateError::from(e)),
    }
}

fn fail(path: PathBuf, kind: FileKind, error: MigrateError) -> FileRecord {
    tracing::warn!(path = %path.display(), error = %error, "file left unmodified");
    FileRecord::failed(path, kind, error)
}

/// List the files a run would touch, relative to `root`.
pub fn plan(root: &Path, walk: &WalkOptions) -> Vec<PathBuf> {
    walk::enumerate(root, walk)
        .files
        .into_iter()
        .map(|p| p.strip_prefix(root).map(Path::to_path_buf).unwrap_or(p))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
