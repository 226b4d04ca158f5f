//! Job orchestration module.
//!
//! This module provides the job lifecycle functions:
//! - Creating a job for a source directory
//! - Planning a job (building the size map of the source tree)
//! - Running a job (fitting one volume, or spanning all of them)

use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::error::EngineError;
use crate::fit::FitAlgorithm;
use crate::fs_ops;
use crate::model::{ItemTable, JobMode, JobState, SpanJob};
use crate::progress::SpanProgress;
use crate::span::{generate_span, SpanItem};

fn require_state(
    job: &SpanJob,
    operation: &'static str,
    expected: JobState,
) -> Result<(), EngineError> {
    if job.state != expected {
        return Err(EngineError::InvalidState {
            operation,
            expected,
            actual: job.state,
        });
    }
    Ok(())
}

/// Create a new job.
///
/// Validates that the source path exists and is a directory. `capacity` is
/// the usable capacity of one volume, after any cushion.
///
/// # Returns
/// A new SpanJob in Pending state with no items
///
/// # Errors
/// Returns EngineError if source doesn't exist or is invalid
pub fn create_job<P: AsRef<Path>>(
    source: P,
    mode: JobMode,
    capacity: u64,
    algorithm: FitAlgorithm,
) -> Result<SpanJob, EngineError> {
    let source = source.as_ref();

    match std::fs::metadata(source) {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(EngineError::InvalidPath {
                    path: source.to_path_buf(),
                    reason: "Source must be a directory".to_string(),
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(EngineError::SourceNotFound {
                path: source.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(EngineError::SourceAccessDenied {
                path: source.to_path_buf(),
                source: e,
            });
        }
    }

    let job = SpanJob {
        id: Uuid::new_v4(),
        mode,
        source_path: source.to_path_buf(),
        capacity,
        algorithm,
        items: ItemTable::new(),
        volumes: Vec::new(),
        deferred: Vec::new(),
        state: JobState::Pending,
        created_at: Utc::now(),
        started_at: None,
        finished_at: None,
    };
    tracing::debug!(job = %job.id, mode = %mode, capacity, algorithm = %algorithm, "job created");
    Ok(job)
}

/// Plan a job by building the size map of the source tree.
///
/// Can be repeated while the job is Pending; each call replaces the items.
///
/// # Errors
/// Returns EngineError if the job is not Pending or enumeration fails
pub fn plan_job(job: &mut SpanJob) -> Result<(), EngineError> {
    require_state(job, "plan", JobState::Pending)?;

    job.items = fs_ops::collect_size_map(&job.source_path)?;
    tracing::info!(
        job = %job.id,
        items = job.items.len(),
        bytes = job.items.total_size(),
        "job planned"
    );
    Ok(())
}

/// Run a job.
///
/// Transitions job state from Pending to Running to Completed.
/// - `Fit` mode fills one volume; everything else is recorded in `deferred`.
/// - `Span` mode places every item on some volume.
///
/// # Errors
/// Returns `InvalidState` unless the job is Pending, and the spanning errors
/// of [`generate_span`] in `Span` mode. A failed run leaves the job Pending.
pub fn run_job(
    job: &mut SpanJob,
    progress_callback: Option<&dyn SpanProgress<PathBuf>>,
) -> Result<(), EngineError> {
    require_state(job, "run", JobState::Pending)?;

    job.state = JobState::Running;
    job.started_at = Some(Utc::now());

    let outcome = match job.mode {
        JobMode::Fit => Ok(fit_single_volume(job, progress_callback)),
        JobMode::Span => generate_span(&job.items, job.capacity, job.algorithm, progress_callback)
            .map(|volumes| (volumes, Vec::new())),
    };

    let (volumes, deferred) = match outcome {
        Ok(result) => result,
        Err(e) => {
            job.state = JobState::Pending;
            job.started_at = None;
            return Err(e);
        }
    };

    job.volumes = volumes;
    job.deferred = deferred;
    job.state = JobState::Completed;
    job.finished_at = Some(Utc::now());

    if !job.deferred.is_empty() {
        tracing::warn!(
            job = %job.id,
            deferred = job.deferred.len(),
            "items did not fit and were deferred"
        );
    }
    tracing::info!(job = %job.id, volumes = job.volumes.len(), "job completed");
    Ok(())
}

fn fit_single_volume(
    job: &SpanJob,
    progress_callback: Option<&dyn SpanProgress<PathBuf>>,
) -> (Vec<SpanItem<PathBuf>>, Vec<PathBuf>) {
    if let Some(callback) = progress_callback {
        callback.on_span_started(&job.items, job.capacity);
    }

    let fit = job.algorithm.fit(&job.items, job.capacity);
    let deferred = job
        .items
        .without(&fit.items)
        .iter()
        .map(|item| item.id.clone())
        .collect();

    let volume = SpanItem {
        utilization: fit.utilization(job.capacity),
        size: fit.used,
        capacity: job.capacity,
        items: fit.items,
    };

    let volumes = vec![volume];
    if let Some(callback) = progress_callback {
        callback.on_volume_planned(0, &volumes[0]);
        callback.on_span_completed(&volumes);
    }
    (volumes, deferred)
}
