//! Splitting several sources as one joined unit of work.
//!
//! [`split_all`] runs every [`SplitJob`], waits for all of them, and only then
//! decides the outcome: either every report, or a [`BatchError`] naming each
//! failed source alongside the reports of the jobs that did finish. With the
//! `parallel-io` feature the jobs run on a dedicated `rayon` pool; each job is
//! still a single-threaded split.

use crate::config::SplitConfig;
use crate::error::SplitError;
use crate::splitter::{SplitReport, output_at, resolve_output_dir, source_locations, split};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One source and the configuration to split it with.
#[derive(Debug, Clone)]
pub struct SplitJob {
    pub source: PathBuf,
    pub config: SplitConfig,
}

impl SplitJob {
    pub fn new(source: impl Into<PathBuf>, config: SplitConfig) -> Self {
        Self {
            source: source.into(),
            config,
        }
    }

    /// Job for `source` whose shard names are prefixed with the source's stem.
    ///
    /// `orders.tbl.gz` split with base template `part_%03d.csv` produces
    /// `orders_001.csv`, `orders_002.csv`, ...
    ///
    /// # Errors
    /// [`SplitError::InvalidArgument`] if the source has no usable file name.
    pub fn for_source(source: impl Into<PathBuf>, base: &SplitConfig) -> Result<Self, SplitError> {
        let source = source.into();
        let stem = source_stem(&source).ok_or_else(|| {
            SplitError::invalid(format!("source {} has no file name", source.display()))
        })?;
        let mut config = base.clone();
        config.template = base.template.with_prefix(&format!("{stem}_"))?;
        Ok(Self { source, config })
    }
}

/// File name up to the first dot, so `lineitem.csv.gz` becomes `lineitem`.
fn source_stem(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    let stem = name.split('.').next().unwrap_or_default();
    (!stem.is_empty()).then(|| stem.to_string())
}

/// A job that did not complete.
#[derive(Debug)]
pub struct JobFailure {
    pub source: PathBuf,
    pub error: SplitError,
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source.display(), self.error)
    }
}

/// Outcome of a batch that did not fully succeed.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Rejected before any job started.
    #[error(transparent)]
    Setup(#[from] SplitError),

    /// At least one job failed; every job was still run to completion.
    #[error("{} of {total} split jobs failed: {}", .failures.len(), summarize(.failures))]
    Failed {
        total: usize,
        failures: Vec<JobFailure>,
        completed: Vec<SplitReport>,
    },
}

fn summarize(failures: &[JobFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Run every job, join them all, and aggregate the results in job order.
///
/// `parallelism` bounds the worker pool (default: CPU count). It is ignored
/// without the `parallel-io` feature, where jobs run one after another.
///
/// # Errors
/// * [`BatchError::Setup`] if two jobs could write the same file, a job
///   would overwrite a source, a job fails validation, or the pool cannot be
///   built. Nothing has run yet.
/// * [`BatchError::Failed`] if any job failed.
pub fn split_all(jobs: &[SplitJob], parallelism: Option<usize>) -> Result<Vec<SplitReport>, BatchError> {
    check_jobs(jobs)?;
    tracing::info!(target: "csvshard", jobs = jobs.len(), "starting batch");

    let results = run_jobs(jobs, parallelism)?;

    let mut completed = Vec::with_capacity(jobs.len());
    let mut failures = Vec::new();
    for (job, result) in jobs.iter().zip(results) {
        match result {
            Ok(report) => completed.push(report),
            Err(error) => {
                tracing::error!(
                    target: "csvshard",
                    source = %job.source.display(),
                    kind = error.kind(),
                    "split failed: {error}"
                );
                failures.push(JobFailure {
                    source: job.source.clone(),
                    error,
                });
            }
        }
    }

    if failures.is_empty() {
        Ok(completed)
    } else {
        Err(BatchError::Failed {
            total: jobs.len(),
            failures,
            completed,
        })
    }
}

/// Validate each job and reject any pair whose outputs could touch the same
/// file: overlapping shard families or manifests in one directory, or an
/// output landing on another job's source.
fn check_jobs(jobs: &[SplitJob]) -> Result<(), SplitError> {
    let mut dirs = Vec::with_capacity(jobs.len());
    for job in jobs {
        job.config.validate()?;
        let dir = match resolve_output_dir(&job.config)? {
            Some(dir) => dir,
            None => std::path::absolute(&job.config.output_path)
                .map_err(|e| SplitError::io("resolve", &job.config.output_path, e))?,
        };
        dirs.push(dir);
    }
    // A missing source is reported by its own job.
    let sources: Vec<Vec<PathBuf>> = jobs
        .iter()
        .map(|job| source_locations(&job.source).unwrap_or_default())
        .collect();

    for (i, a) in jobs.iter().enumerate() {
        for (j, b) in jobs.iter().enumerate() {
            if let Some(output) = sources[j]
                .iter()
                .find_map(|location| output_at(location, &dirs[i], &a.config))
            {
                return Err(SplitError::invalid(format!(
                    "{output} of {} would overwrite the source {}",
                    a.source.display(),
                    b.source.display()
                )));
            }
            if j <= i || dirs[i] != dirs[j] {
                continue;
            }
            if a.config.template.overlaps(&b.config.template) {
                return Err(SplitError::invalid(format!(
                    "{} and {} would both write shards in {}: templates {} and {} overlap",
                    a.source.display(),
                    b.source.display(),
                    dirs[i].display(),
                    a.config.template,
                    b.config.template
                )));
            }
            #[cfg(feature = "manifest")]
            check_manifests(a, b)?;
        }
    }
    Ok(())
}

/// Two jobs writing into one directory: neither manifest may collide with the
/// other job's manifest or shards.
#[cfg(feature = "manifest")]
fn check_manifests(a: &SplitJob, b: &SplitJob) -> Result<(), SplitError> {
    use crate::manifest::Manifest;

    let clash = |owner: &SplitJob, other: &SplitJob| {
        let name = Manifest::file_name(&owner.config);
        owner.config.write_manifest
            && ((other.config.write_manifest && Manifest::file_name(&other.config) == name)
                || other.config.template.index_of(&name).is_some())
    };
    if clash(a, b) || clash(b, a) {
        return Err(SplitError::invalid(format!(
            "{} and {} would write the same file in {}",
            a.source.display(),
            b.source.display(),
            a.config.output_path.display()
        )));
    }
    Ok(())
}

#[cfg(feature = "parallel-io")]
fn run_jobs(
    jobs: &[SplitJob],
    parallelism: Option<usize>,
) -> Result<Vec<Result<SplitReport, SplitError>>, SplitError> {
    use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

    let threads = parallelism.unwrap_or_else(num_cpus::get).clamp(1, jobs.len().max(1));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("csvshard-{i}"))
        .build()
        .map_err(|e| SplitError::invalid(format!("cannot build worker pool: {e}")))?;
    // `collect` into a Vec keeps job order and only returns once every job has.
    Ok(pool.install(|| {
        jobs.par_iter()
            .map(|job| split(&job.source, &job.config))
            .collect()
    }))
}

#[cfg(not(feature = "parallel-io"))]
fn run_jobs(
    jobs: &[SplitJob],
    _parallelism: Option<usize>,
) -> Result<Vec<Result<SplitReport, SplitError>>, SplitError> {
    Ok(jobs
        .iter()
        .map(|job| split(&job.source, &job.config))
        .collect())
}
