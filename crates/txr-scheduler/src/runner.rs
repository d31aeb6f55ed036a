use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, error, warn};
use txr_core::types::{Job, JobType};
use txr_plugins::{Executor, PluginError, PluginKind, PluginRegistry, ValidationError};
use txr_store::JobTypeStore;

use crate::error::SchedulerError;

/// What a single invocation produced when it did not fail outright.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The executor ran; `output` is its result, if any.
    Completed { output: Option<Value> },
    /// The job's options did not pass validation, so nothing ran.
    Rejected { reason: ValidationError },
}

pub type RunFuture = BoxFuture<'static, Result<RunOutcome, PluginError>>;

/// A job bound to its executor and declared options, ready to fire.
///
/// Calling [`Runner::invoke`] produces a fresh `'static` future each time, so
/// the same runner serves every tick of its sequence.
pub struct Runner {
    job_id: String,
    plugin: PluginKind,
    invoke: Box<dyn Fn() -> RunFuture + Send + Sync>,
}

impl Runner {
    pub fn new<F>(job_id: impl Into<String>, plugin: PluginKind, invoke: F) -> Self
    where
        F: Fn() -> RunFuture + Send + Sync + 'static,
    {
        Self {
            job_id: job_id.into(),
            plugin,
            invoke: Box::new(invoke),
        }
    }

    /// Validate-then-execute against `executor`.
    fn bind(job: Job, job_type: JobType, executor: Arc<dyn Executor>) -> Self {
        let job_id = job.id.clone();
        let plugin = executor.kind();
        let job = Arc::new(job);
        let declared = Arc::new(job_type.options);

        Self::new(job_id, plugin, move || -> RunFuture {
            let job = Arc::clone(&job);
            let declared = Arc::clone(&declared);
            let executor = Arc::clone(&executor);
            Box::pin(async move {
                if let Err(reason) = executor.validate(&declared, &job.options) {
                    return Ok(RunOutcome::Rejected { reason });
                }
                executor
                    .execute(&declared, &job, None)
                    .await
                    .map(|output| RunOutcome::Completed { output })
            })
        })
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn plugin(&self) -> PluginKind {
        self.plugin
    }

    pub fn invoke(&self) -> RunFuture {
        (self.invoke)()
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("job_id", &self.job_id)
            .field("plugin", &self.plugin)
            .finish_non_exhaustive()
    }
}

/// Counts for one firing of a sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub completed: usize,
    pub rejected: usize,
    pub failed: usize,
}

impl TickReport {
    /// Invocations that did not complete, for any reason.
    pub fn failures(&self) -> usize {
        self.rejected + self.failed
    }
}

/// The ordered runners of one sequence.
#[derive(Debug)]
pub struct RunnerSet {
    sequence_id: String,
    runners: Vec<Runner>,
}

impl RunnerSet {
    pub fn new(sequence_id: impl Into<String>, runners: Vec<Runner>) -> Self {
        Self {
            sequence_id: sequence_id.into(),
            runners,
        }
    }

    pub fn sequence_id(&self) -> &str {
        &self.sequence_id
    }

    pub fn len(&self) -> usize {
        self.runners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    pub fn runners(&self) -> &[Runner] {
        &self.runners
    }

    /// Invoke every runner in order, one at a time.
    ///
    /// Each invocation runs on its own task so a panicking executor is
    /// reported like any other failure. Failures are logged and counted;
    /// the remaining runners still run.
    pub async fn run_tick(&self) -> TickReport {
        let mut report = TickReport::default();
        for runner in &self.runners {
            let job_id = runner.job_id();
            match tokio::spawn(runner.invoke()).await {
                Ok(Ok(RunOutcome::Completed { .. })) => {
                    report.completed += 1;
                    debug!(sequence_id = %self.sequence_id, job_id, plugin = %runner.plugin(), "job completed");
                }
                Ok(Ok(RunOutcome::Rejected { reason })) => {
                    report.rejected += 1;
                    warn!(sequence_id = %self.sequence_id, job_id, %reason, "job options rejected");
                }
                Ok(Err(e)) => {
                    report.failed += 1;
                    error!(sequence_id = %self.sequence_id, job_id, error = %e, "job execution failed");
                }
                Err(e) => {
                    report.failed += 1;
                    error!(sequence_id = %self.sequence_id, job_id, error = %e, "job task aborted");
                }
            }
        }
        report
    }
}

/// A job that could not be turned into a runner.
#[derive(Debug)]
pub struct BuildFailure {
    pub job_id: String,
    pub error: SchedulerError,
}

#[derive(Debug)]
pub struct BuildReport {
    pub runners: RunnerSet,
    pub failures: Vec<BuildFailure>,
}

/// Resolves each job of a sequence to its job type and executor.
///
/// A job whose type or plugin cannot be found is skipped and reported; the
/// rest of the sequence is still built. Building never runs any job.
pub struct RunnerBuilder<'a> {
    job_types: &'a dyn JobTypeStore,
    plugins: &'a PluginRegistry,
}

impl<'a> RunnerBuilder<'a> {
    pub fn new(job_types: &'a dyn JobTypeStore, plugins: &'a PluginRegistry) -> Self {
        Self { job_types, plugins }
    }

    pub fn build(&self, sequence_id: &str, jobs: Vec<Job>) -> BuildReport {
        let mut runners = Vec::with_capacity(jobs.len());
        let mut failures = Vec::new();

        for job in jobs {
            match self.resolve(&job) {
                Ok((job_type, executor)) => runners.push(Runner::bind(job, job_type, executor)),
                Err(error) => {
                    warn!(sequence_id, job_id = %job.id, code = error.code(), %error, "job skipped");
                    failures.push(BuildFailure { job_id: job.id, error });
                }
            }
        }

        BuildReport {
            runners: RunnerSet::new(sequence_id, runners),
            failures,
        }
    }

    fn resolve(&self, job: &Job) -> Result<(JobType, Arc<dyn Executor>), SchedulerError> {
        let job_type = self
            .job_types
            .get(&job.job_type)?
            .ok_or_else(|| SchedulerError::JobTypeNotFound {
                id: job.job_type.clone(),
            })?;
        let executor = self.plugins.resolve(&job_type.name).map_err(|_| {
            SchedulerError::PluginNotFound {
                name: job_type.name.clone(),
            }
        })?;
        Ok((job_type, executor))
    }
}
