use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use txr_core::types::SequenceStatus;
use txr_plugins::PluginRegistry;
use txr_store::{JobStore, JobTypeStore, SequenceStore};

use crate::error::{Result, SchedulerError};
use crate::runner::{BuildFailure, RunnerBuilder, RunnerSet};
use crate::schedule::CronSchedule;

/// Result of activating a sequence.
#[derive(Debug)]
pub struct ActivationSummary {
    pub sequence_id: String,
    /// Runners in the live timer.
    pub runners: usize,
    /// Jobs left out of the timer, with the reason.
    pub failures: Vec<BuildFailure>,
    /// A timer for this sequence was already running and has been replaced.
    pub replaced: bool,
    pub next_run: Option<DateTime<Utc>>,
    pub trace_id: Option<String>,
}

/// A live timer, as reported by [`SchedulerEngine::scheduled`].
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledSequence {
    pub sequence_id: String,
    pub frequency: String,
    pub runners: usize,
    pub next_run: Option<DateTime<Utc>>,
    pub activated_at: DateTime<Utc>,
    pub ticks: u64,
    pub failures: u64,
    /// Invocations whose options their plugin rejected; also counted in
    /// `failures`.
    pub rejected: u64,
}

#[derive(Default)]
struct TimerStats {
    ticks: AtomicU64,
    failures: AtomicU64,
    rejected: AtomicU64,
    next_run: Mutex<Option<DateTime<Utc>>>,
}

impl TimerStats {
    fn next_run(&self) -> Option<DateTime<Utc>> {
        *self.next_run.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_next_run(&self, next: Option<DateTime<Utc>>) {
        *self.next_run.lock().unwrap_or_else(|p| p.into_inner()) = next;
    }
}

struct TimerHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
    schedule: Arc<CronSchedule>,
    runners: usize,
    activated_at: DateTime<Utc>,
    stats: Arc<TimerStats>,
}

impl TimerHandle {
    /// Stop future firings. A tick already running is left to finish.
    fn cancel(&self) {
        self.cancel.send_replace(true);
    }
}

/// Owns one timer per ACTIVE sequence.
///
/// Runners are built once per activation and bound to the timer; editing a
/// sequence's jobs takes effect on the next activation.
pub struct SchedulerEngine {
    sequences: Arc<dyn SequenceStore>,
    jobs: Arc<dyn JobStore>,
    job_types: Arc<dyn JobTypeStore>,
    plugins: Arc<PluginRegistry>,
    timers: DashMap<String, TimerHandle>,
    /// Shared by every timer a sequence has had, so a replaced timer still
    /// finishing its last tick never overlaps the new one. An entry goes away
    /// once no timer holds it.
    tick_locks: Arc<TickLocks>,
}

type TickLocks = DashMap<String, Arc<tokio::sync::Mutex<()>>>;

/// Drop a sequence's tick lock if nothing but the map still holds it.
fn release_tick_lock(locks: &TickLocks, sequence_id: &str) {
    locks.remove_if(sequence_id, |_, lock| Arc::strong_count(lock) == 1);
}

impl SchedulerEngine {
    pub fn new(
        sequences: Arc<dyn SequenceStore>,
        jobs: Arc<dyn JobStore>,
        job_types: Arc<dyn JobTypeStore>,
        plugins: Arc<PluginRegistry>,
    ) -> Self {
        Self {
            sequences,
            jobs,
            job_types,
            plugins,
            timers: DashMap::new(),
            tick_locks: Arc::new(DashMap::new()),
        }
    }

    /// Build an engine over a single store that serves every entity.
    pub fn with_store<S>(store: Arc<S>, plugins: Arc<PluginRegistry>) -> Self
    where
        S: SequenceStore + JobStore + JobTypeStore + 'static,
    {
        Self::new(store.clone(), store.clone(), store, plugins)
    }

    /// Start (or restart) the recurring timer for a sequence.
    ///
    /// Jobs whose type or plugin cannot be resolved are left out and listed
    /// in the summary. A frequency that does not parse, or never fires,
    /// fails before anything changes. Must be called from within a Tokio
    /// runtime.
    #[instrument(skip(self))]
    pub fn activate(&self, sequence_id: &str, trace_id: Option<&str>) -> Result<ActivationSummary> {
        let sequence = self
            .sequences
            .get(sequence_id)?
            .ok_or_else(|| SchedulerError::SequenceNotFound {
                id: sequence_id.to_string(),
            })?;
        let schedule = CronSchedule::parse(&sequence.frequency)?;
        let next_run = schedule.first_after(Utc::now())?;

        let jobs = self.jobs.list_by_sequence(sequence_id)?;
        let report = RunnerBuilder::new(self.job_types.as_ref(), &self.plugins).build(sequence_id, jobs);
        let runners = report.runners.len();

        // The entry guard keeps a concurrent deactivate from landing between
        // the status write and the timer insert.
        let slot = self.timers.entry(sequence_id.to_string());
        self.sequences.set_status(sequence_id, SequenceStatus::Active)?;
        let handle = self.spawn_timer(sequence_id, schedule, next_run, report.runners);
        let replaced = match slot {
            Entry::Occupied(mut previous) => {
                previous.insert(handle).cancel();
                true
            }
            Entry::Vacant(vacant) => {
                vacant.insert(handle);
                false
            }
        };

        info!(
            sequence_id,
            frequency = %sequence.frequency,
            runners,
            skipped = report.failures.len(),
            replaced,
            %next_run,
            "sequence activated"
        );

        Ok(ActivationSummary {
            sequence_id: sequence_id.to_string(),
            runners,
            failures: report.failures,
            replaced,
            next_run: Some(next_run),
            trace_id: trace_id.map(String::from),
        })
    }

    /// Stop a sequence's timer and mark it INACTIVE.
    ///
    /// Returns whether a timer was running.
    #[instrument(skip(self))]
    pub fn deactivate(&self, sequence_id: &str) -> Result<bool> {
        if self.sequences.get(sequence_id)?.is_none() {
            return Err(SchedulerError::SequenceNotFound {
                id: sequence_id.to_string(),
            });
        }

        let slot = self.timers.entry(sequence_id.to_string());
        self.sequences.set_status(sequence_id, SequenceStatus::Inactive)?;
        let was_running = match slot {
            Entry::Occupied(timer) => {
                timer.remove().cancel();
                true
            }
            Entry::Vacant(_) => false,
        };
        release_tick_lock(&self.tick_locks, sequence_id);

        info!(sequence_id, was_running, "sequence deactivated");
        Ok(was_running)
    }

    /// Re-activate every sequence the store lists as ACTIVE.
    ///
    /// Timers live only in memory, so this runs at startup. A sequence that
    /// fails to activate is logged and skipped.
    pub fn restore(&self) -> Vec<ActivationSummary> {
        let active = match self.sequences.list_active() {
            Ok(active) => active,
            Err(e) => {
                error!(error = %e, "could not list active sequences");
                return Vec::new();
            }
        };

        let restored: Vec<ActivationSummary> = active
            .iter()
            .filter_map(|seq| match self.activate(&seq.id, seq.trace_id.as_deref()) {
                Ok(summary) => Some(summary),
                Err(e) => {
                    warn!(sequence_id = %seq.id, code = e.code(), error = %e, "sequence not restored");
                    None
                }
            })
            .collect();

        info!(found = active.len(), restored = restored.len(), "active sequences restored");
        restored
    }

    /// Snapshot of every live timer, ordered by sequence id.
    pub fn scheduled(&self) -> Vec<ScheduledSequence> {
        let mut out: Vec<ScheduledSequence> = self
            .timers
            .iter()
            .map(|entry| {
                let timer = entry.value();
                ScheduledSequence {
                    sequence_id: entry.key().clone(),
                    frequency: timer.schedule.expression().to_string(),
                    runners: timer.runners,
                    next_run: timer.stats.next_run(),
                    activated_at: timer.activated_at,
                    ticks: timer.stats.ticks.load(Ordering::Relaxed),
                    failures: timer.stats.failures.load(Ordering::Relaxed),
                    rejected: timer.stats.rejected.load(Ordering::Relaxed),
                }
            })
            .collect();
        out.sort_by(|a, b| a.sequence_id.cmp(&b.sequence_id));
        out
    }

    pub fn is_scheduled(&self, sequence_id: &str) -> bool {
        self.timers.contains_key(sequence_id)
    }

    /// Cancel every timer and wait for running ticks to finish.
    ///
    /// Sequence statuses are left as they are so `restore` picks them up on
    /// the next start.
    pub async fn shutdown(&self) {
        let ids: Vec<String> = self.timers.iter().map(|e| e.key().clone()).collect();
        let mut tasks = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some((_, timer)) = self.timers.remove(&id) {
                timer.cancel();
                tasks.push(timer.task);
            }
        }

        let count = tasks.len();
        for task in tasks {
            if let Err(e) = task.await {
                error!(error = %e, "timer task ended abnormally");
            }
        }
        info!(timers = count, "scheduler stopped");
    }

    fn spawn_timer(
        &self,
        sequence_id: &str,
        schedule: CronSchedule,
        next_run: DateTime<Utc>,
        runners: RunnerSet,
    ) -> TimerHandle {
        let tick_lock = Arc::clone(self.tick_locks.entry(sequence_id.to_string()).or_default().value());
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let stats = Arc::new(TimerStats::default());
        stats.set_next_run(Some(next_run));

        let schedule = Arc::new(schedule);
        let runner_count = runners.len();
        let task = tokio::spawn(run_timer(
            Arc::clone(&schedule),
            runners,
            tick_lock,
            Arc::clone(&self.tick_locks),
            cancel_rx,
            Arc::clone(&stats),
        ));

        TimerHandle {
            cancel: cancel_tx,
            task,
            schedule,
            runners: runner_count,
            activated_at: Utc::now(),
            stats,
        }
    }
}

/// One sequence's timer: sleep until the next firing, run the tick, repeat.
///
/// Cancellation is only observed between ticks. A firing that comes due
/// while a tick is running is skipped; the next one is computed after the
/// tick ends.
async fn run_timer(
    schedule: Arc<CronSchedule>,
    runners: RunnerSet,
    tick_lock: Arc<tokio::sync::Mutex<()>>,
    tick_locks: Arc<TickLocks>,
    mut cancel: watch::Receiver<bool>,
    stats: Arc<TimerStats>,
) {
    let sequence_id = runners.sequence_id().to_string();

    loop {
        let Some(due) = stats.next_run() else {
            warn!(%sequence_id, frequency = %schedule, "schedule has no future firing; timer stopped");
            break;
        };

        let wait = (due - Utc::now()).to_std().unwrap_or_default();
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            changed = cancel.changed() => {
                // The engine itself was dropped.
                if changed.is_err() {
                    break;
                }
            }
        }
        if *cancel.borrow() {
            break;
        }

        {
            let _guard = tick_lock.lock().await;
            // Replaced while waiting for a previous timer's tick.
            if *cancel.borrow() {
                break;
            }
            debug!(%sequence_id, runners = runners.len(), "tick started");
            let report = runners.run_tick().await;
            stats.ticks.fetch_add(1, Ordering::Relaxed);
            stats.failures.fetch_add(report.failures() as u64, Ordering::Relaxed);
            stats.rejected.fetch_add(report.rejected as u64, Ordering::Relaxed);
            debug!(
                %sequence_id,
                completed = report.completed,
                rejected = report.rejected,
                failed = report.failed,
                "tick finished"
            );
        }

        // Never fire twice for the same instant, even if the clock woke us early.
        stats.set_next_run(schedule.next_after(Utc::now().max(due)));
    }

    drop(tick_lock);
    release_tick_lock(&tick_locks, &sequence_id);
    debug!(%sequence_id, "timer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use rusqlite::Connection;
    use serde_json::{json, Value};
    use txr_core::types::Job;
    use txr_plugins::logger::LoggerExecutor;
    use txr_plugins::{Executor, PluginKind, ValidationError};
    use txr_store::{NewApplication, NewJob, NewJobType, NewSequence, SqliteStore};

    /// Counts executions and tracks how many run at once.
    #[derive(Default)]
    struct Probe {
        runs: AtomicU64,
        in_flight: AtomicU64,
        max_in_flight: AtomicU64,
    }

    struct SlowExecutor {
        probe: Arc<Probe>,
        delay: Duration,
    }

    #[async_trait]
    impl Executor for SlowExecutor {
        fn kind(&self) -> PluginKind {
            PluginKind::Logger
        }

        fn validate(&self, declared: &Value, provided: &Value) -> std::result::Result<(), ValidationError> {
            LoggerExecutor.validate(declared, provided)
        }

        async fn execute(
            &self,
            _declared: &Value,
            _job: &Job,
            _previous: Option<&Value>,
        ) -> txr_plugins::Result<Option<Value>> {
            let now = self.probe.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.probe.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.probe.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.probe.runs.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    struct Fixture {
        store: Arc<SqliteStore>,
        engine: Arc<SchedulerEngine>,
        probe: Arc<Probe>,
        logger_type: String,
        app_id: String,
    }

    fn fixture(delay: Duration) -> Fixture {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
        txr_store::db::init_db(&conn).unwrap();
        let store = Arc::new(SqliteStore::new(conn));

        let app_id = store
            .create_applications(
                vec![NewApplication { name: "reports".into(), contact: json!({}) }],
                None,
            )
            .unwrap()
            .remove(0)
            .id;
        let logger_type = store
            .create_job_types(
                vec![NewJobType {
                    name: "_TXR_LOGGER".into(),
                    description: None,
                    options: json!({"type": "'STDOUT' | 'FILE'"}),
                }],
                None,
            )
            .unwrap()
            .remove(0)
            .id;

        let probe = Arc::new(Probe::default());
        let mut plugins = PluginRegistry::with_builtins();
        plugins.register(Arc::new(SlowExecutor {
            probe: Arc::clone(&probe),
            delay,
        }));
        let engine = Arc::new(SchedulerEngine::with_store(Arc::clone(&store), Arc::new(plugins)));

        Fixture {
            store,
            engine,
            probe,
            logger_type,
            app_id,
        }
    }

    impl Fixture {
        fn sequence(&self, frequency: &str, job_types: &[&str]) -> String {
            let jobs = job_types
                .iter()
                .map(|jt| NewJob {
                    id: None,
                    to: None,
                    job_type: jt.to_string(),
                    options: json!({"type": "STDOUT", "value": "tick"}),
                })
                .collect();
            self.store
                .create_sequence(
                    NewSequence {
                        app_id: self.app_id.clone(),
                        description: None,
                        frequency: frequency.into(),
                        jobs,
                    },
                    None,
                )
                .unwrap()
                .id
        }

        fn status(&self, id: &str) -> SequenceStatus {
            SequenceStore::get(self.store.as_ref(), id).unwrap().unwrap().status
        }
    }

    #[tokio::test]
    async fn activation_marks_active_and_schedules() {
        let f = fixture(Duration::ZERO);
        let id = f.sequence("*/5 * * * *", &[&f.logger_type, &f.logger_type]);

        let summary = f.engine.activate(&id, Some("trace-9")).unwrap();
        assert_eq!(summary.runners, 2);
        assert!(summary.failures.is_empty());
        assert!(!summary.replaced);
        assert!(summary.next_run.unwrap() > Utc::now());
        assert_eq!(summary.trace_id.as_deref(), Some("trace-9"));

        assert_eq!(f.status(&id), SequenceStatus::Active);
        assert!(f.engine.is_scheduled(&id));
        let scheduled = f.engine.scheduled();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].frequency, "*/5 * * * *");
        assert_eq!(scheduled[0].runners, 2);

        f.engine.shutdown().await;
    }

    #[tokio::test]
    async fn unknown_sequence_is_not_found() {
        let f = fixture(Duration::ZERO);
        assert!(matches!(
            f.engine.activate("nope", None),
            Err(SchedulerError::SequenceNotFound { .. })
        ));
        assert!(matches!(
            f.engine.deactivate("nope"),
            Err(SchedulerError::SequenceNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn invalid_frequency_leaves_sequence_inactive() {
        let f = fixture(Duration::ZERO);
        let id = f.sequence("every five minutes", &[&f.logger_type]);

        let err = f.engine.activate(&id, None).unwrap_err();
        assert_eq!(err.code(), "INVALID_SCHEDULE");
        assert_eq!(f.status(&id), SequenceStatus::Inactive);
        assert!(!f.engine.is_scheduled(&id));
    }

    #[tokio::test]
    async fn frequency_that_never_fires_is_rejected() {
        let f = fixture(Duration::ZERO);
        let id = f.sequence("0 0 30 2 *", &[&f.logger_type]);

        let err = f.engine.activate(&id, None).unwrap_err();
        assert!(
            matches!(&err, SchedulerError::InvalidSchedule { reason, .. } if reason == "expression never fires"),
            "{err}"
        );
        assert_eq!(f.status(&id), SequenceStatus::Inactive);
        assert!(!f.engine.is_scheduled(&id));
        assert!(f.engine.scheduled().is_empty());
    }

    #[tokio::test]
    async fn unresolvable_jobs_are_skipped() {
        let f = fixture(Duration::ZERO);
        let id = f.sequence("@hourly", &[&f.logger_type, "missing-type", &f.logger_type]);

        let summary = f.engine.activate(&id, None).unwrap();
        assert_eq!(summary.runners, 2);
        assert_eq!(summary.failures.len(), 1);
        assert!(matches!(
            summary.failures[0].error,
            SchedulerError::JobTypeNotFound { .. }
        ));
        f.engine.shutdown().await;
    }

    #[tokio::test]
    async fn reactivation_replaces_the_timer() {
        let f = fixture(Duration::ZERO);
        let id = f.sequence("@daily", &[&f.logger_type]);

        assert!(!f.engine.activate(&id, None).unwrap().replaced);
        assert!(f.engine.activate(&id, None).unwrap().replaced);
        assert!(f.engine.activate(&id, None).unwrap().replaced);
        assert_eq!(f.engine.scheduled().len(), 1);

        f.engine.shutdown().await;
        assert!(f.engine.scheduled().is_empty());
    }

    #[tokio::test]
    async fn deactivate_stops_timer() {
        let f = fixture(Duration::ZERO);
        let id = f.sequence("@daily", &[&f.logger_type]);

        f.engine.activate(&id, None).unwrap();
        assert!(f.engine.deactivate(&id).unwrap());
        assert_eq!(f.status(&id), SequenceStatus::Inactive);
        assert!(!f.engine.is_scheduled(&id));
        // Deactivating again is harmless.
        assert!(!f.engine.deactivate(&id).unwrap());
    }

    #[tokio::test]
    async fn tick_locks_are_released_when_timers_stop() {
        let f = fixture(Duration::ZERO);
        let a = f.sequence("@daily", &[&f.logger_type]);
        let b = f.sequence("@daily", &[&f.logger_type]);

        f.engine.activate(&a, None).unwrap();
        f.engine.activate(&a, None).unwrap();
        f.engine.activate(&b, None).unwrap();
        assert_eq!(f.engine.tick_locks.len(), 2);

        f.engine.deactivate(&a).unwrap();
        // Cancelled timers drop their handle as they exit.
        for _ in 0..50 {
            if f.engine.tick_locks.len() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!f.engine.tick_locks.contains_key(&a));
        assert!(f.engine.tick_locks.contains_key(&b));

        f.engine.shutdown().await;
        assert!(f.engine.tick_locks.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_activate_and_deactivate_agree_with_the_store() {
        let f = fixture(Duration::ZERO);
        let id = f.sequence("@daily", &[&f.logger_type]);

        for round in 0..25 {
            let calls: Vec<_> = (0..4)
                .map(|n| {
                    let engine = Arc::clone(&f.engine);
                    let id = id.clone();
                    tokio::task::spawn_blocking(move || {
                        if (n + round) % 2 == 0 {
                            engine.activate(&id, None).map(|_| ())
                        } else {
                            engine.deactivate(&id).map(|_| ())
                        }
                    })
                })
                .collect();
            for call in calls {
                call.await.unwrap().unwrap();
            }

            let active = f.status(&id) == SequenceStatus::Active;
            assert_eq!(f.engine.is_scheduled(&id), active, "round {round}");
        }

        f.engine.shutdown().await;
    }

    #[tokio::test]
    async fn runners_are_rebuilt_on_every_activation() {
        let f = fixture(Duration::ZERO);
        let id = f.sequence("* * * * * *", &[&f.logger_type]);
        let stats = |engine: &SchedulerEngine| {
            let s = engine.scheduled().remove(0);
            (s.ticks, s.rejected)
        };

        f.engine.activate(&id, None).unwrap();
        tokio::time::sleep(Duration::from_millis(1300)).await;
        let ran = f.probe.runs.load(Ordering::SeqCst);
        assert!(ran >= 1);
        assert_eq!(stats(&f.engine).1, 0);

        // STDOUT is no longer allowed. The live timer keeps its binding.
        let job_type = f
            .store
            .update_job_type(
                &f.logger_type,
                NewJobType {
                    name: "_TXR_LOGGER".into(),
                    description: None,
                    options: json!({"type": "'FILE'"}),
                },
            )
            .unwrap();
        assert_eq!(job_type.options, json!({"type": "'FILE'"}));
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(f.probe.runs.load(Ordering::SeqCst) > ran);
        assert_eq!(stats(&f.engine).1, 0);

        // The next activation picks up the new options and rejects the job.
        f.engine.activate(&id, None).unwrap();
        // Let the replaced timer wind down; the new one never executes.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let before = f.probe.runs.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1300)).await;
        let (ticks, rejected) = stats(&f.engine);
        assert!(ticks >= 1);
        assert_eq!(rejected, ticks);
        assert_eq!(f.probe.runs.load(Ordering::SeqCst), before);

        f.engine.shutdown().await;
    }

    #[tokio::test]
    async fn restore_reactivates_active_sequences() {
        let f = fixture(Duration::ZERO);
        let active = f.sequence("@daily", &[&f.logger_type]);
        let idle = f.sequence("@daily", &[&f.logger_type]);
        let broken = f.sequence("not cron", &[&f.logger_type]);
        f.store.set_status(&active, SequenceStatus::Active).unwrap();
        f.store.set_status(&broken, SequenceStatus::Active).unwrap();

        let restored = f.engine.restore();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].sequence_id, active);
        assert!(f.engine.is_scheduled(&active));
        assert!(!f.engine.is_scheduled(&idle));
        assert!(!f.engine.is_scheduled(&broken));

        f.engine.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn ticks_fire_and_never_overlap() {
        // Each run takes longer than the one-second period.
        let f = fixture(Duration::from_millis(1300));
        let id = f.sequence("* * * * * *", &[&f.logger_type]);

        f.engine.activate(&id, None).unwrap();
        tokio::time::sleep(Duration::from_millis(3500)).await;
        // Re-activating mid-tick must not start a second concurrent run.
        f.engine.activate(&id, None).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        f.engine.shutdown().await;

        assert!(f.probe.runs.load(Ordering::SeqCst) >= 2);
        assert_eq!(f.probe.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(f.probe.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn shutdown_waits_for_running_tick() {
        let f = fixture(Duration::from_millis(400));
        let id = f.sequence("* * * * * *", &[&f.logger_type]);

        f.engine.activate(&id, None).unwrap();
        // Let the first firing start.
        tokio::time::sleep(Duration::from_millis(1200)).await;
        f.engine.shutdown().await;

        assert_eq!(f.probe.in_flight.load(Ordering::SeqCst), 0);
        let scheduled_status = f.status(&id);
        assert_eq!(scheduled_status, SequenceStatus::Active);
    }
}
