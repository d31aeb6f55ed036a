//! `txr-scheduler`: turns ACTIVE sequences into recurring, in-process timers.
//!
//! # Overview
//!
//! Activating a sequence resolves each of its jobs to an executor once (the
//! [`runner::RunnerBuilder`]), then the [`engine::SchedulerEngine`] spawns a
//! single Tokio task for the sequence that sleeps until the next
//! [`schedule::CronSchedule`] firing and invokes every runner in order.
//!
//! | Operation    | Effect                                               |
//! |--------------|------------------------------------------------------|
//! | `activate`   | Build runners, mark ACTIVE, start or replace a timer |
//! | `deactivate` | Stop the timer, mark INACTIVE                        |
//! | `restore`    | Re-activate every ACTIVE sequence after a restart    |
//! | `shutdown`   | Stop all timers and wait for running ticks           |

pub mod engine;
pub mod error;
pub mod runner;
pub mod schedule;

pub use engine::{ActivationSummary, ScheduledSequence, SchedulerEngine};
pub use error::{Result, SchedulerError};
pub use runner::{BuildFailure, BuildReport, RunOutcome, Runner, RunnerBuilder, RunnerSet, TickReport};
pub use schedule::CronSchedule;
