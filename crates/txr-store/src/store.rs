//! Narrow persistence interfaces consumed by the scheduler.
//!
//! Each call is an independent unit: implementations take their own lock or
//! connection per call and never hold state between calls.

use txr_core::types::{Job, JobType, Sequence, SequenceStatus};

use crate::error::Result;

pub trait SequenceStore: Send + Sync {
    /// Fetch a sequence (without its jobs). `None` when the id is unknown.
    fn get(&self, id: &str) -> Result<Option<Sequence>>;

    /// Every sequence whose status is `ACTIVE`.
    fn list_active(&self) -> Result<Vec<Sequence>>;

    /// Persist a status change. `NotFound` when the id is unknown.
    fn set_status(&self, id: &str, status: SequenceStatus) -> Result<()>;
}

pub trait JobStore: Send + Sync {
    /// Jobs of one sequence in submission order.
    fn list_by_sequence(&self, seq_id: &str) -> Result<Vec<Job>>;
}

pub trait JobTypeStore: Send + Sync {
    /// Fetch a job type. `None` when the id is unknown.
    fn get(&self, id: &str) -> Result<Option<JobType>>;
}
