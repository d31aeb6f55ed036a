//! `txr-store`: SQLite persistence for applications, job types, sequences
//! and jobs.
//!
//! The scheduler only sees the narrow [`SequenceStore`], [`JobStore`] and
//! [`JobTypeStore`] traits; [`SqliteStore`] implements all three plus the
//! CRUD surface the HTTP gateway needs.

pub mod db;
pub mod error;
pub mod sqlite;
pub mod store;

pub use error::{Result, StoreError};
pub use sqlite::{NewApplication, NewJob, NewJobType, NewSequence, SqliteStore};
pub use store::{JobStore, JobTypeStore, SequenceStore};
