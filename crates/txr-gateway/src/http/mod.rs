pub mod applications;
pub mod envelope;
pub mod health;
pub mod job_types;
pub mod sequences;
pub mod trace;
