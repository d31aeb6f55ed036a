//! `txr-core`: shared domain types, configuration and the placeholder
//! resolver used by every other TXR crate.

pub mod config;
pub mod error;
pub mod placeholder;
pub mod types;

pub use error::{Result, TxrError};
