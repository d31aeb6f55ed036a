//! `txr-plugins`: executors that perform a job's actual effect.
//!
//! Each job type names a plugin; the [`PluginRegistry`] maps that name to an
//! [`Executor`] at activation time. The set of names is the closed
//! [`PluginKind`] enumeration, so an executor can only be registered under a
//! name the system knows about.
//!
//! | Plugin          | Effect                                          |
//! |-----------------|-------------------------------------------------|
//! | `_TXR_LOGGER`   | Write a line to stdout or append it to a file   |
//! | `_TXR_DATABASE` | Run a query against a SQLite database file      |

pub mod database;
pub mod error;
pub mod executor;
pub mod logger;
pub mod options;
pub mod registry;

pub use error::{PluginError, Result, ValidationError};
pub use executor::{Executor, PluginKind};
pub use registry::PluginRegistry;
