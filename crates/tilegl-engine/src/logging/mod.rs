//! Logging utilities.
//!
//! Everything in the workspace logs through the `log` facade; this module
//! only installs an `env_logger` backend for hosts that do not bring one.

mod init;

pub use init::{init_logging, LoggingConfig};
