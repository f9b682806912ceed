//! Logging bootstrap.

mod init;

pub use init::{LogConfig, init_logging};
