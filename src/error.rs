//! Startup error type.

use thiserror::Error;

/// Failures that can abort server startup. Each maps to a logged message and
/// a non-zero exit code; nothing here is recoverable.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configuration file could not be read or deserialized.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    /// The daemon transition failed.
    #[error("daemonization failed: {0}")]
    Daemon(#[from] daemonize::Error),
    /// The log sink could not be installed.
    #[error("logger setup failed: {0}")]
    Logger(String),
    /// Socket or poll setup failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
