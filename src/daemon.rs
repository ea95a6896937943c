//! Daemon transition.

use std::env;
use std::path::PathBuf;

use daemonize::Daemonize;

use crate::error::ServerError;

/// Detaches the process from the terminal and its session.
///
/// The working directory is kept, since the document root is usually given
/// relative to it, and the umask is cleared. Must run before the listener,
/// pool or logger exist; open descriptors do not survive the transition.
pub fn daemonize() -> Result<(), ServerError> {
    let workdir = env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));

    Daemonize::new().working_directory(workdir).umask(0o000).start()?;
    Ok(())
}
