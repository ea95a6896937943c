//! Server configuration, read from an INI file.

use serde::Deserialize;

use crate::error::ServerError;

/// Everything the server needs to know at startup.
///
/// ```ini
/// listen_port = 8080
/// max_clients = 128
/// num_threads = 8
/// daemon = 0
/// debug = 0
/// server_root = ./www
/// server_signature = emberd/0.1.0
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// TCP port the listener binds.
    pub listen_port: u16,
    /// Listen backlog handed to the kernel.
    pub max_clients: i32,
    /// Worker thread count; zero is normalized to one by the pool.
    pub num_threads: usize,
    /// Detach from the terminal and log to syslog instead of stdio.
    #[serde(default)]
    pub daemon: bool,
    /// Emit debug-level log lines.
    #[serde(default)]
    pub debug: bool,
    /// Document root prepended to every request path.
    pub server_root: String,
    /// Value of the `Server:` response header.
    pub server_signature: String,
}

impl ServerConfig {
    /// Loads and validates the configuration at `path`.
    pub fn load(path: &str) -> Result<Self, ServerError> {
        let config = config::Config::builder()
            .add_source(config::File::new(path, config::FileFormat::Ini))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}
