//! Log sink selection.
//!
//! Foreground runs print priority-tagged lines to stdio; daemon runs route
//! everything through syslog under the daemon facility.

use log::{Level, LevelFilter, Metadata, Record};

use crate::error::ServerError;

struct ForegroundLogger;

impl log::Log for ForegroundLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        match record.level() {
            Level::Error | Level::Warn => {
                eprintln!("[Server] [LOG_ERR]: {}", record.args());
            }
            Level::Info => {
                println!("[Server] [LOG_INFO]: {}", record.args());
            }
            Level::Debug | Level::Trace => {
                println!("[Server] [LOG_DEBUG]: {}", record.args());
            }
        }
    }

    fn flush(&self) {}
}

/// Installs the process-wide logger.
///
/// `debug` widens the level filter to debug; otherwise informational and
/// error lines only.
pub fn init(daemon: bool, debug: bool) -> Result<(), ServerError> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    if daemon {
        syslog::init(syslog::Facility::LOG_DAEMON, level, Some("emberd"))
            .map_err(|err| ServerError::Logger(err.to_string()))?;
    } else {
        log::set_boxed_logger(Box::new(ForegroundLogger))
            .map_err(|err| ServerError::Logger(err.to_string()))?;
        log::set_max_level(level);
    }

    Ok(())
}
