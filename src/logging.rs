//! Bridges the `log` facade — the macros every other module in this crate
//! calls (`log::trace!`, `log::debug!`, `log::info!`, `log::error!`) — to
//! the `logly::Logger` instance the demo binary configures, the same
//! `Logger` the teacher threads through its own call sites. Without
//! installing a backend, `log`'s default no-op logger silently drops every
//! call site's output.

use std::sync::Arc;

use log::{Level, Log, Metadata, Record};
use logly::Logger;

struct LoglyBackend {
    logger: Arc<Logger>,
}

impl Log for LoglyBackend {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let message = format!("{}", record.args());
        let result = match record.level() {
            Level::Error => self.logger.error(message),
            Level::Warn => self.logger.warn(message),
            Level::Info => self.logger.info(message),
            Level::Debug => self.logger.debug(message),
            Level::Trace => self.logger.trace(message),
        };
        let _ = result;
    }

    fn flush(&self) {}
}

/// Installs `logger` as the global backend for the `log` facade. Call once,
/// at process start, before any `get`/`put` is issued against a `Tree`.
pub fn install(logger: Arc<Logger>, level: log::LevelFilter) -> Result<(), log::SetLoggerError> {
    log::set_boxed_logger(Box::new(LoglyBackend { logger }))?;
    log::set_max_level(level);
    Ok(())
}
