// src/utils/logger.rs

use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use std::io::Write;

static LOGGER: StderrLogger = StderrLogger;

/// Environment variable that overrides the configured level
pub const LEVEL_ENV: &str = "D3DISP_LOG";

struct StderrLogger;

/// Parses a level name; unknown names fall back to `info`.
pub fn parse_level(name: &str) -> LevelFilter {
  name.trim().parse().unwrap_or(LevelFilter::Info)
}

/// Installs the stderr logger. `D3DISP_LOG` takes precedence over `level`.
pub fn init(level: &str) -> Result<(), SetLoggerError> {
  let filter = match std::env::var(LEVEL_ENV) {
    Ok(env) => parse_level(&env),
    Err(_) => parse_level(level),
  };
  log::set_logger(&LOGGER).map(|()| log::set_max_level(filter))
}

impl log::Log for StderrLogger {
  fn enabled(&self, metadata: &Metadata) -> bool {
    metadata.level() <= log::max_level()
  }

  fn log(&self, record: &Record) {
    if self.enabled(record.metadata()) {
      let tag = match record.level() {
        Level::Error => "error",
        Level::Warn => "warn",
        Level::Info => "info",
        Level::Debug => "debug",
        Level::Trace => "trace",
      };

      // Format: "[warn] d3disp::physics::c6: reference weights underflow ..."
      let mut stderr = std::io::stderr().lock();
      let _ = writeln!(stderr, "[{}] {}: {}", tag, record.target(), record.args());
    }
  }

  fn flush(&self) {
    let _ = std::io::stderr().flush();
  }
}
