//! Diagnostic logger.
//!
//! A `log::Log` implementation that writes `[ KIND ] [ timestamp ] message`
//! lines to stderr. Only debug builds install it: in release builds [`init`]
//! leaves the `log` facade untouched and [`log`] compiles to nothing.

use chrono::{DateTime, Local, SecondsFormat, TimeZone};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fmt;
use std::io::Write;

/// Severity of an ad hoc diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Kind {
    #[default]
    Info,
    Error,
}

impl Kind {
    #[cfg_attr(not(debug_assertions), allow(dead_code))]
    fn level(self) -> Level {
        match self {
            Kind::Info => Level::Info,
            Kind::Error => Level::Error,
        }
    }
}

/// Log a diagnostic message. For human eyes only; never fails.
pub fn log(kind: Kind, message: impl fmt::Display) {
    #[cfg(debug_assertions)]
    log::log!(kind.level(), "{}", message);
    #[cfg(not(debug_assertions))]
    let _ = (kind, message);
}

fn tag(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

/// Render one log line with an RFC 3339 timestamp.
pub fn format_line<Tz>(level: Level, at: &DateTime<Tz>, message: impl fmt::Display) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!(
        "[ {} ] [ {} ] {}",
        tag(level),
        at.to_rfc3339_opts(SecondsFormat::Millis, false),
        message
    )
}

#[derive(Debug)]
pub struct DiagnosticLogger {
    level: LevelFilter,
}

impl DiagnosticLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self { level }
    }
}

impl Log for DiagnosticLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(record.level(), &Local::now(), record.args());
        let _ = writeln!(std::io::stderr().lock(), "{}", line);
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Install the diagnostic logger as the global `log` backend.
///
/// # Errors
///
/// Fails if another logger was installed first.
#[cfg(debug_assertions)]
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(DiagnosticLogger::new(level)))?;
    log::set_max_level(level);
    Ok(())
}

/// Release builds install nothing.
///
/// # Errors
///
/// Never fails.
#[cfg(not(debug_assertions))]
pub fn init(_level: LevelFilter) -> Result<(), SetLoggerError> {
    Ok(())
}

/// Parse a level name from configuration, defaulting to `Info`.
pub fn parse_level(name: &str) -> LevelFilter {
    name.parse().unwrap_or(LevelFilter::Info)
}
