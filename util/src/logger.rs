//! # Logger
//!
//! Records go to two outputs: the console and the session's log file. Each has its own level, so
//! the per-cycle `DEBUG` output of the autonomy can be kept in the file without flooding the
//! console. The levels come from the `[log]` table of the executable's parameters:
//!
//! ```toml
//! [log]
//! file_level = "debug"
//! console_level = "info"
//! quiet_targets = ["auto_lib::auto::traj_ctrl::state"]
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{self, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Logging parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogParams {
    /// Records at or above this level are written to the session log file. Must be `INFO` or more
    /// verbose so that the file always holds every decision made.
    #[serde(default = "default_file_level")]
    pub file_level: LevelFilter,

    /// Records at or above this level are printed to the console.
    #[serde(default = "default_console_level")]
    pub console_level: LevelFilter,

    /// Modules whose records are limited to `INFO` in both outputs
    #[serde(default)]
    pub quiet_targets: Vec<String>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a file log level of at least `INFO`, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LogParams {
    /// Log everything at or above `level` to both outputs.
    pub fn new(level: LevelFilter) -> Self {
        Self {
            file_level: level,
            console_level: level,
            quiet_targets: Vec::new(),
        }
    }

    /// Check the parameters can be used to initialise the logger.
    pub fn validate(&self) -> Result<(), LoggerInitError> {
        if self.file_level < log::Level::Info {
            return Err(LoggerInitError::InvalidMinLogLevel(self.file_level));
        }

        Ok(())
    }
}

impl Default for LogParams {
    fn default() -> Self {
        Self {
            file_level: default_file_level(),
            console_level: default_console_level(),
            quiet_targets: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// Must only be called once, the logger is global.
pub fn logger_init(
    params: &LogParams,
    session: &session::Session,
) -> Result<(), LoggerInitError> {
    params.validate()?;

    let log_file =
        fern::log_file(session.log_file_path.clone()).map_err(LoggerInitError::LogFileInitError)?;

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            // If debug or trace include the target, otherwise don't include it
            if record.level() > log::Level::Info {
                out.finish(format_args!(
                    "[{:10.6} {}] {}: {}",
                    session::get_elapsed_seconds(),
                    level_to_str(record.level()),
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "[{:10.6} {}] {}",
                    session::get_elapsed_seconds(),
                    level_to_str(record.level()),
                    message
                ))
            }
        })
        .level(params.file_level.max(params.console_level));

    for target in params.quiet_targets.iter() {
        dispatch = dispatch.level_for(target.clone(), LevelFilter::Info);
    }

    dispatch
        .chain(
            fern::Dispatch::new()
                .level(params.console_level)
                .chain(std::io::stdout()),
        )
        .chain(fern::Dispatch::new().level(params.file_level).chain(log_file))
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {:?}", session::get_epoch());
    info!(
        "    Log levels: file {}, console {}",
        params.file_level, params.console_level
    );
    info!("    Log file path: {:?}", session.log_file_path);
    for target in params.quiet_targets.iter() {
        info!("    Quiet: {}", target);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn default_file_level() -> LevelFilter {
    LevelFilter::Debug
}

fn default_console_level() -> LevelFilter {
    LevelFilter::Info
}

/// Get the string representation of a log level
fn level_to_str(level: log::Level) -> ColoredString {
    match level {
        log::Level::Trace => "TRC".dimmed().italic(),
        log::Level::Debug => "DBG".dimmed(),
        log::Level::Info => "INF".normal(),
        log::Level::Warn => "WRN".yellow(),
        log::Level::Error => "ERR".red().bold(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::Path;

    #[derive(Deserialize)]
    struct ExecParams {
        #[serde(default)]
        log: LogParams,
    }

    #[test]
    fn test_parse_log_params() {
        let params: ExecParams = crate::params::from_str(
            Path::new("exec.toml"),
            r#"
            [log]
            file_level = "trace"
            console_level = "WARN"
            quiet_targets = ["auto_lib::auto::auto_mgr::classify"]
            "#,
        )
        .unwrap();

        assert_eq!(params.log.file_level, LevelFilter::Trace);
        assert_eq!(params.log.console_level, LevelFilter::Warn);
        assert_eq!(params.log.quiet_targets.len(), 1);
        assert!(params.log.validate().is_ok());
    }

    #[test]
    fn test_missing_log_table_uses_defaults() {
        let params: ExecParams =
            crate::params::from_str(Path::new("exec.toml"), "").unwrap();

        assert_eq!(params.log, LogParams::default());
        assert_eq!(params.log.file_level, LevelFilter::Debug);
        assert_eq!(params.log.console_level, LevelFilter::Info);
    }

    #[test]
    fn test_quiet_file_level_rejected() {
        assert!(matches!(
            LogParams::new(LevelFilter::Warn).validate(),
            Err(LoggerInitError::InvalidMinLogLevel(LevelFilter::Warn))
        ));
        assert!(LogParams::new(LevelFilter::Info).validate().is_ok());

        // Only the file is required to keep decisions, the console may be quieter
        let mut params = LogParams::default();
        params.console_level = LevelFilter::Error;
        assert!(params.validate().is_ok());
    }
}
