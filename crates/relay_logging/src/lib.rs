#![deny(missing_docs)]
//! Shared logging utilities for the relay workspace.
//!
//! This crate provides the `relay_*` logging macros used across the codebase,
//! the timeline clock stamped into every line, and initializers for the
//! global `simplelog` logger.

use std::cell::Cell;
use std::fs::File;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

thread_local! {
    /// Milliseconds elapsed on the coordination timeline of this thread.
    static TIMELINE_MS: Cell<u64> = const { Cell::new(0) };
}

/// Sets the timeline clock for the current thread.
/// The automation service calls this before handling each callback or notification.
pub fn set_timeline_ms(now_ms: u64) {
    TIMELINE_MS.with(|v| v.set(now_ms));
}

/// Retrieves the timeline clock for the current thread.
/// Returns 0 if no session has advanced the clock yet.
pub fn timeline_ms() -> u64 {
    TIMELINE_MS.with(|v| v.get())
}

/// Logs a trace-level message stamped with the timeline clock.
#[macro_export]
macro_rules! relay_trace {
    ($($arg:tt)*) => {{
        log::trace!("[t={}ms] {}", $crate::timeline_ms(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message stamped with the timeline clock.
#[macro_export]
macro_rules! relay_info {
    ($($arg:tt)*) => {{
        log::info!("[t={}ms] {}", $crate::timeline_ms(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message stamped with the timeline clock.
#[macro_export]
macro_rules! relay_debug {
    ($($arg:tt)*) => {{
        log::debug!("[t={}ms] {}", $crate::timeline_ms(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message stamped with the timeline clock.
#[macro_export]
macro_rules! relay_warn {
    ($($arg:tt)*) => {{
        log::warn!("[t={}ms] {}", $crate::timeline_ms(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message stamped with the timeline clock.
#[macro_export]
macro_rules! relay_error {
    ($($arg:tt)*) => {{
        log::error!("[t={}ms] {}", $crate::timeline_ms(), format_args!($($arg)*));
    }};
}

/// Destination for log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    /// Write to the given file, truncating it.
    File(PathBuf),
    /// Write to the terminal on stderr, leaving stdout to the program.
    Terminal,
    /// Write to both the given file and the terminal.
    Both(PathBuf),
}

/// Initialize the global logger with the specified destination and level.
///
/// Safe to call more than once: later calls are ignored by `log`.
pub fn initialize(destination: LogDestination, level: LevelFilter) {
    let config = build_config();

    let loggers: Vec<Box<dyn SharedLogger>> = match destination {
        LogDestination::File(path) => match create_file_logger(&path, level, config) {
            Some(file_logger) => vec![file_logger],
            None => return,
        },
        LogDestination::Terminal => vec![TermLogger::new(
            level,
            config,
            TerminalMode::Stderr,
            ColorChoice::Auto,
        )],
        LogDestination::Both(path) => {
            let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
                level,
                config.clone(),
                TerminalMode::Stderr,
                ColorChoice::Auto,
            )];
            if let Some(file_logger) = create_file_logger(&path, level, config) {
                loggers.push(file_logger);
            }
            loggers
        }
    };

    let _ = CombinedLogger::init(loggers);
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(
    path: &Path,
    level: LevelFilter,
    config: Config,
) -> Option<Box<WriteLogger<File>>> {
    match File::create(path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", path, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeline_clock_is_per_thread() {
        set_timeline_ms(1500);
        assert_eq!(timeline_ms(), 1500);
        let other = std::thread::spawn(timeline_ms).join().unwrap();
        assert_eq!(other, 0);
    }
}
