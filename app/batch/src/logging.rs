//! FILENAME: app/batch/src/logging.rs
// PURPOSE: Unified logging system for the batch runner.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use log::{Level, LevelFilter, Log, Metadata, Record};
use once_cell::sync::Lazy;

// ============================================================================
// UNIFIED LOGGING SYSTEM
// ============================================================================

/// Global sequence counter shared by every log line of the process
static LOG_SEQ: AtomicU64 = AtomicU64::new(0);

/// Global log file handle
pub static LOG_FILE: Lazy<Mutex<Option<File>>> = Lazy::new(|| Mutex::new(None));

/// Get next sequence number
pub fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst) + 1
}

/// Level letter used in log lines.
pub fn level_letter(level: Level) -> &'static str {
    match level {
        Level::Error => "E",
        Level::Warn => "W",
        Level::Info => "I",
        Level::Debug => "D",
        Level::Trace => "T",
    }
}

/// `seq|LEVEL|CATEGORY|message`
pub fn format_line(seq: u64, level: &str, category: &str, message: &str) -> String {
    format!("{}|{}|{}|{}", seq, level, category, message)
}

/// Initialize the log file, truncating any previous content
pub fn init_log_file(log_path: &Path) -> Result<PathBuf, String> {
    if let Some(dir) = log_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| format!("Failed to create log dir at {:?}: {}", dir, e))?;
    }

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(log_path)
        .map_err(|e| format!("Failed to create log file {:?}: {}", log_path, e))?;

    let mut log_file = LOG_FILE.lock().map_err(|e| format!("Lock error: {}", e))?;
    *log_file = Some(file);

    Ok(log_path.to_path_buf())
}

/// Write a log line in unified format
pub fn write_log(level: &str, category: &str, message: &str) {
    let line = format_line(next_seq(), level, category, message);

    if let Ok(mut guard) = LOG_FILE.lock() {
        if let Some(ref mut file) = *guard {
            if let Err(e) = writeln!(file, "{}", line) {
                eprintln!("[LOG_ERROR] Failed to write: {}", e);
            }
            let _ = file.flush();
        }
    }

    // stdout carries command output
    eprintln!("{}", line);
}

/// Write an ENTER log line for function entry
pub fn write_log_enter(category: &str, func_name: &str, params: &str) {
    if params.is_empty() {
        log::debug!(target: category, "ENTER {}", func_name);
    } else {
        log::debug!(target: category, "ENTER {} {}", func_name, params);
    }
}

/// Write an EXIT log line for function exit
pub fn write_log_exit(category: &str, func_name: &str, result: &str) {
    if result.is_empty() {
        log::debug!(target: category, "EXIT {}", func_name);
    } else {
        log::debug!(target: category, "EXIT {} {}", func_name, result);
    }
}

// ============================================================================
// LOG FACADE BACKEND
// ============================================================================

/// Routes `log` records of every crate into the unified format.
/// The record target is the category.
struct BatchLogger;

impl Log for BatchLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            write_log(level_letter(record.level()), record.target(), &record.args().to_string());
        }
    }

    fn flush(&self) {
        if let Ok(mut guard) = LOG_FILE.lock() {
            if let Some(ref mut file) = *guard {
                let _ = file.flush();
            }
        }
    }
}

static LOGGER: BatchLogger = BatchLogger;

/// Installs the logger. Call once, before the first log record.
pub fn init(level: LevelFilter, log_file: Option<&Path>) -> Result<(), String> {
    if let Some(path) = log_file {
        init_log_file(path)?;
    }
    log::set_logger(&LOGGER).map_err(|e| format!("Logger already set: {}", e))?;
    log::set_max_level(level);
    Ok(())
}

// ============================================================================
// MACRO DEFINITIONS & EXPORTS
// ============================================================================

// ENTER/EXIT macros for function tracing

#[macro_export]
macro_rules! log_enter {
    ($cat:expr, $func:expr) => {
        $crate::logging::write_log_enter($cat, $func, "")
    };
    ($cat:expr, $func:expr, $($arg:tt)*) => {
        $crate::logging::write_log_enter($cat, $func, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_exit {
    ($cat:expr, $func:expr) => {
        $crate::logging::write_log_exit($cat, $func, "")
    };
    ($cat:expr, $func:expr, $($arg:tt)*) => {
        $crate::logging::write_log_exit($cat, $func, &format!($($arg)*))
    };
}

pub use log_enter;
pub use log_exit;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_format() {
        assert_eq!(format_line(7, "W", "MERGE", "discarded 2 value(s)"), "7|W|MERGE|discarded 2 value(s)");
        assert_eq!(level_letter(Level::Error), "E");
        assert_eq!(level_letter(Level::Debug), "D");
    }

    #[test]
    fn test_sequence_increases() {
        let a = next_seq();
        let b = next_seq();
        assert!(b > a);
    }

    #[test]
    fn test_write_log_reaches_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("batch.log");
        init_log_file(&path).unwrap();

        write_log("I", "STEP", "hello from the test");

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("|I|STEP|hello from the test"));

        *LOG_FILE.lock().unwrap() = None;
    }
}
