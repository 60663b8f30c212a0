//! Durable log for the background monitor.
//!
//! Lines are appended to `~/.config/cpupulse/cpupulse.log` and survive
//! restarts. Verbose mode also mirrors them to stderr.

use chrono::Local;
use log::{LevelFilter, Metadata, Record, SetLoggerError};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

const LOG_FILENAME: &str = "cpupulse.log";

struct FileLogger {
    file: Mutex<Option<File>>,
    level: LevelFilter,
    mirror_stderr: bool,
}

impl FileLogger {
    fn new(log_path: &Path, level: LevelFilter, mirror_stderr: bool) -> Self {
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .ok();

        FileLogger {
            file: Mutex::new(file),
            level,
            mirror_stderr,
        }
    }
}

fn format_line(record: &Record) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    format!(
        "[{timestamp}] [{:5}] [{}] {}\n",
        record.level(),
        record.target(),
        record.args()
    )
}

impl log::Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(record);

        if let Ok(mut guard) = self.file.lock() {
            if let Some(ref mut file) = *guard {
                let _ = file.write_all(line.as_bytes());
                let _ = file.flush();
            }
        }

        if self.mirror_stderr {
            eprint!("{}", line);
        }
    }

    fn flush(&self) {
        if let Ok(mut guard) = self.file.lock() {
            if let Some(ref mut file) = *guard {
                let _ = file.flush();
            }
        }
    }
}

static LOGGER: OnceLock<FileLogger> = OnceLock::new();

/// Path of the log file, falling back to the working directory when the
/// home directory is unknown.
pub fn log_file_path() -> PathBuf {
    crate::config::config_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(LOG_FILENAME)
}

/// Install the file logger. `verbose` lowers the level to Debug and echoes
/// every line to stderr.
pub fn init(verbose: bool) -> Result<(), SetLoggerError> {
    init_at(&log_file_path(), verbose)
}

pub fn init_at(log_path: &Path, verbose: bool) -> Result<(), SetLoggerError> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let logger = LOGGER.get_or_init(|| FileLogger::new(log_path, level, verbose));

    log::set_logger(logger)?;
    log::set_max_level(logger.level);

    log::debug!("Log file: {:?}", log_path);
    Ok(())
}
