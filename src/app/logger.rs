use std::fs::File;
use std::io::Write;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{LevelFilter, Log, Metadata, Record};

use crate::{Error, Result};

/// Log verbosity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    #[default]
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    pub fn to_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(()),
        }
    }
}

/// Stderr logger with an optional append-only file sink, installed behind the `log` facade.
pub struct Logger {
    level: LogLevel,
    file: Option<Mutex<File>>,
}

impl Logger {
    /// `HOMEBADGER_LOG_LEVEL` and `HOMEBADGER_LOG_PATH` win over the arguments.
    pub fn new(level: LogLevel, file_path: Option<String>) -> Self {
        let env_level = std::env::var("HOMEBADGER_LOG_LEVEL")
            .ok()
            .and_then(|s| LogLevel::from_str(&s).ok());
        let effective_level = env_level.unwrap_or(level);

        let env_file = std::env::var("HOMEBADGER_LOG_PATH").ok();
        let path = env_file.or(file_path);
        let file = path.and_then(|p| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(p)
                .ok()
        });
        Self {
            level: effective_level,
            file: file.map(Mutex::new),
        }
    }

    /// Make this the process-wide logger. Fails if one is already installed.
    pub fn install(self) -> Result<()> {
        let filter = self.level.to_filter();
        log::set_boxed_logger(Box::new(self))
            .map_err(|e| Error::InvalidArgs(format!("logger already installed: {e}")))?;
        log::set_max_level(filter);
        Ok(())
    }

    fn format_line(record: &Record) -> String {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        format!(
            "[{ts:.3}] [{}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        )
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level.to_filter()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = Self::format_line(record);
        eprintln!("{line}");
        if let Some(file) = self.file.as_ref() {
            if let Ok(mut file) = file.lock() {
                let _ = writeln!(file, "{line}");
            }
        }
    }

    fn flush(&self) {
        if let Some(file) = self.file.as_ref() {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
    }
}
