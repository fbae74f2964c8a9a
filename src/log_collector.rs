//! Logging pipeline for toolchain builds.
//!
//! Every `log::*` record is handed to a background thread over an unbounded
//! crossbeam channel. The thread persists it to the per-run log file and
//! echoes it to the terminal when its level passes the console filter.
//!
//! ```text
//! log::info!() / child output
//!     |
//! [LogCollector] (log::Log, non-blocking)
//!     | (crossbeam unbounded)
//!     v
//! [persister thread] ---> <log_dir>/<ts>.log         every line
//!            |        \-> <log_dir>/<ts>_parsed.log  milestones only
//!            v
//!         stderr (console level)
//! ```
//!
//! Target `"parsed"` marks milestone lines; target `"build"` carries raw
//! child-process output, which only reaches the console in verbose mode.

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Target for milestone lines
pub const PARSED_TARGET: &str = "parsed";

/// Target for raw child-process output
pub const BUILD_TARGET: &str = "build";

/// Crate targets whose debug records are kept; everything else is warn+.
const OWN_TARGETS: [&str; 4] = ["cross_toolchain", "toolchain", PARSED_TARGET, BUILD_TARGET];

enum LogMessage {
    Line(LogLine),
    /// Flush marker, acknowledged once everything before it is on disk
    Flush(std::sync::mpsc::Sender<()>),
}

/// A log line with metadata
#[derive(Clone, Debug)]
pub struct LogLine {
    pub message: String,
    pub level: Level,
    /// Milestone line (target `"parsed"`)
    pub parsed: bool,
    /// Raw child output (target `"build"`)
    pub build_output: bool,
    /// `HH:MM:SS.mmm` at creation
    pub timestamp: String,
}

impl LogLine {
    pub fn new(level: Level, message: String) -> Self {
        LogLine {
            message,
            level,
            parsed: false,
            build_output: false,
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }

    pub fn parsed(message: String) -> Self {
        LogLine {
            parsed: true,
            ..LogLine::new(Level::Info, message)
        }
    }

    fn file_line(&self) -> String {
        format!("[{}] [{}] {}\n", self.timestamp, self.level, self.message)
    }

    fn console_line(&self) -> String {
        match self.level {
            Level::Info => self.message.clone(),
            level => format!("[{}] {}", level, self.message),
        }
    }
}

/// `log` backend writing to a per-run file and the terminal.
#[derive(Clone)]
pub struct LogCollector {
    tx: Sender<LogMessage>,
    log_path: PathBuf,
}

impl LogCollector {
    /// Create the log directory and the persister thread.
    ///
    /// `console_level` bounds what is echoed to stderr; child output needs
    /// `Debug`.
    pub fn new(log_dir: &Path, console_level: LevelFilter) -> Result<Self, String> {
        std::fs::create_dir_all(log_dir)
            .map_err(|e| format!("Failed to create log dir {}: {}", log_dir.display(), e))?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let log_path = log_dir.join(format!("{}.log", stamp));
        let parsed_path = log_dir.join(format!("{}_parsed.log", stamp));

        let mut full = open_append(&log_path)?;
        let mut parsed = open_append(&parsed_path)?;

        let (tx, rx) = unbounded::<LogMessage>();

        // OS thread: must keep draining after the tokio runtime is gone.
        std::thread::Builder::new()
            .name("log-persister".to_string())
            .spawn(move || {
                while let Ok(msg) = rx.recv() {
                    match msg {
                        LogMessage::Line(line) => {
                            let formatted = line.file_line();
                            let _ = full.write_all(formatted.as_bytes());
                            if line.parsed {
                                let _ = parsed.write_all(formatted.as_bytes());
                            }
                            if line.level <= console_level
                                && (!line.build_output || console_level >= LevelFilter::Debug)
                            {
                                eprintln!("{}", line.console_line());
                            }
                        }
                        LogMessage::Flush(ack) => {
                            let _ = full.flush();
                            let _ = parsed.flush();
                            let _ = ack.send(());
                        }
                    }
                }
            })
            .map_err(|e| format!("Failed to spawn log persister: {}", e))?;

        Ok(LogCollector { tx, log_path })
    }

    /// Create a collector and register it as the global logger.
    pub fn install(log_dir: &Path, console_level: LevelFilter) -> Result<Self, String> {
        let collector = LogCollector::new(log_dir, console_level)?;
        log::set_boxed_logger(Box::new(collector.clone()))
            .map_err(|e| format!("Failed to register logger: {}", e))?;
        // The file always receives debug lines, whatever the console shows.
        log::set_max_level(LevelFilter::Debug);
        Ok(collector)
    }

    /// Path of the full log for this run
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Send a line (never blocks).
    pub fn log_line(&self, line: LogLine) {
        let _ = self.tx.send(LogMessage::Line(line));
    }

    /// Block until every line sent so far has been written.
    pub fn wait_for_empty(&self) -> Result<(), String> {
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        self.tx
            .send(LogMessage::Flush(tx))
            .map_err(|e| format!("Failed to send flush marker: {}", e))?;
        rx.recv()
            .map_err(|e| format!("Flush signal interrupted: {}", e))
    }
}

fn open_append(path: &Path) -> Result<File, String> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("Failed to open log file {}: {}", path.display(), e))
}

impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Warn
            || OWN_TARGETS
                .iter()
                .any(|t| metadata.target().starts_with(t))
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut line = LogLine::new(record.level(), record.args().to_string());
        line.parsed = record.target() == PARSED_TARGET;
        line.build_output = record.target() == BUILD_TARGET;
        self.log_line(line);
    }

    fn flush(&self) {
        let _ = self.wait_for_empty();
    }
}
