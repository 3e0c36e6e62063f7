//! Process-wide logging.
//!
//! A single [`Logger`] lives in a `OnceLock` and is reached through the
//! `log_*!` macros. It writes to stderr by default, and can be switched to
//! forward records over a channel (for hosts embedding the compiler) or to
//! a rotating log file. Records above the maximum level are dropped before
//! their message is formatted.

use crossbeam_channel::{Receiver, Sender, unbounded};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock, PoisonError, RwLock};

pub mod message;

pub use message::{LogMessage, Severity};

static GLOBAL_LOGGER: OnceLock<Logger> = OnceLock::new();

const LOG_FILE_NAME: &str = "vellum.log";
const LOG_FILE_MAX_SIZE: u64 = 1024 * 1024;
/// Archives kept next to the current file: `vellum.log.1` to `vellum.log.4`.
const LOG_FILE_ARCHIVES: usize = 4;

/// Appends records to `vellum.log`, archiving it once it grows past 1 MiB.
#[derive(Debug)]
pub struct RotatingFile {
    dir: PathBuf,
    file: Option<File>,
    size: u64,
}

impl RotatingFile {
    /// Opens the default log directory, `<data dir>/vellum/logs`.
    pub fn open_default() -> io::Result<Self> {
        let base = dirs::data_local_dir()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        Self::open(base.join("vellum").join("logs"))
    }

    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(RotatingFile {
            dir,
            file: None,
            size: 0,
        })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(LOG_FILE_NAME)
    }

    fn archive(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{LOG_FILE_NAME}.{index}"))
    }

    /// Shifts every archive up by one, dropping the oldest.
    fn rotate(&mut self) -> io::Result<()> {
        self.file = None;
        for index in (1..LOG_FILE_ARCHIVES).rev() {
            let from = self.archive(index);
            if from.exists() {
                fs::rename(&from, self.archive(index + 1))?;
            }
        }
        let current = self.path();
        if current.exists() {
            fs::rename(&current, self.archive(1))?;
        }
        self.size = 0;
        Ok(())
    }

    fn current(&mut self) -> io::Result<&mut File> {
        if self.file.is_none() {
            let path = self.path();
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            self.size = file.metadata().map(|meta| meta.len()).unwrap_or(0);
            self.file = Some(file);
        }
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("log file is not open"))
    }

    pub fn append(&mut self, record: &LogMessage) -> io::Result<()> {
        let line = format!("{record}\n");
        let len = line.len() as u64;
        self.current()?;
        if self.size > 0 && self.size + len > LOG_FILE_MAX_SIZE {
            self.rotate()?;
        }
        let file = self.current()?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        self.size += len;
        Ok(())
    }
}

/// Where log records go.
#[derive(Debug, Clone)]
pub enum LoggerMode {
    /// Every record goes to stderr, so rendered output on stdout stays clean.
    Standalone,
    /// Records are sent through a channel to the embedding host.
    Embedded(Sender<LogMessage>),
    /// Records are appended to a [`RotatingFile`].
    File,
}

#[derive(Debug)]
struct Sink {
    mode: LoggerMode,
    file: Option<RotatingFile>,
}

impl Sink {
    fn deliver(&mut self, record: LogMessage) {
        match &self.mode {
            LoggerMode::Standalone => eprintln!("{record}"),
            LoggerMode::Embedded(sender) => {
                if let Err(err) = sender.try_send(record) {
                    eprintln!("{} (log channel closed)", err.into_inner());
                }
            }
            LoggerMode::File => match self.file.as_mut() {
                Some(file) => {
                    if let Err(err) = file.append(&record) {
                        eprintln!("{record} (log file unavailable: {err})");
                    }
                }
                None => eprintln!("{record}"),
            },
        }
    }
}

#[derive(Debug)]
pub struct Logger {
    sink: Mutex<Sink>,
    max_level: RwLock<Severity>,
}

impl Logger {
    pub fn new(mode: LoggerMode) -> Self {
        let file = match mode {
            LoggerMode::File => open_log_file(),
            _ => None,
        };
        Logger {
            sink: Mutex::new(Sink { mode, file }),
            max_level: RwLock::new(Severity::Info),
        }
    }

    /// Switches destination. File mode opens the log directory on first use.
    pub fn set_mode(&self, mode: LoggerMode) {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(mode, LoggerMode::File) && sink.file.is_none() {
            sink.file = open_log_file();
        }
        sink.mode = mode;
    }

    /// Records less severe than `level` are dropped.
    pub fn set_level(&self, level: Severity) {
        *self.max_level.write().unwrap_or_else(PoisonError::into_inner) = level;
    }

    pub fn level(&self) -> Severity {
        *self.max_level.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn enabled(&self, level: Severity) -> bool {
        level <= self.level()
    }

    pub fn log_file_path(&self) -> Option<PathBuf> {
        let sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        sink.file.as_ref().map(RotatingFile::path)
    }

    pub fn log(&self, level: Severity, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        let record = LogMessage::new(level, args.to_string());
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .deliver(record);
    }
}

fn open_log_file() -> Option<RotatingFile> {
    RotatingFile::open_default()
        .map_err(|err| eprintln!("Failed to open the log directory: {err}"))
        .ok()
}

/// Installs the global logger. Only the first call has an effect.
pub fn init(mode: LoggerMode) {
    let _ = GLOBAL_LOGGER.set(Logger::new(mode));
}

pub fn init_standalone() {
    init(LoggerMode::Standalone);
}

/// Installs an embedded logger and returns the receiving end of its channel.
pub fn init_embedded() -> Receiver<LogMessage> {
    let (sender, receiver) = unbounded();
    match GLOBAL_LOGGER.get() {
        Some(logger) => logger.set_mode(LoggerMode::Embedded(sender)),
        None => init(LoggerMode::Embedded(sender)),
    }
    receiver
}

/// The global logger, standalone unless [`init`] ran first.
pub fn get_logger() -> &'static Logger {
    GLOBAL_LOGGER.get_or_init(|| Logger::new(LoggerMode::Standalone))
}

pub fn set_file_mode() {
    get_logger().set_mode(LoggerMode::File);
}

pub fn set_level(level: Severity) {
    get_logger().set_level(level);
}

pub fn log_file_path() -> Option<PathBuf> {
    get_logger().log_file_path()
}

#[macro_export]
macro_rules! log_at {
    ($level:expr, $($arg:tt)*) => {
        $crate::logger::get_logger().log($level, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => { $crate::log_at!($crate::logger::Severity::Debug, $($arg)*) };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => { $crate::log_at!($crate::logger::Severity::Info, $($arg)*) };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => { $crate::log_at!($crate::logger::Severity::Warn, $($arg)*) };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => { $crate::log_at!($crate::logger::Severity::Error, $($arg)*) };
}

/// `println!` through the logger, at info level.
#[macro_export]
macro_rules! log_println {
    () => { $crate::log_info!("") };
    ($($arg:tt)*) => { $crate::log_info!($($arg)*) };
}

/// `eprintln!` through the logger, at error level.
#[macro_export]
macro_rules! log_eprintln {
    () => { $crate::log_error!("") };
    ($($arg:tt)*) => { $crate::log_error!($($arg)*) };
}
