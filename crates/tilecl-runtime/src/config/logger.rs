use super::GlobalConfig;
use crate::config::{movement::MovementLogLevel, sync::SyncLogLevel};
use alloc::{string::ToString, sync::Arc, vec::Vec};
use core::fmt::Display;
use hashbrown::HashMap;

#[cfg(std_io)]
use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::PathBuf,
};

/// Configuration of one logging category, parameterized by the category's log level type.
///
/// Several sinks can be active at the same time.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct LoggerConfig<L: LogLevel> {
    /// Path to the log file, if file logging is enabled (requires `std` feature).
    #[serde(default)]
    #[cfg(std_io)]
    pub file: Option<PathBuf>,

    /// Whether to append to the log file (true) or overwrite it (false). Defaults to true.
    #[serde(default = "append_default")]
    pub append: bool,

    /// Whether to log to standard output.
    #[serde(default)]
    pub stdout: bool,

    /// Whether to log to standard error.
    #[serde(default)]
    pub stderr: bool,

    /// Optional forwarding to the `log` crate at the given level.
    #[serde(default)]
    pub log: Option<LogCrateLevel>,

    /// The log level for this logger, determining verbosity.
    #[serde(default)]
    pub level: L,
}

impl<L: LogLevel> Default for LoggerConfig<L> {
    fn default() -> Self {
        Self {
            #[cfg(std_io)]
            file: None,
            append: true,
            stdout: false,
            stderr: false,
            log: None,
            level: L::default(),
        }
    }
}

/// Log levels using the `log` crate.
#[derive(
    Clone, Copy, Debug, Default, serde::Serialize, serde::Deserialize, Hash, PartialEq, Eq,
)]
pub enum LogCrateLevel {
    /// Logs informational messages.
    #[default]
    #[serde(rename = "info")]
    Info,

    /// Logs debugging messages.
    #[serde(rename = "debug")]
    Debug,

    /// Logs trace-level messages.
    #[serde(rename = "trace")]
    Trace,
}

fn append_default() -> bool {
    true
}

/// Trait for types that can be used as log levels in `LoggerConfig`.
pub trait LogLevel:
    serde::de::DeserializeOwned + serde::Serialize + Clone + Copy + core::fmt::Debug + Default
{
    /// Whether the level turns the category off.
    fn is_disabled(&self) -> bool;
}

/// Routes the messages of each category to the sinks configured for it.
///
/// A sink shared by both categories (the same file, stdout...) is opened once.
#[derive(Debug)]
pub struct Logger {
    sinks: Vec<Sink>,
    movement: Vec<usize>,
    sync: Vec<usize>,
    /// Configuration the sinks were opened from.
    pub config: Arc<GlobalConfig>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// Creates a logger from the global configuration.
    pub fn new() -> Self {
        Self::from_config(GlobalConfig::get())
    }

    /// Creates a logger from the given configuration, opening every sink it names.
    pub fn from_config(config: Arc<GlobalConfig>) -> Self {
        let mut table = SinkTable::default();
        let movement = table.register(&config.movement.logger);
        let sync = table.register(&config.sync.logger);

        Self {
            sinks: table.sinks,
            movement,
            sync,
            config,
        }
    }

    /// Logs a message for the movement engines.
    pub fn log_movement<S: Display>(&mut self, msg: &S) {
        Self::log_to(&mut self.sinks, &self.movement, msg);
    }

    /// Logs a message about handshakes and hazards.
    pub fn log_sync<S: Display>(&mut self, msg: &S) {
        Self::log_to(&mut self.sinks, &self.sync, msg);
    }

    /// The movement log level of the configuration.
    pub fn log_level_movement(&self) -> MovementLogLevel {
        self.config.movement.logger.level
    }

    /// The synchronization log level of the configuration.
    pub fn log_level_sync(&self) -> SyncLogLevel {
        self.config.sync.logger.level
    }

    fn log_to<S: Display>(sinks: &mut [Sink], indices: &[usize], msg: &S) {
        match indices {
            [] => {}
            [index] => sinks[*index].write(msg),
            _ => {
                // Formatted once for every sink.
                let msg = msg.to_string();
                for index in indices {
                    sinks[*index].write(&msg);
                }
            }
        }
    }
}

#[derive(Hash, PartialEq, Eq)]
enum SinkId {
    #[cfg(std_io)]
    File(PathBuf),
    #[cfg(feature = "std")]
    Stdout,
    #[cfg(feature = "std")]
    Stderr,
    LogCrate(LogCrateLevel),
}

#[derive(Default)]
struct SinkTable {
    sinks: Vec<Sink>,
    opened: HashMap<SinkId, usize>,
}

impl SinkTable {
    /// Indices of the sinks of one category, opening the ones not seen yet.
    fn register<L: LogLevel>(&mut self, config: &LoggerConfig<L>) -> Vec<usize> {
        let mut indices = Vec::new();
        if config.level.is_disabled() {
            return indices;
        }

        #[cfg(std_io)]
        if let Some(path) = &config.file {
            let append = config.append;
            indices.extend(self.open(SinkId::File(path.clone()), || {
                FileSink::open(path, append).map(Sink::File)
            }));
        }
        #[cfg(feature = "std")]
        if config.stdout {
            indices.extend(self.open(SinkId::Stdout, || Some(Sink::Stdout)));
        }
        #[cfg(feature = "std")]
        if config.stderr {
            indices.extend(self.open(SinkId::Stderr, || Some(Sink::Stderr)));
        }
        if let Some(level) = config.log {
            indices.extend(self.open(SinkId::LogCrate(level), || Some(Sink::Log(level))));
        }

        indices
    }

    fn open(&mut self, id: SinkId, open: impl FnOnce() -> Option<Sink>) -> Option<usize> {
        if let Some(index) = self.opened.get(&id) {
            return Some(*index);
        }

        let index = self.sinks.len();
        self.sinks.push(open()?);
        self.opened.insert(id, index);
        Some(index)
    }
}

#[derive(Debug)]
enum Sink {
    #[cfg(std_io)]
    File(FileSink),
    #[cfg(feature = "std")]
    Stdout,
    #[cfg(feature = "std")]
    Stderr,
    Log(LogCrateLevel),
}

impl Sink {
    fn write<S: Display>(&mut self, msg: &S) {
        match self {
            #[cfg(std_io)]
            Sink::File(file) => file.write(msg),
            #[cfg(feature = "std")]
            Sink::Stdout => println!("{msg}"),
            #[cfg(feature = "std")]
            Sink::Stderr => eprintln!("{msg}"),
            Sink::Log(LogCrateLevel::Info) => log::info!("{msg}"),
            Sink::Log(LogCrateLevel::Debug) => log::debug!("{msg}"),
            Sink::Log(LogCrateLevel::Trace) => log::trace!("{msg}"),
        }
    }
}

#[derive(Debug)]
#[cfg(std_io)]
struct FileSink {
    writer: BufWriter<File>,
}

#[cfg(std_io)]
impl FileSink {
    // A file that can't be opened is skipped with a warning.
    fn open(path: &PathBuf, append: bool) -> Option<Self> {
        let file = OpenOptions::new()
            .write(true)
            .append(append)
            .truncate(!append)
            .create(true)
            .open(path);

        match file {
            Ok(file) => Some(Self {
                writer: BufWriter::new(file),
            }),
            Err(err) => {
                log::warn!("Can't open log file {}: {err}", path.display());
                None
            }
        }
    }

    // Flushed after every message so a crashing kernel keeps its log.
    fn write<S: Display>(&mut self, msg: &S) {
        let written = writeln!(self.writer, "{msg}").and_then(|_| self.writer.flush());
        if let Err(err) = written {
            log::warn!("Can't write to log file: {err}");
        }
    }
}
