//! Core value types: severity levels and log records.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use std::time::Instant;

/// Severity of a record, also used as a subscription threshold.
///
/// `Any` is a filter-only sentinel: subscribing at `Any` accepts every record,
/// but no record is ever emitted at `Any`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Level {
    Any = 0,
    Debug = 1,
    Info = 2,
    Warning = 3,
    Error = 4,
    Critical = 5,
}

impl Level {
    /// Every level, lowest rank first.
    pub const ALL: [Level; 6] = [
        Level::Any,
        Level::Debug,
        Level::Info,
        Level::Warning,
        Level::Error,
        Level::Critical,
    ];

    /// Integer rank used on the wire.
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Level for a wire rank, if the rank is in range.
    pub fn from_rank(rank: u8) -> Option<Self> {
        Self::ALL.get(rank as usize).copied()
    }

    /// Upper-case display name.
    pub fn name(self) -> &'static str {
        match self {
            Level::Any => "ANY",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }

    /// ANSI colour escape used by coloured console output.
    pub fn color_code(self) -> &'static str {
        match self {
            Level::Any => "\x1b[97m",
            Level::Debug => "\x1b[96m",
            Level::Info => "\x1b[92m",
            Level::Warning => "\x1b[93m",
            Level::Error => "\x1b[91m",
            Level::Critical => "\x1b[31m",
        }
    }

    /// Whether a subscription at this threshold accepts a record at `level`.
    pub fn admits(self, level: Level) -> bool {
        self <= level
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> u8 {
        level.rank()
    }
}

impl TryFrom<u8> for Level {
    type Error = String;

    fn try_from(rank: u8) -> std::result::Result<Self, String> {
        Level::from_rank(rank).ok_or_else(|| format!("level rank {} out of range 0..=5", rank))
    }
}

/// Seconds elapsed since the process epoch.
///
/// The epoch is fixed the first time any timestamp is taken in the process.
pub fn process_time() -> f64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_secs_f64()
}

/// One log event.
///
/// `source` is the chain of logger names the record has passed through,
/// root first. Its first element is the topic the record is broadcast under.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Logger name chain, root first.
    pub source: Vec<String>,

    /// Seconds since the emitting process's epoch.
    pub time: f64,

    /// Severity (never `Level::Any`).
    pub level: Level,

    pub message: String,
}

impl Record {
    pub fn new(source: Vec<String>, time: f64, level: Level, message: impl Into<String>) -> Self {
        Self {
            source,
            time,
            level,
            message: message.into(),
        }
    }

    /// Record emitted now by a single logger.
    pub fn now(name: impl Into<String>, level: Level, message: impl Into<String>) -> Self {
        Self::new(vec![name.into()], process_time(), level, message)
    }

    /// Topic this record is published under: the root of the source chain.
    pub fn topic(&self) -> &str {
        self.source.first().map(String::as_str).unwrap_or("")
    }

    /// Source chain joined with `.` for display.
    pub fn source_path(&self) -> String {
        self.source.join(".")
    }

    /// Put a forwarding logger's name at the root of the chain.
    pub(crate) fn prepend_source(&mut self, name: &str) {
        self.source.insert(0, name.to_string());
    }

    /// Serialize to the wire body (UTF-8 JSON object).
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Transport(e.to_string()))
    }

    /// Parse a wire body.
    ///
    /// Fails with [`Error::MalformedRecord`] when a field is missing or the
    /// level rank is out of range.
    pub fn decode(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }
}
