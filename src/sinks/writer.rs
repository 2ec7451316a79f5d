//! Line-formatting sinks for the console and files.

use super::Sink;
use crate::error::Result;
use crate::types::Record;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

const COLOR_RESET: &str = "\x1b[0m";

/// `{time} [LEVEL] message (source.chain)`
fn format_line(record: &Record, width: usize, precision: usize, with_color: bool) -> String {
    let level = if with_color {
        format!("{}{}{}", record.level.color_code(), record.level, COLOR_RESET)
    } else {
        record.level.to_string()
    };

    format!(
        "{:>width$.precision$} [{}] {} ({})",
        record.time,
        level,
        record.message,
        record.source_path(),
        width = width,
        precision = precision,
    )
}

/// Prints records to stdout.
#[derive(Clone, Copy, Debug)]
pub struct ConsoleSink {
    with_color: bool,
}

impl ConsoleSink {
    pub fn new(with_color: bool) -> Self {
        Self { with_color }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Sink for ConsoleSink {
    fn receive(&self, record: &Record) -> Result<()> {
        let line = format_line(record, 9, 5, self.with_color);
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", line)?;
        Ok(())
    }
}

/// Appends records to a file, one line each.
pub struct FileSink {
    file: Mutex<File>,
}

impl FileSink {
    /// Open `path` for appending, creating it if missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl Sink for FileSink {
    fn receive(&self, record: &Record) -> Result<()> {
        let line = format_line(record, 12, 8, false);
        let mut file = self.file.lock();
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Level;
    use tempfile::TempDir;

    #[test]
    fn test_format_plain() {
        let record = Record::new(vec!["main".into(), "child".into()], 1.25, Level::Warning, "careful");
        assert_eq!(
            format_line(&record, 9, 5, false),
            "  1.25000 [WARNING] careful (main.child)"
        );
    }

    #[test]
    fn test_format_colored() {
        let record = Record::new(vec!["main".into()], 0.0, Level::Error, "x");
        let line = format_line(&record, 9, 5, true);
        assert!(line.contains("\x1b[91mERROR\x1b[0m"));
    }

    #[test]
    fn test_file_sink_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.log");

        {
            let sink = FileSink::open(&path).unwrap();
            sink.receive(&Record::new(vec!["a".into()], 0.5, Level::Info, "first")).unwrap();
        }
        {
            let sink = FileSink::open(&path).unwrap();
            sink.receive(&Record::new(vec!["a".into()], 1.0, Level::Critical, "second")).unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "  0.50000000 [INFO] first (a)");
        assert_eq!(lines[1], "  1.00000000 [CRITICAL] second (a)");
    }
}
