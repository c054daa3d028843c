// src/logger.rs

//! A simple rotating file logger for worker traffic and application
//! messages, separate from the `tracing` diagnostics in [`crate::logging`].
//!
//! Lines are prefixed with a timestamp and an optional tag. When the
//! calendar day changes between writes, the current file is renamed to the
//! first free `<name>.<seq>` suffix and a fresh file is opened.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};

/// Shared handle used where several tasks append to the same log.
pub type SharedFileLogger = Arc<tokio::sync::Mutex<FileLogger>>;

const DEFAULT_DATE_FORMAT: &str = "%d-%m %H:%M:%S%.3f";

#[derive(Debug)]
pub struct FileLogger {
    path: PathBuf,
    file: File,
    date_format: String,
    tag: Option<String>,
    /// Day the current file was last written (or modified, when appending
    /// to an existing file); rotation triggers when it changes.
    day: Option<NaiveDate>,
}

impl FileLogger {
    /// Open (or create) the log file in append mode.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let day = existing_mtime_day(&path);
        let file = open_append(&path)?;
        Ok(Self {
            path,
            file,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            tag: None,
            day,
        })
    }

    /// Tag every line with an extra identifier, e.g. a command name.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Append a message. Multi-line messages get the prefix on every line.
    pub fn log(&mut self, message: &str) -> Result<()> {
        let now = Local::now();
        self.rotate_if_needed(&now)?;

        let mut prefix = now.format(&self.date_format).to_string();
        if let Some(tag) = &self.tag {
            prefix.push(' ');
            prefix.push_str(tag);
        }

        for line in message.lines() {
            writeln!(self.file, "{prefix} {line}")
                .with_context(|| format!("writing to log file {:?}", self.path))?;
        }
        self.day = Some(now.date_naive());
        Ok(())
    }

    /// Rename the current file to the first free `<name>.<seq>` suffix and
    /// reopen, when the day has rolled over since the last write.
    fn rotate_if_needed(&mut self, now: &DateTime<Local>) -> Result<()> {
        let Some(day) = self.day else {
            return Ok(());
        };
        if day == now.date_naive() {
            return Ok(());
        }

        let rotated = next_rotation_name(&self.path);
        fs::rename(&self.path, &rotated)
            .with_context(|| format!("rotating log file {:?} to {rotated:?}", self.path))?;
        self.file = open_append(&self.path)?;
        self.day = None;
        Ok(())
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {path:?}"))
}

/// Day of the file's last modification, when appending to an existing log.
fn existing_mtime_day(path: &Path) -> Option<NaiveDate> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::<Local>::from(modified).date_naive())
}

fn next_rotation_name(path: &Path) -> PathBuf {
    let base = path.to_string_lossy();
    let mut seq = 0;
    loop {
        let candidate = PathBuf::from(format!("{base}.{seq}"));
        if !candidate.exists() {
            return candidate;
        }
        seq += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_prefixes_every_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");

        let mut logger = FileLogger::open(&path).unwrap().with_tag("worker");
        logger.log("first\nsecond").unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("worker first"));
        assert!(lines[1].contains("worker second"));
    }

    #[test]
    fn appends_across_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");

        FileLogger::open(&path).unwrap().log("one").unwrap();
        FileLogger::open(&path).unwrap().log("two").unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn rotation_picks_first_free_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(format!("{}.0", path.display()), "old").unwrap();

        assert_eq!(
            next_rotation_name(&path),
            PathBuf::from(format!("{}.1", path.display()))
        );
    }
}
