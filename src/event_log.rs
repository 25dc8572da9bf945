use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    HeadMisalignment,
    EyeMovement,
    MobileDetection,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::HeadMisalignment => "Head Misalignment",
            EventKind::EyeMovement => "Eye Movement",
            EventKind::MobileDetection => "Mobile Detection",
        }
    }
}

/// One row of the cheating log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Type")]
    pub event_type: &'static str,
    #[serde(rename = "Details")]
    pub details: String,
}

impl LogRecord {
    pub fn new(at: DateTime<Local>, kind: EventKind, details: impl Into<String>) -> Self {
        Self {
            timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
            event_type: kind.as_str(),
            details: details.into(),
        }
    }
}

/// Append-only CSV file with CRLF row endings. Each append opens, writes one row and closes the file.
pub struct CsvEventLog {
    path: PathBuf,
}

impl CsvEventLog {
    /// Creates the file with its header row if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            let mut writer = csv::WriterBuilder::new()
                .terminator(csv::Terminator::CRLF)
                .from_path(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            writer.write_record(["Timestamp", "Type", "Details"])?;
            writer.flush()?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &LogRecord) -> Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::CRLF)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        tracing::debug!("Logged {} ({})", record.event_type, record.details);
        Ok(())
    }
}
