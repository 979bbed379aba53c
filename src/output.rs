//! Owned record copies and human-readable formatting.
//!
//! [`Record`] reads through to the engine on every call. When results must
//! outlive the session (printing, serializing, handing to another thread),
//! take a [`RecordSnapshot`] instead.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::query::{Record, RecordKind};
use crate::sdk::Engine;

/// Owned copy of one record's fields at the time it was taken.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RecordSnapshot {
    /// Index in the result set
    pub index: usize,
    /// Full path and file name
    pub path: Option<String>,
    /// File, folder, or unknown; absent if the engine reported both
    pub kind: Option<RecordKind>,
    /// Size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_created: Option<DateTime<Local>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<DateTime<Local>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_accessed: Option<DateTime<Local>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_recently_changed: Option<DateTime<Local>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_run: Option<DateTime<Local>>,
    /// Win32 file attribute bits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_count: Option<u32>,
}

impl<E: Engine> From<&Record<'_, E>> for RecordSnapshot {
    fn from(record: &Record<'_, E>) -> Self {
        Self {
            index: record.index(),
            path: record.filename(),
            kind: record.kind().ok(),
            size: record.size(),
            date_created: record.date_created(),
            date_modified: record.date_modified(),
            date_accessed: record.date_accessed(),
            date_recently_changed: record.date_recently_changed(),
            date_run: record.date_run(),
            attributes: record.attributes(),
            run_count: record.run_count(),
        }
    }
}

impl RecordSnapshot {
    /// One table row: kind marker, size, modified date, path.
    pub fn to_row(&self) -> String {
        let marker = match self.kind {
            Some(RecordKind::File) => "F",
            Some(RecordKind::Folder) => "D",
            Some(RecordKind::Unknown) => "?",
            None => "!",
        };
        format!(
            "{} {:>10}  {:<16}  {}",
            marker,
            self.size.map(format_size).unwrap_or_else(|| "---".to_string()),
            format_date(self.date_modified.as_ref()),
            self.path.as_deref().unwrap_or("<unavailable>")
        )
    }
}

/// Format file size in human-readable format.
///
/// Examples: "1.2 MB", "340 KB", "4.5 GB"
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a local timestamp as "2024-01-15 14:30", or "---" when absent.
pub fn format_date(date: Option<&DateTime<Local>>) -> String {
    match date {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => "---".to_string(),
    }
}
