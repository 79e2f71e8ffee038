//! View model: what a front end shows for the current session.
//!
//! Exactly one [`Panel`] is visible at a time. Every session transition
//! replaces the whole [`View`], so a renderer never sees a half-updated mix
//! of two phases.

use crate::report::{format_file_size, ConversionSummary, TaskId, TARGET_FORMAT_LABEL};
use crate::session::PhaseKind;
use serde::Serialize;

/// The visible panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    /// Drop target / file picker.
    DropTarget,
    /// Status text and progress bar.
    Progress,
    /// Download link and file info.
    Download,
    /// Error message with retry/cancel.
    Error,
}

/// Three lines describing a finished conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub filename: String,
    pub original: String,
    pub converted: String,
}

impl FileInfo {
    pub fn from_summary(summary: &ConversionSummary) -> Self {
        Self {
            filename: summary.filename.clone(),
            original: format!(
                "{} - {}",
                format_file_size(summary.original_size),
                summary.original_format.describe()
            ),
            converted: format!(
                "{} - {}",
                format_file_size(summary.converted_size),
                TARGET_FORMAT_LABEL
            ),
        }
    }

    /// `Label: value` lines in display order.
    pub fn lines(&self) -> [String; 3] {
        [
            format!("Filename: {}", self.filename),
            format!("Original: {}", self.original),
            format!("Converted: {}", self.converted),
        ]
    }
}

/// Snapshot of everything a front end renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct View {
    pub phase: PhaseKind,
    pub panel: Panel,
    pub status_message: String,
    /// Progress bar width, 0–100.
    pub progress: u8,
    /// Server-relative link, e.g. `/download/abc`.
    pub download_href: Option<String>,
    pub file_info: Option<FileInfo>,
    pub error_message: Option<String>,
}

impl Default for View {
    fn default() -> Self {
        Self::idle()
    }
}

impl View {
    pub fn idle() -> Self {
        Self {
            phase: PhaseKind::Idle,
            panel: Panel::DropTarget,
            status_message: String::new(),
            progress: 0,
            download_href: None,
            file_info: None,
            error_message: None,
        }
    }

    /// Validation is synchronous; the drop target stays up while it runs.
    pub fn validating() -> Self {
        Self {
            phase: PhaseKind::Validating,
            ..Self::idle()
        }
    }

    pub fn uploading() -> Self {
        Self {
            phase: PhaseKind::Uploading,
            panel: Panel::Progress,
            status_message: "Uploading file...".to_string(),
            ..Self::idle()
        }
    }

    /// Entry into polling, before the first status tick.
    pub fn converting() -> Self {
        Self {
            phase: PhaseKind::Polling,
            panel: Panel::Progress,
            status_message: "Converting...".to_string(),
            progress: 10,
            ..Self::idle()
        }
    }

    pub fn processing(percent: u8) -> Self {
        Self {
            status_message: format!("Converting... {percent}%"),
            progress: percent,
            ..Self::converting()
        }
    }

    pub fn complete(task_id: &TaskId, summary: &ConversionSummary) -> Self {
        Self {
            phase: PhaseKind::Complete,
            panel: Panel::Download,
            status_message: String::new(),
            progress: 100,
            download_href: Some(task_id.download_path()),
            file_info: Some(FileInfo::from_summary(summary)),
            error_message: None,
        }
    }

    /// Hides every other panel and shows one message.
    pub fn error(message: impl Into<String>, progress: u8) -> Self {
        Self {
            phase: PhaseKind::Error,
            panel: Panel::Error,
            progress,
            error_message: Some(message.into()),
            ..Self::idle()
        }
    }
}
