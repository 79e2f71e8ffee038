//! Wire types for the conversion service and the completion summary.
//!
//! Every field the status endpoint returns is optional. Rather than failing
//! on a sparse payload, each field has a fixed placeholder: `?` for unknown
//! format properties, `0` for sizes and progress, and
//! [`DEFAULT_OUTPUT_FILENAME`] for the converted file name.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// File name shown when the server omits `filename`.
pub const DEFAULT_OUTPUT_FILENAME: &str = "converted_audio.wav";

/// Format the converter always produces: mono, 8000 Hz, 16-bit PCM.
///
/// This is a property of the service, displayed as a constant; it is never
/// read back from the status payload.
pub const TARGET_FORMAT: AudioFormat = AudioFormat {
    channels: Some(1),
    sample_rate: Some(8000),
    bit_depth: Some(16),
};

/// How [`TARGET_FORMAT`] is shown next to the converted file size.
pub const TARGET_FORMAT_LABEL: &str = "1 channel, 8000 Hz, 16 bit";

/// Opaque identifier of a server-side conversion task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Server-relative download link, e.g. `/download/abc`.
    pub fn download_path(&self) -> String {
        format!("/download/{}", self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of a `POST /upload` response (success or failure).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Task state reported by `GET /status/{task_id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Accepted but the converter has not started yet.
    Pending,
    Processing,
    Complete,
    Error,
    /// The server has no record of the task id.
    Unknown,
    /// Missing or unrecognised `status` value.
    #[default]
    #[serde(other)]
    Other,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Complete | TaskStatus::Error | TaskStatus::Unknown
        )
    }
}

/// Channel count, sample rate and bit depth of an audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AudioFormat {
    #[serde(default)]
    pub channels: Option<u32>,
    #[serde(default)]
    pub sample_rate: Option<u32>,
    #[serde(default)]
    pub bit_depth: Option<u32>,
}

impl AudioFormat {
    /// Render as `2 channel(s), 44100 Hz, 16 bit`; missing or zero values show `?`.
    pub fn describe(&self) -> String {
        format!(
            "{} channel(s), {} Hz, {} bit",
            placeholder(self.channels),
            placeholder(self.sample_rate),
            placeholder(self.bit_depth)
        )
    }
}

fn placeholder(value: Option<u32>) -> String {
    match value {
        Some(v) if v > 0 => v.to_string(),
        _ => "?".to_string(),
    }
}

/// Body of a `GET /status/{task_id}` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusReport {
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub original_size: Option<u64>,
    #[serde(default)]
    pub converted_size: Option<u64>,
    #[serde(default)]
    pub original_format: Option<AudioFormat>,
}

/// `null`, non-string and unrecognised values all read as [`TaskStatus::Other`].
fn lenient_status<'de, D>(deserializer: D) -> Result<TaskStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default())
}

impl StatusReport {
    pub fn with_status(status: TaskStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Progress as a whole percentage; missing or out-of-range values are clamped into 0–100.
    pub fn progress_percent(&self) -> u8 {
        match self.progress {
            Some(p) if p.is_finite() => p.round().clamp(0.0, 100.0) as u8,
            _ => 0,
        }
    }

    /// The server's error message, or `Unknown error` when absent or blank.
    pub fn error_message(&self) -> String {
        self.error
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or("Unknown error")
            .to_string()
    }
}

/// What the user sees once a task completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionSummary {
    pub filename: String,
    pub original_size: u64,
    pub converted_size: u64,
    pub original_format: AudioFormat,
}

impl ConversionSummary {
    /// Build from a `complete` status payload, applying placeholders.
    pub fn from_report(report: &StatusReport) -> Self {
        Self {
            filename: report
                .filename
                .clone()
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| DEFAULT_OUTPUT_FILENAME.to_string()),
            original_size: report.original_size.unwrap_or(0),
            converted_size: report.converted_size.unwrap_or(0),
            original_format: report.original_format.unwrap_or_default(),
        }
    }

    /// The converted format; always [`TARGET_FORMAT`].
    pub fn converted_format(&self) -> AudioFormat {
        TARGET_FORMAT
    }
}

/// Human-readable byte count: `0 Bytes`, `1 KB`, `1.91 MB`.
///
/// Uses 1024-based units up to GB, rounded to two decimals with trailing
/// zeros dropped.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut scaled = bytes as f64;
    while scaled >= 1024.0 && unit < UNITS.len() - 1 {
        scaled /= 1024.0;
        unit += 1;
    }

    // Ties round up: 1.125 KB reads 1.13 KB.
    let rounded = format!("{:.2}", (scaled * 100.0).round() / 100.0);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
