//! # audioconv
//!
//! Client for an audio conversion service that turns MP3/WAV uploads into
//! mono, 8 kHz, 16-bit WAV files.
//!
//! The service does the transcoding. This crate owns everything on the
//! client side of one conversion attempt: local validation, the multipart
//! upload, polling the task until it finishes, and the download link for the
//! result, modelled as a small state machine with a renderable view.
//!
//! ## Session Lifecycle
//!
//! ```text
//! file
//!  │
//!  ├─ 1. Validate  MP3/WAV by media type (extension as fallback), 1 B – 100 MiB
//!  ├─ 2. Upload    POST /upload (multipart "audiofile") → task_id
//!  ├─ 3. Poll      GET /status/{task_id} every 1000 ms
//!  ├─ 4. Complete  download link /download/{task_id} + file info
//!  └─ 5. Reset     back to idle from anywhere; in-flight responses are ignored
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use audioconv::{convert, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .base_url("http://127.0.0.1:5000")
//!         .build()?;
//!     let done = convert("voicemail.mp3", &config).await?;
//!     println!("{} ready at {}", done.summary.filename, done.download_url);
//!     Ok(())
//! }
//! ```
//!
//! ## Driving the Session Yourself
//!
//! A front end that needs to render progress, cancel, or accept a second
//! file uses [`SessionController`] and subscribes to its [`View`]:
//!
//! ```rust,no_run
//! use audioconv::{AudioFile, ClientConfig, HttpConversionApi, SessionController};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), audioconv::ClientError> {
//! let config = ClientConfig::default();
//! let api = Arc::new(HttpConversionApi::new(&config)?);
//! let controller = SessionController::new(api, config);
//! let mut views = controller.subscribe();
//!
//! controller.submit(Some(AudioFile::from_path("take.wav").await?)).await?;
//! while views.changed().await.is_ok() {
//!     let view = views.borrow().clone();
//!     println!("{:?} {}%", view.panel, view.progress);
//!     if view.phase.is_terminal() {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `audioconv` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod api;
pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod session;
pub mod stream;
pub mod view;

#[cfg(test)]
mod testing;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use api::{ConversionApi, HttpConversionApi};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use controller::{CompletedConversion, PollHandle, SessionController};
pub use convert::{convert, convert_file, convert_sync, convert_to_file};
pub use error::{ClientError, ErrorKind, SessionError, ValidationError};
pub use pipeline::input::{AudioFile, FileMeta};
pub use pipeline::validate::{validate, ALLOWED_EXTENSIONS, ALLOWED_MEDIA_TYPES, MAX_FILE_SIZE};
pub use progress::{NoopObserver, ObserverRef, SessionObserver};
pub use report::{format_file_size, AudioFormat, ConversionSummary, StatusReport, TaskId, TaskStatus};
pub use session::{PhaseKind, Session, Step, Ticket};
pub use stream::{poll_until_done, status_stream};
pub use view::{FileInfo, Panel, View};
