//! Pipeline stages around a conversion session.
//!
//! ```text
//! input ──▶ validate ──▶ (upload + poll: crate::controller) ──▶ download
//! (path/bytes) (local)                                         (optional)
//! ```
//!
//! 1. [`input`]    — describe a local file or byte buffer as an [`input::AudioFile`]
//! 2. [`validate`] — media type / extension / size checks; no network
//! 3. [`download`] — stream the converted file to disk with an atomic rename

pub mod download;
pub mod input;
pub mod validate;
