//! Input resolution: turn a user-supplied path or byte buffer into an
//! [`AudioFile`] candidate.
//!
//! Only metadata (name, declared media type, size) is collected up front.
//! The bytes of a path-backed file are read when the upload starts, so a
//! rejected 2 GB file is never loaded into memory.

use crate::error::ClientError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where the bytes of an [`AudioFile`] live.
#[derive(Debug, Clone)]
enum FileSource {
    /// On disk; read lazily at upload time.
    Path(PathBuf),
    /// Already in memory.
    Memory(Vec<u8>),
}

/// A candidate audio file, the equivalent of a dropped or picked file.
#[derive(Debug, Clone)]
pub struct AudioFile {
    name: String,
    media_type: Option<String>,
    size: u64,
    source: FileSource,
}

/// Metadata of an [`AudioFile`], kept by the session for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub name: String,
    pub media_type: Option<String>,
    pub size: u64,
}

impl AudioFile {
    /// Describe a local file. The media type is left undeclared, so
    /// validation falls back to the extension unless
    /// [`with_media_type`](Self::with_media_type) is used.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref().to_path_buf();

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ClientError::FileNotFound { path });
            }
            Err(source) => return Err(ClientError::FileRead { path, source }),
        };
        if !metadata.is_file() {
            return Err(ClientError::FileNotFound { path });
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        debug!("Resolved local audio file: {} ({} bytes)", path.display(), metadata.len());
        Ok(Self {
            name,
            media_type: None,
            size: metadata.len(),
            source: FileSource::Path(path),
        })
    }

    /// Wrap an in-memory buffer.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: None,
            size: bytes.len() as u64,
            source: FileSource::Memory(bytes),
        }
    }

    /// Set the declared media type (e.g. `audio/mpeg`). Blank values count as undeclared.
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        let media_type = media_type.into();
        let trimmed = media_type.trim();
        self.media_type = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn meta(&self) -> FileMeta {
        FileMeta {
            name: self.name.clone(),
            media_type: self.media_type.clone(),
            size: self.size,
        }
    }

    /// Load the file contents for upload.
    pub async fn read_bytes(&self) -> Result<Vec<u8>, ClientError> {
        match &self.source {
            FileSource::Memory(bytes) => Ok(bytes.clone()),
            FileSource::Path(path) => {
                tokio::fs::read(path)
                    .await
                    .map_err(|source| ClientError::FileRead {
                        path: path.clone(),
                        source,
                    })
            }
        }
    }
}
