//! Fetch the converted file and write it to disk.
//!
//! The body is streamed into a temp file created next to the destination
//! and renamed into place once complete, so an interrupted download never
//! leaves a truncated WAV at the destination path.

use crate::error::ClientError;
use futures::StreamExt;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::info;

/// Download `url` to `dest`, returning the number of bytes written.
pub async fn save_to_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    timeout_secs: u64,
) -> Result<u64, ClientError> {
    info!("Downloading {} to {}", url, dest.display());

    let failed = |reason: String| ClientError::DownloadFailed {
        url: url.to_string(),
        reason,
    };
    let write_failed = |source: std::io::Error| ClientError::OutputWriteFailed {
        path: dest.to_path_buf(),
        source,
    };

    let response = client
        .get(url)
        .timeout(Duration::from_secs(timeout_secs))
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                failed(format!("timed out after {timeout_secs}s"))
            } else {
                failed(e.to_string())
            }
        })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::env::current_dir().map_err(write_failed)?,
    };
    tokio::fs::create_dir_all(&parent)
        .await
        .map_err(write_failed)?;

    let mut tmp = NamedTempFile::new_in(&parent).map_err(write_failed)?;
    let mut written: u64 = 0;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| failed(e.to_string()))?;
        tmp.write_all(&chunk).map_err(write_failed)?;
        written += chunk.len() as u64;
    }
    tmp.flush().map_err(write_failed)?;

    tmp.persist(dest).map_err(|e| write_failed(e.error))?;
    info!("Saved {} bytes to {}", written, dest.display());
    Ok(written)
}
