//! One-shot conversion entry points.
//!
//! These wrap a [`SessionController`] over [`HttpConversionApi`]: submit one
//! file, wait for the terminal phase, and return the outcome. Use the
//! controller directly when you need the view model, cancellation, or more
//! than one submission per client.

use crate::api::HttpConversionApi;
use crate::config::ClientConfig;
use crate::controller::{CompletedConversion, SessionController};
use crate::error::ClientError;
use crate::pipeline::download;
use crate::pipeline::input::AudioFile;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Convert a local MP3/WAV file.
///
/// # Errors
/// - [`ClientError::FileNotFound`] / [`ClientError::FileRead`] for a bad path
/// - [`ClientError::Session`] when validation, upload or conversion fails
///
/// # Example
/// ```rust,no_run
/// use audioconv::{convert, ClientConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ClientConfig::builder().base_url("http://localhost:5000").build()?;
/// let done = convert("interview.mp3", &config).await?;
/// println!("download: {}", done.download_url);
/// # Ok(())
/// # }
/// ```
pub async fn convert(
    input: impl AsRef<Path>,
    config: &ClientConfig,
) -> Result<CompletedConversion, ClientError> {
    let file = AudioFile::from_path(input).await?;
    convert_file(file, config).await
}

/// Convert an already-described [`AudioFile`] (e.g. in-memory bytes).
pub async fn convert_file(
    file: AudioFile,
    config: &ClientConfig,
) -> Result<CompletedConversion, ClientError> {
    let api = Arc::new(HttpConversionApi::new(config)?);
    run(api, file, config).await
}

/// Convert a local file and save the result to `output_path`.
pub async fn convert_to_file(
    input: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ClientConfig,
) -> Result<CompletedConversion, ClientError> {
    let file = AudioFile::from_path(input).await?;
    let api = Arc::new(HttpConversionApi::new(config)?);
    let done = run(Arc::clone(&api), file, config).await?;

    let bytes = download::save_to_file(
        api.client(),
        &done.download_url,
        output_path.as_ref(),
        config.download_timeout_secs,
    )
    .await?;
    info!(
        "Converted {} → {} ({} bytes)",
        done.summary.filename,
        output_path.as_ref().display(),
        bytes
    );
    Ok(done)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input: impl AsRef<Path>,
    config: &ClientConfig,
) -> Result<CompletedConversion, ClientError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ClientError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input, config))
}

async fn run(
    api: Arc<HttpConversionApi>,
    file: AudioFile,
    config: &ClientConfig,
) -> Result<CompletedConversion, ClientError> {
    let controller = SessionController::new(api, config.clone());
    controller.run(file).await
}
