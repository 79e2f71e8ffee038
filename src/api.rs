//! The seam between the session controller and the conversion service.
//!
//! [`ConversionApi`] is what the controller calls; [`HttpConversionApi`] is
//! the reqwest implementation used in production. Tests and embedders can
//! substitute their own implementation.
//!
//! ## Error mapping
//!
//! | Call | Failure | Message |
//! |------|---------|---------|
//! | upload | non-2xx with JSON `{error}` | the `error` value |
//! | upload | non-2xx otherwise | `HTTP error! Status: N` |
//! | upload | 2xx with `error` field | the `error` value |
//! | upload | 2xx without `task_id` | `No task ID returned from server` |
//! | status | non-2xx | `HTTP error! Status: N` |
//! | both | transport / JSON failure | the underlying error text |

use crate::config::ClientConfig;
use crate::error::{ClientError, SessionError};
use crate::pipeline::input::AudioFile;
use crate::report::{StatusReport, TaskId, UploadResponse};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{StatusCode, Url};
use std::time::Duration;
use tracing::{debug, info};

/// Multipart form field carrying the audio file.
pub const UPLOAD_FIELD: &str = "audiofile";

/// Operations the conversion service offers.
#[async_trait]
pub trait ConversionApi: Send + Sync {
    /// Upload a validated file and return the task id the server assigned.
    async fn upload(&self, file: &AudioFile) -> Result<TaskId, SessionError>;

    /// Fetch the current status of a task.
    async fn status(&self, task_id: &TaskId) -> Result<StatusReport, SessionError>;

    /// Absolute URL of the converted file. Never fetched by the controller.
    fn download_url(&self, task_id: &TaskId) -> String;
}

/// [`ConversionApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpConversionApi {
    client: reqwest::Client,
    base_url: Url,
    upload_timeout: Duration,
    status_timeout: Duration,
}

impl HttpConversionApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Self::with_client(client, config)
    }

    /// Reuse an existing reqwest client (connection pool, proxies, TLS roots).
    pub fn with_client(client: reqwest::Client, config: &ClientConfig) -> Result<Self, ClientError> {
        Ok(Self {
            client,
            base_url: config.parsed_base_url()?,
            upload_timeout: Duration::from_secs(config.upload_timeout_secs),
            status_timeout: Duration::from_secs(config.status_timeout_secs),
        })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// `base/segment/...` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[async_trait]
impl ConversionApi for HttpConversionApi {
    async fn upload(&self, file: &AudioFile) -> Result<TaskId, SessionError> {
        let url = self.endpoint(&["upload"]);
        info!("Uploading '{}' ({} bytes) to {}", file.name(), file.size(), url);

        let bytes = file
            .read_bytes()
            .await
            .map_err(|e| SessionError::upload(e.to_string()))?;

        let part = Part::bytes(bytes)
            .file_name(file.name().to_string())
            .mime_str(file.media_type().unwrap_or("application/octet-stream"))
            .map_err(|e| SessionError::upload(e.to_string()))?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .timeout(self.upload_timeout)
            .send()
            .await
            .map_err(|e| SessionError::upload(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SessionError::upload(e.to_string()))?;

        let task_id = parse_upload_response(status, &body)?;
        info!("Upload accepted, task {}", task_id);
        Ok(task_id)
    }

    async fn status(&self, task_id: &TaskId) -> Result<StatusReport, SessionError> {
        let url = self.endpoint(&["status", task_id.as_str()]);

        let response = self
            .client
            .get(url)
            .timeout(self.status_timeout)
            .send()
            .await
            .map_err(|e| SessionError::poll(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::poll(http_status_message(status)));
        }

        let report = response
            .json::<StatusReport>()
            .await
            .map_err(|e| SessionError::poll(e.to_string()))?;
        debug!("Task {}: {:?} {:?}", task_id, report.status, report.progress);
        Ok(report)
    }

    fn download_url(&self, task_id: &TaskId) -> String {
        self.endpoint(&["download", task_id.as_str()]).to_string()
    }
}

/// Interpret an upload response body.
pub fn parse_upload_response(status: StatusCode, body: &str) -> Result<TaskId, SessionError> {
    let parsed = serde_json::from_str::<UploadResponse>(body);

    if !status.is_success() {
        let message = parsed
            .ok()
            .and_then(|r| r.error)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| http_status_message(status));
        return Err(SessionError::upload(message));
    }

    let parsed = parsed.map_err(|e| SessionError::upload(e.to_string()))?;
    if let Some(error) = parsed.error.filter(|m| !m.is_empty()) {
        return Err(SessionError::upload(error));
    }

    match parsed.task_id.filter(|id| !id.is_empty()) {
        Some(id) => Ok(TaskId::new(id)),
        None => Err(SessionError::upload("No task ID returned from server")),
    }
}

fn http_status_message(status: StatusCode) -> String {
    format!("HTTP error! Status: {}", status.as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::report::TaskStatus;
    use crate::testing::CannedServer;

    fn api(base: &str) -> HttpConversionApi {
        let config = ClientConfig::builder().base_url(base).build().unwrap();
        HttpConversionApi::new(&config).unwrap()
    }

    /// Client for a local canned server; proxies from the environment are ignored.
    fn local_api(server: &CannedServer) -> HttpConversionApi {
        let config = ClientConfig::builder()
            .base_url(server.base_url.as_str())
            .build()
            .unwrap();
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        HttpConversionApi::with_client(client, &config).unwrap()
    }

    #[tokio::test]
    async fn upload_posts_multipart_audiofile_field() {
        let server = CannedServer::start(200, r#"{"task_id":"abc"}"#).await;
        let api = local_api(&server);
        let file = AudioFile::from_bytes("take.wav", b"RIFF0000WAVE".to_vec())
            .with_media_type("audio/wav");

        let task_id = api.upload(&file).await.unwrap();
        assert_eq!(task_id, TaskId::new("abc"));

        let request = server.request().await;
        assert!(request.starts_with("POST /upload "), "{request}");
        assert!(request.to_ascii_lowercase().contains("content-type: multipart/form-data"));
        assert!(request.contains(r#"name="audiofile"; filename="take.wav""#), "{request}");
        assert!(request.contains("RIFF0000WAVE"));
    }

    #[tokio::test]
    async fn upload_rejection_surfaces_server_error() {
        let server = CannedServer::start(400, r#"{"error":"bad format"}"#).await;
        let api = local_api(&server);

        let err = api
            .upload(&AudioFile::from_bytes("take.mp3", vec![1; 8]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Upload failed: bad format");
    }

    #[tokio::test]
    async fn status_requests_task_path() {
        let server = CannedServer::start(200, r#"{"status":"processing","progress":40}"#).await;
        let api = local_api(&server);

        let report = api.status(&TaskId::new("abc")).await.unwrap();
        assert_eq!(report.status, TaskStatus::Processing);
        assert_eq!(report.progress_percent(), 40);
        assert!(server.request().await.starts_with("GET /status/abc "));
    }

    #[tokio::test]
    async fn status_non_success_is_poll_error() {
        let server = CannedServer::start(404, "").await;
        let api = local_api(&server);

        let err = api.status(&TaskId::new("abc")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PollTransport);
        assert_eq!(err.to_string(), "Error checking status: HTTP error! Status: 404");
    }

    #[tokio::test]
    async fn status_garbage_body_is_poll_error() {
        let server = CannedServer::start(200, "<html>gateway</html>").await;
        let api = local_api(&server);

        let err = api.status(&TaskId::new("abc")).await.unwrap_err();
        assert!(matches!(err, SessionError::PollTransport { .. }));
        assert!(err.to_string().starts_with("Error checking status: "));
    }

    #[tokio::test]
    async fn status_null_keeps_task_open() {
        let server = CannedServer::start(200, r#"{"status":null}"#).await;
        let api = local_api(&server);

        let report = api.status(&TaskId::new("abc")).await.unwrap();
        assert_eq!(report.status, TaskStatus::Other);
        assert!(!report.status.is_terminal());
    }

    #[test]
    fn upload_success() {
        let id = parse_upload_response(StatusCode::OK, r#"{"task_id":"abc"}"#).unwrap();
        assert_eq!(id, TaskId::new("abc"));
    }

    #[test]
    fn upload_error_payload_is_surfaced() {
        let err = parse_upload_response(StatusCode::BAD_REQUEST, r#"{"error":"bad format"}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "Upload failed: bad format");
    }

    #[test]
    fn upload_error_without_body_uses_status() {
        let err = parse_upload_response(StatusCode::PAYLOAD_TOO_LARGE, "").unwrap_err();
        assert_eq!(err.to_string(), "Upload failed: HTTP error! Status: 413");

        let err = parse_upload_response(StatusCode::BAD_GATEWAY, "<html>oops</html>").unwrap_err();
        assert_eq!(err.to_string(), "Upload failed: HTTP error! Status: 502");
    }

    #[test]
    fn upload_success_without_task_id() {
        let err = parse_upload_response(StatusCode::OK, "{}").unwrap_err();
        assert_eq!(err.to_string(), "Upload failed: No task ID returned from server");

        let err = parse_upload_response(StatusCode::OK, r#"{"task_id":""}"#).unwrap_err();
        assert_eq!(err.to_string(), "Upload failed: No task ID returned from server");
    }

    #[test]
    fn upload_success_with_error_field() {
        let err = parse_upload_response(StatusCode::OK, r#"{"error":"disk full","task_id":"x"}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "Upload failed: disk full");
    }

    #[test]
    fn upload_success_with_garbage_body() {
        let err = parse_upload_response(StatusCode::OK, "not json").unwrap_err();
        assert!(matches!(err, SessionError::Upload { .. }));
    }

    #[test]
    fn endpoints_append_to_base_path() {
        let a = api("http://localhost:5000");
        assert_eq!(a.endpoint(&["upload"]).as_str(), "http://localhost:5000/upload");
        assert_eq!(
            a.download_url(&TaskId::new("abc")),
            "http://localhost:5000/download/abc"
        );

        let a = api("https://example.com/audio/");
        assert_eq!(
            a.endpoint(&["status", "t 1"]).as_str(),
            "https://example.com/audio/status/t%201"
        );
    }
}
