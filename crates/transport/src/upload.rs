use std::path::{Path, PathBuf};

use cointel_session::SessionEvent;
use reqwest::multipart::{Form, Part};
use snafu::ResultExt;
use tokio::task::JoinHandle;

use crate::EventSender;
use crate::error::{
    BuildPartSnafu, ReadFileSnafu, SendUploadSnafu, TransportResult, UploadStatusSnafu,
};

pub const DEFAULT_UPLOAD_ENDPOINT: &str = "http://localhost:8697/upload-files";
/// Multipart field name the backend reads files from.
pub const UPLOAD_FIELD_NAME: &str = "files";

/// Posts files to the upload endpoint, one request per file.
///
/// Outcomes are reported per file; there is no retry.
#[derive(Clone)]
pub struct FileUploader {
    client: reqwest::Client,
    endpoint: String,
    events: EventSender,
}

impl FileUploader {
    pub fn new(endpoint: impl Into<String>, events: EventSender) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            events,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Uploads in the background and reports the outcome as a session event.
    pub fn spawn_upload(&self, path: PathBuf) -> JoinHandle<()> {
        let uploader = self.clone();
        tokio::spawn(async move {
            let file_name = display_name(&path);
            let event = match uploader.upload(&path).await {
                Ok(()) => SessionEvent::UploadSucceeded { file_name },
                Err(error) => {
                    tracing::warn!(path = ?path, %error, "upload failed");
                    SessionEvent::UploadFailed { file_name }
                }
            };
            if uploader.events.send(event).is_err() {
                tracing::debug!("event loop gone, upload outcome dropped");
            }
        })
    }

    pub async fn upload(&self, path: &Path) -> TransportResult<()> {
        let bytes = tokio::fs::read(path).await.context(ReadFileSnafu {
            stage: "read-upload-file",
            path: path.to_path_buf(),
        })?;
        let size = bytes.len();
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        let part = Part::bytes(bytes)
            .file_name(display_name(path))
            .mime_str(mime.essence_str())
            .context(BuildPartSnafu {
                stage: "build-upload-part",
                path: path.to_path_buf(),
            })?;
        let form = Form::new().part(UPLOAD_FIELD_NAME, part);

        tracing::info!(path = ?path, size, endpoint = %self.endpoint, "uploading file");
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .context(SendUploadSnafu {
                stage: "send-upload-request",
                url: self.endpoint.clone(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return UploadStatusSnafu {
                stage: "upload-http-status",
                url: self.endpoint.clone(),
                status: status.as_u16(),
                body,
            }
            .fail();
        }

        Ok(())
    }
}

/// Name reported back to the user for a file path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::event_channel;

    /// Accepts one request, drains the multipart body and answers with `status_line`.
    async fn one_shot_server(status_line: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buffer = [0u8; 4096];
            while !request.ends_with(b"--\r\n") {
                let read = socket.read(&mut buffer).await.unwrap();
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buffer[..read]);
            }
            let response =
                format!("{status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (format!("http://{address}/upload-files"), server)
    }

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cointel-upload-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn accepted_upload_reports_success_with_file_name() {
        let (url, server) = one_shot_server("HTTP/1.1 200 OK").await;
        let (events, mut inbox) = event_channel();
        let uploader = FileUploader::new(url, events);
        let path = temp_file("report.pdf", "%PDF-1.4 fixture");

        uploader.spawn_upload(path).await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), inbox.recv())
            .await
            .unwrap();
        assert_eq!(
            event,
            Some(SessionEvent::UploadSucceeded {
                file_name: "report.pdf".to_string()
            })
        );

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /upload-files"));
        assert!(request.contains("name=\"files\"; filename=\"report.pdf\""));
        assert!(request.contains("application/pdf"));
        assert!(request.contains("%PDF-1.4 fixture"));
    }

    #[tokio::test]
    async fn rejected_upload_reports_failure() {
        let (url, server) = one_shot_server("HTTP/1.1 500 Internal Server Error").await;
        let (events, mut inbox) = event_channel();
        let uploader = FileUploader::new(url, events);
        let path = temp_file("broken.pdf", "nope");

        uploader.spawn_upload(path).await.unwrap();
        server.await.unwrap();

        assert_eq!(
            inbox.recv().await,
            Some(SessionEvent::UploadFailed {
                file_name: "broken.pdf".to_string()
            })
        );
    }

    #[tokio::test]
    async fn missing_file_fails_without_network() {
        let (events, mut inbox) = event_channel();
        let uploader = FileUploader::new("http://127.0.0.1:9/upload-files", events);
        let path = std::env::temp_dir().join("cointel-definitely-missing.pdf");

        let error = uploader.upload(&path).await.unwrap_err();
        assert!(matches!(error, crate::TransportError::ReadFile { .. }));

        uploader.spawn_upload(path).await.unwrap();
        assert_eq!(
            inbox.recv().await,
            Some(SessionEvent::UploadFailed {
                file_name: "cointel-definitely-missing.pdf".to_string()
            })
        );
    }
}
