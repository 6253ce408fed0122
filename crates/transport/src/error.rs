use std::path::PathBuf;

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TransportError {
    #[snafu(display("failed to read upload file {path:?} on `{stage}`: {source}"))]
    ReadFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("invalid mime type for {path:?} on `{stage}`: {source}"))]
    BuildPart {
        stage: &'static str,
        path: PathBuf,
        source: reqwest::Error,
    },
    #[snafu(display("upload request to '{url}' failed on `{stage}`: {source}"))]
    SendUpload {
        stage: &'static str,
        url: String,
        source: reqwest::Error,
    },
    #[snafu(display("upload endpoint '{url}' returned status {status}: {body}"))]
    UploadStatus {
        stage: &'static str,
        url: String,
        status: u16,
        body: String,
    },
}

pub type TransportResult<T> = Result<T, TransportError>;
