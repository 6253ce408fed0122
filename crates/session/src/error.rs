use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SessionError {
    #[snafu(display("reply payload is malformed on `{stage}`: {source}"))]
    MalformedPayload {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to encode outbound message on `{stage}`: {source}"))]
    EncodePayload {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to open connection to '{endpoint}' on `{stage}`: {details}"))]
    OpenConnection {
        stage: &'static str,
        endpoint: String,
        details: String,
    },
    #[snafu(display("connection rejected outbound message on `{stage}`: {details}"))]
    SendRejected {
        stage: &'static str,
        details: String,
    },
}

pub type SessionResult<T> = Result<T, SessionError>;
