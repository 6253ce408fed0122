#![deny(unsafe_code)]

//! Network collaborators for the chat session: the WebSocket connection
//! factory and the multipart file uploader. Both report back to the host
//! event loop as [`cointel_session::SessionEvent`]s.

pub mod error;
pub mod upload;
pub mod ws;

use cointel_session::SessionEvent;
use tokio::sync::mpsc;

pub use error::{TransportError, TransportResult};
pub use upload::{DEFAULT_UPLOAD_ENDPOINT, FileUploader, UPLOAD_FIELD_NAME};
pub use ws::{WsConnection, WsConnectionFactory};

/// Sending half of the host event loop's inbox.
pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
