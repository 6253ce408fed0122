use crate::input::KeyPress;

/// Identifier for one outstanding reply request.
///
/// Changes on every send so a late timeout for an answered request can be
/// told apart from the active one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl RequestId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Everything that can happen to a session, in event-loop order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The file-transfer collaborator accepted one file.
    UploadSucceeded { file_name: String },
    /// The file-transfer collaborator gave up on one file.
    UploadFailed { file_name: String },
    DraftChanged(String),
    KeyPressed(KeyPress),
    /// Explicit send button press.
    Submit,
    /// "Chats" button: start over with an empty transcript.
    Reset,
    ConnectionOpened,
    /// Raw text frame received from the chat endpoint.
    MessageReceived(String),
    TransportError(String),
    ConnectionClosed,
    ReplyTimedOut(RequestId),
}
