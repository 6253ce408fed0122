#![deny(unsafe_code)]

//! Upload-gated chat session controller.
//!
//! The crate is transport-agnostic: the host feeds [`SessionEvent`]s into
//! [`ChatSession::handle`] and drains notifications, while the live
//! connection is created through an injected [`ConnectionFactory`].

pub mod connection;
pub mod error;
pub mod event;
pub mod input;
pub mod markdown;
pub mod notification;
pub mod payload;
pub mod session;
pub mod transcript;
pub mod turn;
pub mod upload;

pub use connection::{Connection, ConnectionFactory, ConnectionState};
pub use error::{SessionError, SessionResult};
pub use event::{RequestId, SessionEvent};
pub use input::{InputEditor, Key, KeyOutcome, KeyPress, Modifiers, MAX_VISUAL_ROWS};
pub use markdown::{render_markdown, render_transcript};
pub use notification::{Notification, NotificationLevel};
pub use payload::{InboundReply, OutboundMessage};
pub use session::{
    CONNECTION_ERROR_MESSAGE, ChatSession, DEFAULT_CHAT_ENDPOINT, REPLY_TIMEOUT_MESSAGE,
    SessionConfig, UPLOAD_REQUIRED_MESSAGE,
};
pub use transcript::Transcript;
pub use turn::{ChatTurn, Role, normalize_line_breaks};
pub use upload::UploadGate;
