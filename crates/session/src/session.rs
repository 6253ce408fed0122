use crate::connection::{Connection, ConnectionFactory, ConnectionState};
use crate::event::{RequestId, SessionEvent};
use crate::input::{InputEditor, KeyOutcome};
use crate::notification::Notification;
use crate::payload::{InboundReply, OutboundMessage};
use crate::transcript::Transcript;
use crate::turn::ChatTurn;
use crate::upload::UploadGate;

pub const DEFAULT_CHAT_ENDPOINT: &str = "ws://localhost:8697/chat";
/// Assistant turn appended when a message is sent before any upload.
pub const UPLOAD_REQUIRED_MESSAGE: &str = "Please upload your file to proceed";
pub const CONNECTION_ERROR_MESSAGE: &str = "WebSocket connection error. Please try again later.";
pub const REPLY_TIMEOUT_MESSAGE: &str = "No reply received from the assistant. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub chat_endpoint: String,
    /// Drop a closed connection and open a fresh one on the next upload.
    pub reconnect_on_upload: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chat_endpoint: DEFAULT_CHAT_ENDPOINT.to_string(),
            reconnect_on_upload: false,
        }
    }
}

/// Aggregate owning every piece of dashboard state, including the one
/// live connection.
///
/// All mutation goes through [`ChatSession::handle`], which the host calls
/// from a single event loop. Dropping the session closes the connection.
pub struct ChatSession {
    config: SessionConfig,
    factory: Box<dyn ConnectionFactory>,
    connection: Option<Box<dyn Connection>>,
    connection_state: ConnectionState,
    upload_gate: UploadGate,
    transcript: Transcript,
    editor: InputEditor,
    pending: Option<RequestId>,
    next_request_id: u64,
    notifications: Vec<Notification>,
}

impl ChatSession {
    pub fn new(factory: Box<dyn ConnectionFactory>, config: SessionConfig) -> Self {
        Self {
            config,
            factory,
            connection: None,
            connection_state: ConnectionState::Closed,
            upload_gate: UploadGate::new(),
            transcript: Transcript::new(),
            editor: InputEditor::new(),
            pending: None,
            next_request_id: 1,
            notifications: Vec::new(),
        }
    }

    /// Applies one event. This is the only state-transition entry point.
    pub fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::UploadSucceeded { file_name } => self.on_upload_succeeded(file_name),
            SessionEvent::UploadFailed { file_name } => {
                tracing::warn!(file_name = %file_name, "file upload failed");
                self.notify(Notification::error(format!(
                    "{file_name} file upload failed."
                )));
            }
            SessionEvent::DraftChanged(text) => self.editor.on_draft_change(text),
            SessionEvent::KeyPressed(press) => {
                if self.editor.on_key(press) == KeyOutcome::Submit {
                    self.submit();
                }
            }
            SessionEvent::Submit => self.submit(),
            SessionEvent::Reset => self.transcript.reset(),
            SessionEvent::ConnectionOpened => self.on_connection_opened(),
            SessionEvent::MessageReceived(raw) => self.on_message_received(&raw),
            SessionEvent::TransportError(reason) => self.on_transport_error(&reason),
            SessionEvent::ConnectionClosed => {
                tracing::info!("chat connection closed");
                self.connection_state = ConnectionState::Closed;
            }
            SessionEvent::ReplyTimedOut(request_id) => self.on_reply_timed_out(request_id),
        }
    }

    /// Closes the connection, if any. Called when the dashboard goes away.
    pub fn shutdown(&mut self) {
        self.release_connection();
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn editor(&self) -> &InputEditor {
        &self.editor
    }

    pub fn is_uploaded(&self) -> bool {
        self.upload_gate.is_open()
    }

    pub fn accepted_files(&self) -> &[String] {
        self.upload_gate.accepted_files()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Outstanding request the host should arm a reply timer for.
    pub fn pending_request(&self) -> Option<RequestId> {
        self.pending
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    /// Drains queued notifications in the order they were raised.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    fn on_upload_succeeded(&mut self, file_name: String) {
        let first = self.upload_gate.record_success(file_name.clone());
        tracing::info!(file_name = %file_name, first, "file uploaded");
        self.notify(Notification::success(format!(
            "{file_name} file uploaded successfully."
        )));
        self.open_connection();
    }

    fn open_connection(&mut self) {
        if self.connection.is_some() {
            let reconnect =
                self.config.reconnect_on_upload && self.connection_state == ConnectionState::Closed;
            if !reconnect {
                tracing::debug!(state = ?self.connection_state, "connection already recorded");
                return;
            }
            tracing::info!("replacing closed chat connection");
            self.release_connection();
        }

        match self.factory.open(&self.config.chat_endpoint) {
            Ok(connection) => {
                tracing::info!(endpoint = %self.config.chat_endpoint, "opening chat connection");
                self.connection = Some(connection);
                self.connection_state = ConnectionState::Opening;
            }
            Err(error) => {
                tracing::warn!(endpoint = %self.config.chat_endpoint, %error, "failed to open chat connection");
                self.notify(Notification::error(CONNECTION_ERROR_MESSAGE));
            }
        }
    }

    fn release_connection(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close();
            tracing::info!("chat connection released");
        }
        self.connection_state = ConnectionState::Closed;
    }

    fn on_connection_opened(&mut self) {
        if self.connection.is_none() {
            tracing::debug!("ignoring open notice without a recorded connection");
            return;
        }
        tracing::info!("chat connection established");
        self.connection_state = ConnectionState::Open;
    }

    /// `pending` is only set once a payload reaches an open connection; a
    /// dropped send has no reply to wait for.
    fn submit(&mut self) {
        if !self.editor.has_submittable_draft() {
            return;
        }

        if !self.upload_gate.is_open() {
            self.transcript
                .append(ChatTurn::assistant(UPLOAD_REQUIRED_MESSAGE));
            self.editor.collapse();
            return;
        }

        let draft = self.editor.take_draft();
        let turn = ChatTurn::user(&draft);
        let delivered = self.deliver(&turn);
        self.transcript.append(turn);

        if delivered {
            let request_id = RequestId::new(self.next_request_id);
            self.next_request_id += 1;
            self.pending = Some(request_id);
        }
    }

    /// Hands the turn to the open connection. Failures are dropped silently.
    fn deliver(&mut self, turn: &ChatTurn) -> bool {
        if !self.connection_state.is_open() {
            tracing::warn!(state = ?self.connection_state, "chat connection not open, message dropped");
            return false;
        }
        let Some(connection) = self.connection.as_mut() else {
            return false;
        };

        let payload = match OutboundMessage::from_turn(turn).encode() {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(%error, "message dropped");
                return false;
            }
        };

        match connection.send_text(payload) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(%error, "message dropped");
                false
            }
        }
    }

    fn on_message_received(&mut self, raw: &str) {
        self.pending = None;
        match InboundReply::decode(raw) {
            Ok(reply) => self.transcript.append(reply.into_turn()),
            Err(error) => {
                tracing::warn!(%error, "discarding malformed reply");
                self.notify(Notification::error(format!(
                    "Received a malformed reply: {error}"
                )));
            }
        }
    }

    fn on_transport_error(&mut self, reason: &str) {
        tracing::error!(reason, "chat connection error");
        self.notify(Notification::error(CONNECTION_ERROR_MESSAGE));
        self.pending = None;
        self.connection_state = ConnectionState::Closed;
    }

    fn on_reply_timed_out(&mut self, request_id: RequestId) {
        if self.pending != Some(request_id) {
            tracing::debug!(?request_id, "ignoring stale reply timeout");
            return;
        }
        tracing::warn!(?request_id, "reply timed out");
        self.pending = None;
        self.notify(Notification::error(REPLY_TIMEOUT_MESSAGE));
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.release_connection();
    }
}
