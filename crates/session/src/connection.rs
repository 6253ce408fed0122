use crate::error::SessionResult;

/// Lifecycle of the single duplex chat connection.
///
/// `Closed -> Opening -> Open -> Closed`; there is no reconnect edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Closed,
    Opening,
    Open,
}

impl ConnectionState {
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Live duplex channel owned by the session.
///
/// Implementations must not block: `send_text` only queues the frame.
pub trait Connection: Send {
    fn send_text(&mut self, payload: String) -> SessionResult<()>;
    fn close(&mut self);
}

/// Capability that establishes connections to the chat endpoint.
///
/// Inbound traffic and lifecycle changes are reported back to the host as
/// [`crate::SessionEvent`]s through whatever channel the factory was built
/// with.
pub trait ConnectionFactory: Send {
    fn open(&mut self, endpoint: &str) -> SessionResult<Box<dyn Connection>>;
}
