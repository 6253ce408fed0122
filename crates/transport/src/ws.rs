use cointel_session::{Connection, ConnectionFactory, SessionError, SessionEvent, SessionResult};
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;

use crate::EventSender;

/// Opens WebSocket connections on the current tokio runtime.
pub struct WsConnectionFactory {
    events: EventSender,
}

impl WsConnectionFactory {
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }
}

impl ConnectionFactory for WsConnectionFactory {
    fn open(&mut self, endpoint: &str) -> SessionResult<Box<dyn Connection>> {
        let request =
            endpoint
                .into_client_request()
                .map_err(|source| SessionError::OpenConnection {
                    stage: "build-ws-request",
                    endpoint: endpoint.to_string(),
                    details: source.to_string(),
                })?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        tokio::spawn(run_connection(
            request,
            outbound_rx,
            cancel_rx,
            self.events.clone(),
        ));

        Ok(Box::new(WsConnection {
            outbound: outbound_tx,
            cancel_tx: Some(cancel_tx),
        }))
    }
}

/// Session-side handle to one socket task.
///
/// Closing or dropping the handle stops the task and sends a close frame;
/// no `ConnectionClosed` event is emitted for a local close.
pub struct WsConnection {
    outbound: mpsc::UnboundedSender<String>,
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl Connection for WsConnection {
    fn send_text(&mut self, payload: String) -> SessionResult<()> {
        self.outbound
            .send(payload)
            .map_err(|_| SessionError::SendRejected {
                stage: "queue-ws-frame",
                details: "socket task has stopped".to_string(),
            })
    }

    fn close(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            let _ = cancel_tx.send(());
        }
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_connection(
    request: Request,
    mut outbound: mpsc::UnboundedReceiver<String>,
    mut cancel_rx: oneshot::Receiver<()>,
    events: EventSender,
) {
    let endpoint = request.uri().to_string();
    let stream = tokio::select! {
        _ = &mut cancel_rx => {
            tracing::debug!(%endpoint, "connect cancelled");
            return;
        }
        result = connect_async(request) => match result {
            Ok((stream, _response)) => stream,
            Err(error) => {
                tracing::warn!(%endpoint, %error, "websocket connect failed");
                let _ = events.send(SessionEvent::TransportError(error.to_string()));
                return;
            }
        },
    };

    tracing::info!(%endpoint, "websocket connected");
    let _ = events.send(SessionEvent::ConnectionOpened);
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            _ = &mut cancel_rx => {
                if let Err(error) = write.send(WsMessage::Close(None)).await {
                    tracing::debug!(%error, "close frame not delivered");
                }
                return;
            }
            outgoing = outbound.recv() => {
                let Some(text) = outgoing else {
                    return;
                };
                if let Err(error) = write.send(WsMessage::Text(text)).await {
                    tracing::warn!(%endpoint, %error, "websocket send failed");
                    let _ = events.send(SessionEvent::TransportError(error.to_string()));
                    return;
                }
            }
            incoming = read.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => {
                    let _ = events.send(SessionEvent::MessageReceived(text));
                }
                Some(Ok(WsMessage::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => {
                        let _ = events.send(SessionEvent::MessageReceived(text));
                    }
                    Err(_) => tracing::debug!("ignoring non-utf8 binary frame"),
                },
                Some(Ok(WsMessage::Close(frame))) => {
                    tracing::info!(%endpoint, ?frame, "websocket closed by server");
                    let _ = events.send(SessionEvent::ConnectionClosed);
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    tracing::warn!(%endpoint, %error, "websocket read failed");
                    let _ = events.send(SessionEvent::TransportError(error.to_string()));
                    return;
                }
                None => {
                    tracing::info!(%endpoint, "websocket stream ended");
                    let _ = events.send(SessionEvent::ConnectionClosed);
                    return;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::net::TcpListener;

    use super::*;
    use crate::{EventReceiver, event_channel};

    async fn next_event(inbox: &mut EventReceiver) -> SessionEvent {
        tokio::time::timeout(Duration::from_secs(5), inbox.recv())
            .await
            .expect("event within timeout")
            .expect("channel open")
    }

    /// Answers every text frame with `{"content": "echo: <content>"}`.
    async fn echo_server() -> (String, tokio::task::JoinHandle<bool>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
            while let Some(Ok(message)) = ws.next().await {
                match message {
                    WsMessage::Text(text) => {
                        let request: serde_json::Value = serde_json::from_str(&text).unwrap();
                        let reply = serde_json::json!({
                            "role": "assistant",
                            "content": format!("echo: {}", request["content"].as_str().unwrap()),
                        });
                        ws.send(WsMessage::Text(reply.to_string())).await.unwrap();
                    }
                    WsMessage::Close(_) => return true,
                    _ => {}
                }
            }
            false
        });
        (format!("ws://{address}/chat"), server)
    }

    #[tokio::test]
    async fn round_trip_through_echo_server() {
        let (url, server) = echo_server().await;
        let (events, mut inbox) = event_channel();
        let mut factory = WsConnectionFactory::new(events);

        let mut connection = factory.open(&url).unwrap();
        assert_eq!(next_event(&mut inbox).await, SessionEvent::ConnectionOpened);

        connection
            .send_text(r#"{"role":"user","content":"ping"}"#.to_string())
            .unwrap();
        let SessionEvent::MessageReceived(raw) = next_event(&mut inbox).await else {
            panic!("expected a reply frame");
        };
        let reply = cointel_session::InboundReply::decode(&raw).unwrap();
        assert_eq!(reply.content, "echo: ping");

        connection.close();
        let saw_close = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert!(saw_close);
    }

    #[tokio::test]
    async fn refused_connection_reports_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let (events, mut inbox) = event_channel();
        let mut factory = WsConnectionFactory::new(events);
        let _connection = factory.open(&format!("ws://{address}/chat")).unwrap();

        assert!(matches!(
            next_event(&mut inbox).await,
            SessionEvent::TransportError(_)
        ));
    }

    #[tokio::test]
    async fn server_close_reports_connection_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
            ws.close(None).await.unwrap();
            while ws.next().await.is_some() {}
        });

        let (events, mut inbox) = event_channel();
        let mut factory = WsConnectionFactory::new(events);
        let _connection = factory.open(&format!("ws://{address}/chat")).unwrap();

        assert_eq!(next_event(&mut inbox).await, SessionEvent::ConnectionOpened);
        assert_eq!(next_event(&mut inbox).await, SessionEvent::ConnectionClosed);
    }

    #[test]
    fn malformed_endpoint_is_rejected_up_front() {
        let (events, _inbox) = event_channel();
        let mut factory = WsConnectionFactory::new(events);

        let error = factory.open("not a url").err().unwrap();
        assert!(matches!(error, SessionError::OpenConnection { .. }));
    }
}
