//! WebSocket transport and its I/O loop.
//!
//! # Event Loop
//!
//! The transport spawns a tokio task that handles:
//!
//! - Inbound text messages, decoded and published to subscribers
//! - Outbound frames queued by [`Transport::send`]
//! - Shutdown on [`Transport::close`] or remote close
//!
//! Frames that fail to decode are logged and dropped; the loop keeps
//! running.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::{FrameCodec, RequestFrame};

use super::replay::ReplayChannel;
use super::{FrameStream, Transport};

// ============================================================================
// Constants
// ============================================================================

/// Default number of inbound frames replayed to late subscribers.
pub const DEFAULT_FRAMES_BUFFER_SIZE: usize = 128;

// ============================================================================
// TransportCommand
// ============================================================================

/// Internal commands for the event loop.
enum TransportCommand {
    /// Write one encoded frame.
    Send {
        text: String,
        ack: oneshot::Sender<Result<()>>,
    },
    /// Close the socket.
    Shutdown,
}

// ============================================================================
// DirectTransport
// ============================================================================

/// Transport bound to one WebSocket.
///
/// # Thread Safety
///
/// `DirectTransport` is `Send + Sync`. Share it behind `Arc<dyn Transport>`.
pub struct DirectTransport {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<TransportCommand>,
    /// Inbound frames (shared with event loop).
    frames: Arc<ReplayChannel>,
    /// Set once closed locally or by the remote.
    closed: Arc<AtomicBool>,
}

impl DirectTransport {
    /// Opens a WebSocket to `url` and starts the event loop.
    ///
    /// # Arguments
    ///
    /// * `url` - `ws://` or `wss://` endpoint
    /// * `frames_buffer_size` - Frames replayed to late subscribers
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the handshake fails.
    pub async fn connect(url: &str, frames_buffer_size: usize) -> Result<Self> {
        debug!(url, "Opening WebSocket");

        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| Error::connection(format!("{url}: {e}")))?;

        info!(url, "WebSocket connection established");

        Ok(Self::from_stream(ws_stream, frames_buffer_size))
    }

    /// Wraps an established WebSocket and spawns the event loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_stream<S>(ws_stream: WebSocketStream<S>, frames_buffer_size: usize) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let frames = Arc::new(ReplayChannel::new(frames_buffer_size));
        let closed = Arc::new(AtomicBool::new(false));

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            Arc::clone(&frames),
            Arc::clone(&closed),
        ));

        Self {
            command_tx,
            frames,
            closed,
        }
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop<S>(
        ws_stream: WebSocketStream<S>,
        mut command_rx: mpsc::UnboundedReceiver<TransportCommand>,
        frames: Arc<ReplayChannel>,
        closed: Arc<AtomicBool>,
    ) where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_incoming_message(&text, &frames);
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            warn!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                command = command_rx.recv() => {
                    match command {
                        Some(TransportCommand::Send { text, ack }) => {
                            let result = ws_write
                                .send(Message::Text(text.into()))
                                .await
                                .map_err(Error::from);
                            let _ = ack.send(result);
                        }

                        Some(TransportCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            let _ = ws_write.close().await;
                            break;
                        }
                    }
                }
            }
        }

        closed.store(true, Ordering::Release);
        if frames.complete() {
            debug!("Frame stream completed");
        }

        debug!("Event loop terminated");
    }

    /// Decodes one inbound text message and publishes it.
    fn handle_incoming_message(text: &str, frames: &ReplayChannel) {
        match FrameCodec::decode(text) {
            Ok(frame) => {
                trace!(id = ?frame.id(), event = frame.is_event(), "Frame received");
                frames.publish(Arc::new(frame));
            }
            Err(e) => {
                warn!(error = %e, "Dropping undecodable frame");
            }
        }
    }
}

#[async_trait]
impl Transport for DirectTransport {
    async fn send(&self, frame: &RequestFrame) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }

        let text = FrameCodec::encode(frame)?;
        let (ack_tx, ack_rx) = oneshot::channel();

        self.command_tx
            .send(TransportCommand::Send { text, ack: ack_tx })
            .map_err(|_| Error::ConnectionClosed)?;

        ack_rx.await.map_err(|_| Error::ConnectionClosed)??;

        trace!(request_id = %frame.id, method = %frame.method, "Frame sent");
        Ok(())
    }

    fn frames(&self) -> FrameStream {
        self.frames.subscribe()
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("Closing WebSocket transport");
        }

        let _ = self.command_tx.send(TransportCommand::Shutdown);

        if self.frames.complete() {
            debug!("Frame stream completed");
        }
    }

    #[inline]
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for DirectTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectTransport")
            .field("frames", &self.frames)
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::RequestId;
    use crate::protocol::ResponseFrame;
    use serde_json::{Value, json};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accepts one client and answers each call with `{"echo": method}`.
    ///
    /// `Test.garbage` is preceded by an undecodable frame.
    async fn echo_server() -> (String, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            while let Some(Ok(message)) = ws.next().await {
                match message {
                    Message::Text(text) => {
                        let request: Value = serde_json::from_str(&text).unwrap();
                        if request["method"] == "Test.garbage" {
                            ws.send(Message::Text(r#"{"foo":1}"#.into())).await.unwrap();
                        }
                        let reply = json!({"id": request["id"], "result": {"echo": request["method"]}});
                        ws.send(Message::Text(reply.to_string().into())).await.unwrap();
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        });

        (format!("ws://{addr}/devtools/browser/test"), handle)
    }

    fn request(id: u64, method: &str) -> RequestFrame {
        RequestFrame::new(RequestId::new(id), None, method, json!({}))
    }

    async fn reply_to(frames: &mut FrameStream, id: u64) -> Value {
        loop {
            let frame = frames.next().await.expect("stream ended");
            if frame.id() == Some(RequestId::new(id)) {
                return match frame.as_ref() {
                    ResponseFrame::Result(result) => result.result.clone(),
                    other => panic!("unexpected frame: {other:?}"),
                };
            }
        }
    }

    #[tokio::test]
    async fn test_send_and_receive() {
        let (url, _server) = echo_server().await;
        let transport = DirectTransport::connect(&url, 16).await.unwrap();

        let mut frames = transport.frames();
        transport.send(&request(1, "Test.ping")).await.unwrap();

        assert_eq!(reply_to(&mut frames, 1).await, json!({"echo": "Test.ping"}));
    }

    #[tokio::test]
    async fn test_undecodable_frame_is_dropped() {
        let (url, _server) = echo_server().await;
        let transport = DirectTransport::connect(&url, 16).await.unwrap();

        let mut frames = transport.frames();
        transport.send(&request(1, "Test.garbage")).await.unwrap();

        let first = frames.next().await.expect("reply");
        assert_eq!(first.id(), Some(RequestId::new(1)));
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_replay() {
        let (url, _server) = echo_server().await;
        let transport = DirectTransport::connect(&url, 16).await.unwrap();

        let mut frames = transport.frames();
        transport.send(&request(1, "Test.ping")).await.unwrap();
        reply_to(&mut frames, 1).await;

        let mut late = transport.frames();
        assert_eq!(reply_to(&mut late, 1).await, json!({"echo": "Test.ping"}));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (url, _server) = echo_server().await;
        let transport = DirectTransport::connect(&url, 16).await.unwrap();
        let frames = transport.frames();

        tokio::join!(transport.close(), transport.close());
        transport.close().await;

        assert!(transport.is_closed());
        assert!(!transport.frames.complete());
        assert_eq!(frames.count().await, 0);

        let err = transport.send(&request(1, "Test.ping")).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_remote_close_ends_frames() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let _ = ws.close(None).await;
        });

        let transport = DirectTransport::connect(&format!("ws://{addr}"), 4)
            .await
            .unwrap();

        assert!(transport.frames().next().await.is_none());
        assert!(transport.is_closed());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = DirectTransport::connect(&format!("ws://{addr}"), 4)
            .await
            .unwrap_err();
        assert!(err.is_connection_error());
    }
}
