//! WebSocket transport implementation using `tokio-tungstenite`.

use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::StreamExt;
use futures_util::stream::{SplitSink, SplitStream};
use tokio_tungstenite::tungstenite::Message;

use crate::{
    CloseFrame, ConnectionId, Connector, Frame, FrameSink, FrameSource,
    TransportError,
};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

fn wrap_err(
    kind: std::io::ErrorKind,
    e: tokio_tungstenite::tungstenite::Error,
) -> std::io::Error {
    std::io::Error::new(kind, e)
}

/// A [`Connector`] that dials `ws://`/`wss://` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    type Sender = WebSocketSender;
    type Receiver = WebSocketReceiver;

    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Self::Sender, Self::Receiver), TransportError> {
        let (ws, _) =
            tokio_tungstenite::connect_async(url).await.map_err(|e| {
                TransportError::ConnectFailed(wrap_err(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                ))
            })?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, url, "WebSocket connection established");

        let (sink, stream) = ws.split();
        Ok((
            WebSocketSender {
                id,
                sink,
                closed: false,
            },
            WebSocketReceiver { id, stream },
        ))
    }
}

/// Sending half of a WebSocket connection.
pub struct WebSocketSender {
    id: ConnectionId,
    sink: SplitSink<WsStream, Message>,
    closed: bool,
}

impl FrameSink for WebSocketSender {
    async fn send(&mut self, frame: &str) -> Result<(), TransportError> {
        use futures_util::SinkExt;
        if self.closed {
            return Err(TransportError::NotConnected);
        }
        self.sink
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| {
                TransportError::SendFailed(wrap_err(
                    std::io::ErrorKind::BrokenPipe,
                    e,
                ))
            })
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        use futures_util::SinkExt;
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        tracing::debug!(id = %self.id, "closing WebSocket connection");
        self.sink.close().await.map_err(|e| {
            TransportError::SendFailed(wrap_err(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Receiving half of a WebSocket connection.
pub struct WebSocketReceiver {
    id: ConnectionId,
    stream: SplitStream<WsStream>,
}

impl FrameSource for WebSocketReceiver {
    async fn recv(&mut self) -> Result<Option<Frame>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(Frame::Message(text.to_string())));
                }
                Some(Ok(Message::Binary(data))) => {
                    // The contract is UTF-8 text; tolerate peers that
                    // flag frames as binary.
                    return Ok(Some(Frame::Message(
                        String::from_utf8_lossy(&data).into_owned(),
                    )));
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(id = %self.id, "peer closed connection");
                    return Ok(Some(Frame::Close(frame.map(|f| {
                        CloseFrame {
                            code: f.code.into(),
                            reason: f.reason.to_string(),
                        }
                    }))));
                }
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(wrap_err(
                        std::io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
                None => return Ok(None),
            }
        }
    }
}
