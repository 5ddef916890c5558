//! Transport abstraction layer for Parley.
//!
//! Provides the [`Connector`], [`FrameSink`], and [`FrameSource`]
//! traits that abstract over the underlying connection protocol, plus
//! the default WebSocket implementation.
//!
//! The transport does not interpret message content; it is a frame
//! pipe. One call to [`Connector::connect`] opens exactly one
//! underlying connection, split into an independent sending half and
//! receiving half so a parked receive never delays a send.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnector, WebSocketReceiver, WebSocketSender};

use std::fmt;

/// Opaque identifier for a connection, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A close notification from the remote peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    /// Protocol-defined close code (1000 = normal closure).
    pub code: u16,
    /// Human-readable close reason, possibly empty.
    pub reason: String,
}

/// One inbound item from the receiving half.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A payload frame: one logical message as UTF-8 text.
    Message(String),
    /// The peer closed the connection, with a close frame if it sent one.
    Close(Option<CloseFrame>),
}

/// Dials a remote endpoint, producing one connection per call.
pub trait Connector: Send + Sync + 'static {
    /// The sending half produced by this connector.
    type Sender: FrameSink;
    /// The receiving half produced by this connector.
    type Receiver: FrameSource;

    /// Opens a connection to the given URL.
    ///
    /// # Errors
    /// Returns [`TransportError::ConnectFailed`] if the endpoint cannot
    /// be reached or the protocol upgrade fails.
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Self::Sender, Self::Receiver), TransportError>;
}

/// The sending half of a connection.
pub trait FrameSink: Send + 'static {
    /// Sends one text frame to the remote peer.
    ///
    /// # Errors
    /// Returns [`TransportError::NotConnected`] after [`close`](Self::close)
    /// has been called, [`TransportError::SendFailed`] on transport faults.
    async fn send(&mut self, frame: &str) -> Result<(), TransportError>;

    /// Closes the connection. Idempotent: closing an already-closed
    /// sink is a no-op.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

/// The receiving half of a connection.
pub trait FrameSource: Send + 'static {
    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the stream ends without a close frame.
    ///
    /// # Errors
    /// Returns [`TransportError::ReceiveFailed`] on transport faults.
    async fn recv(&mut self) -> Result<Option<Frame>, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(1), "alice");
        map.insert(ConnectionId::new(2), "bob");
        assert_eq!(map[&ConnectionId::new(1)], "alice");
    }

    #[test]
    fn test_frame_equality() {
        assert_eq!(
            Frame::Message("hi".into()),
            Frame::Message("hi".into())
        );
        assert_ne!(
            Frame::Close(None),
            Frame::Close(Some(CloseFrame {
                code: 1000,
                reason: String::new(),
            }))
        );
    }
}
