//! Session-level errors.

use parley_protocol::ProtocolError;
use parley_transport::TransportError;
use thiserror::Error;

/// Errors surfaced by [`Session`](crate::Session) operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The operation requires a live connection and there is none.
    #[error("not connected")]
    NotConnected,

    /// `connect` was called while a connection attempt or connection
    /// is already in progress.
    #[error("already connected")]
    AlreadyConnected,

    /// The server did not confirm authentication within the configured
    /// deadline. A late confirmation still flips the session to
    /// authenticated when it arrives.
    #[error("authentication timed out")]
    AuthenticationTimeout,

    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// An outbound command could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}
