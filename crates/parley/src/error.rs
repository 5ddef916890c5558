//! Unified error type for the Parley client.

use parley_protocol::ProtocolError;
use parley_session::SessionError;
use parley_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `parley` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant auto-generates `From` impls, so the `?`
/// operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ParleyError {
    /// A transport-level error (connect, send, receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, missing tag).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (lifecycle, authentication).
    #[error(transparent)]
    Session(#[from] SessionError),
}
