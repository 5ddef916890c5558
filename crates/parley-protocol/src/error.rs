//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Deserialization failed: malformed JSON, missing required
    /// fields, or wrong data types under a recognized tag.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The frame is a JSON value without a string `type` tag, so it
    /// cannot be routed at all.
    #[error("frame has no type tag")]
    MissingTag,
}
