//! Codec trait and the JSON implementation.
//!
//! The wire format is one UTF-8 text frame per logical message. The
//! [`Codec`] trait is the seam between the protocol types and their
//! textual encoding; [`JsonCodec`] is the only implementation the
//! server contract currently allows.
//!
//! Inbound frames go through [`decode_event`], which adds the
//! forward-compatibility rule of the protocol: an unrecognized `type`
//! tag becomes [`ServerEvent::Any`] instead of a decode error.

use serde::{Serialize, de::DeserializeOwned};

use crate::{ProtocolError, ServerEvent};

/// Converts between protocol types and text frames.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into one text frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a text frame back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the frame is malformed or
    /// does not match the expected shape.
    fn decode<T: DeserializeOwned>(&self, frame: &str) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, frame: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(frame).map_err(ProtocolError::Decode)
    }
}

/// Decodes an inbound frame as a [`ServerEvent`], tolerating unknown
/// message kinds.
///
/// Routing rules:
/// - not valid JSON, or valid JSON that is not an object → error;
/// - an object without a string `type` field → [`ProtocolError::MissingTag`];
/// - a recognized tag whose fields do not match the schema → error;
/// - an unrecognized tag → [`ServerEvent::Any`] carrying the whole
///   frame as its payload, with a warning logged.
///
/// # Errors
/// Returns [`ProtocolError::Decode`] or [`ProtocolError::MissingTag`]
/// as above. Callers report these locally; they are never fatal to the
/// connection.
pub fn decode_event(frame: &str) -> Result<ServerEvent, ProtocolError> {
    let value: serde_json::Value =
        serde_json::from_str(frame).map_err(ProtocolError::Decode)?;

    let Some(tag) = value.get("type").and_then(serde_json::Value::as_str)
    else {
        return Err(ProtocolError::MissingTag);
    };

    if ServerEvent::TAGS.contains(&tag) {
        serde_json::from_value(value).map_err(ProtocolError::Decode)
    } else {
        tracing::warn!(tag, "unrecognized server event kind");
        Ok(ServerEvent::Any { payload: value })
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SessionDescription, SessionId};

    #[test]
    fn test_encode_then_decode_yields_equal_value() {
        let codec = JsonCodec;
        let desc = SessionDescription {
            session_id: SessionId::from("s1"),
        };
        let frame = codec.encode(&desc).unwrap();
        let decoded: SessionDescription = codec.decode(&frame).unwrap();
        assert_eq!(desc, decoded);
    }

    #[test]
    fn test_decode_garbage_returns_error() {
        let result = decode_event("not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_object_without_tag_returns_missing_tag() {
        let result = decode_event(r#"{"name":"hello"}"#);
        assert!(matches!(result, Err(ProtocolError::MissingTag)));
    }

    #[test]
    fn test_decode_non_object_returns_missing_tag() {
        let result = decode_event("[1,2,3]");
        assert!(matches!(result, Err(ProtocolError::MissingTag)));
    }

    #[test]
    fn test_decode_known_tag_with_bad_fields_returns_error() {
        // "welcome" is a recognized tag, so schema violations are real
        // errors, not candidates for the Any fallback.
        let result = decode_event(r#"{"type":"welcome","session":42}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_unknown_tag_falls_back_to_any() {
        let frame = r#"{"type":"flyToMoon","speed":9000}"#;
        let event = decode_event(frame).unwrap();
        let ServerEvent::Any { payload } = event else {
            panic!("expected Any fallback");
        };
        // Raw payload intact, including the unknown tag.
        assert_eq!(payload["type"], "flyToMoon");
        assert_eq!(payload["speed"], 9000);
    }

    #[test]
    fn test_decode_explicit_any_event() {
        let frame = r#"{"type":"any","payload":{"k":"v"}}"#;
        let event = decode_event(frame).unwrap();
        let ServerEvent::Any { payload } = event else {
            panic!("expected Any");
        };
        assert_eq!(payload["k"], "v");
    }

    #[test]
    fn test_decode_welcome_event() {
        let event =
            decode_event(r#"{"type":"welcome","session":{"sessionId":"s1"}}"#)
                .unwrap();
        assert_eq!(
            event,
            ServerEvent::Welcome {
                session: SessionDescription {
                    session_id: SessionId::from("s1"),
                },
            }
        );
    }
}
