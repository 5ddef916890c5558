//! Core protocol types for Parley's wire format.
//!
//! Every type in this module travels "on the wire": it is serialized to
//! a JSON text frame, sent over the connection, and deserialized on the
//! other side. Both directions are closed, internally tagged unions
//! (tag field `type`, camelCase tag strings) so that exhaustive
//! matching is possible on receipt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Server-assigned identifier for one connection's session.
///
/// Opaque to the client; the server is the sole authority on its shape.
/// Serialized transparently as a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl From<String> for SessionId {
    fn from(inner: String) -> Self {
        Self(inner)
    }
}

impl From<&str> for SessionId {
    fn from(inner: &str) -> Self {
        Self(inner.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a chat room.
///
/// Opaque string; the core imposes no structural constraints.
/// Uniqueness and validity are server-authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl From<String> for RoomId {
    fn from(inner: String) -> Self {
        Self(inner)
    }
}

impl From<&str> for RoomId {
    fn from(inner: &str) -> Self {
        Self(inner.to_string())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for RoomId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Session identity payloads
// ---------------------------------------------------------------------------

/// Identity the server assigns on connect, delivered in
/// [`ServerEvent::Welcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDescription {
    pub session_id: SessionId,
}

/// Credentials presented when authenticating.
///
/// Transient: held only long enough to construct the authenticate
/// command, never persisted by this layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum Credentials {
    /// Username and password.
    UsernamePassword { username: String, password: String },

    /// Just a username, no secret. For low-ceremony deployments.
    AdHoc { username: String },
}

/// Profile of the authenticated user, delivered asynchronously after
/// authentication succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub full_name: String,
}

// ---------------------------------------------------------------------------
// Chat payloads
// ---------------------------------------------------------------------------

/// A chat message as it appears on the wire.
///
/// `sent` is stamped by the server and serialized as RFC 3339 text.
/// Never trust it for local ordering across clients with clock skew —
/// the dispatch layer stamps its own receive time. `uuid` is the
/// de-duplication key and is unique per message instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub content: String,
    pub sender: SessionId,
    pub sent: DateTime<Utc>,
    pub uuid: Uuid,
}

/// Membership fact for a room: who is in it, under what name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub session_id: SessionId,
    pub full_name: String,
}

impl From<(UserProfile, SessionId)> for Participant {
    fn from((profile, session_id): (UserProfile, SessionId)) -> Self {
        Self {
            session_id,
            full_name: profile.full_name,
        }
    }
}

/// Incremental presence delta for a room.
///
/// Externally tagged: `{"participantJoined":{"name":"…"}}`. These are
/// surfaced raw; the core never merges them into a
/// [`ServerEvent::RoomParticipants`] roster — that is a consumer's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoomEvent {
    ParticipantJoined { name: String },
    ParticipantLeft { name: String },
}

// ---------------------------------------------------------------------------
// Command — client → server
// ---------------------------------------------------------------------------

/// Command sent from client to server.
///
/// Stateless value, constructed fresh per call; no identity beyond its
/// content. Tagged by the `type` field with camelCase tag strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum Command {
    /// Establish identity for this session.
    Authenticate { credentials: Credentials },

    /// Join a room. Join is optimistic: no confirmation round-trip.
    Join { room: RoomId },

    /// Leave a room.
    Leave { room: RoomId },

    /// Room-scoped command envelope.
    ChatRoom {
        room: RoomId,
        command: ChatRoomCommand,
    },

    /// Request the global room list; the reply arrives as an
    /// independent [`ServerEvent::RoomList`].
    ListRooms,

    /// Request the joined-room list; the reply arrives as an
    /// independent [`ServerEvent::MyRoomList`].
    ListMyRooms,

    /// Request server shutdown (privileged).
    ShutDown,
}

/// Command carried inside the [`Command::ChatRoom`] envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ChatRoomCommand {
    /// Send a message to all participants of the room.
    Message { content: String },

    /// Request the room's participant roster.
    ListParticipants,

    /// Leave the room (envelope form of [`Command::Leave`]).
    Leave,
}

impl Command {
    /// Pretty-printed sample commands, for interactive clients that
    /// accept raw JSON input.
    pub fn suggestions() -> String {
        let room = RoomId::from("roomName");
        serde_json::to_string_pretty(&[
            Command::Join { room: room.clone() },
            Command::ChatRoom {
                room,
                command: ChatRoomCommand::Message {
                    content: "hello".into(),
                },
            },
            Command::Authenticate {
                credentials: Credentials::AdHoc {
                    username: "username".into(),
                },
            },
            Command::ListRooms,
            Command::ListMyRooms,
        ])
        .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// ServerEvent — server → client
// ---------------------------------------------------------------------------

/// Event received from the server.
///
/// Ephemeral: the core does not retain events after dispatch. Consumers
/// that want history keep their own accumulator.
///
/// An inbound frame whose `type` tag is not in [`ServerEvent::TAGS`] is
/// decoded as [`ServerEvent::Any`] with the raw payload intact, so
/// unknown message kinds are never fatal (see
/// [`decode_event`](crate::decode_event)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ServerEvent {
    /// First event on a fresh connection; carries the session identity.
    Welcome { session: SessionDescription },

    /// Reply to [`Command::Authenticate`].
    Authenticated,

    /// Profile of the authenticated user.
    Profile { profile: UserProfile },

    /// Global room list, reply to [`Command::ListRooms`].
    RoomList { rooms: Vec<String> },

    /// Joined-room list, reply to [`Command::ListMyRooms`].
    MyRoomList { rooms: Vec<String> },

    /// Full participant roster for a room. Replaces any previous
    /// roster wholesale; it is not an incremental patch.
    RoomParticipants {
        room: RoomId,
        participants: Vec<Participant>,
    },

    /// Incremental presence delta for a room.
    RoomEvent { room: RoomId, event: RoomEvent },

    /// A chat message delivered to a room.
    Message { room: RoomId, message: ChatMessage },

    /// Fallback for message kinds this client does not recognize.
    Any { payload: serde_json::Value },

    /// Server-reported error. Does not by itself close the connection.
    Error { message: String },
}

impl ServerEvent {
    /// The closed set of recognized `type` tags, in wire spelling.
    ///
    /// Kept in sync with the variant list above; the decoder routes any
    /// other tag to [`ServerEvent::Any`].
    pub const TAGS: [&'static str; 10] = [
        "welcome",
        "authenticated",
        "profile",
        "roomList",
        "myRoomList",
        "roomParticipants",
        "roomEvent",
        "message",
        "any",
        "error",
    ];

    /// Shorthand for a server error event.
    pub fn err(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
