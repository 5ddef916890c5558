//! Wire protocol for Parley.
//!
//! This crate defines the "language" spoken between a Parley client and
//! the chat server:
//!
//! - **Types** ([`Command`], [`ServerEvent`], [`Credentials`], etc.) —
//!   the message structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`], [`decode_event`]) — how
//!   those messages are converted to/from text frames.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and session
//! (connection state). It doesn't know about connections or rooms — it
//! only knows how to serialize and deserialize messages.
//!
//! ```text
//! Transport (frames) → Protocol (Command/ServerEvent) → Session (state)
//! ```
//!
//! # Schema version
//!
//! The wire contract carries no version negotiation field. This crate
//! implements the richest historical schema as the single supported
//! contract: camelCase field names (`sessionId`, `fullName`), typed
//! credentials, the `chatRoom` command envelope, room participants, and
//! room presence events. Tag strings and field names are part of the
//! contract and must match the server byte-for-byte.

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec, decode_event};
pub use error::ProtocolError;
pub use types::{
    ChatMessage, ChatRoomCommand, Command, Credentials, Participant,
    RoomEvent, RoomId, ServerEvent, SessionDescription, SessionId,
    UserProfile,
};
