//! # Parley
//!
//! Client library for Parley chat servers.
//!
//! A [`Session`] holds one persistent WebSocket to the server and
//! multiplexes everything over it: authentication, room membership,
//! chat traffic. Inbound events fan out through typed signals; rooms
//! are lightweight [`RoomHandle`] projections of the session rather
//! than connections of their own.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parley::prelude::*;
//!
//! # async fn run() -> Result<(), ParleyError> {
//! let session = Session::new(SessionConfig::new("ws://localhost:8080/chat"));
//! session.connect().await?;
//! session.ad_hoc("ada").await?;
//!
//! let lobby = session.join("lobby").await?;
//! let mut messages = lobby.messages();
//! lobby.send("hello, room").await?;
//!
//! while let Some(msg) = messages.recv().await {
//!     println!("[{}] {}", msg.message.sender, msg.message.content);
//! }
//! # Ok(())
//! # }
//! ```

mod error;

pub use error::ParleyError;

pub use parley_dispatch::{
    ConnectionClose, Dispatcher, EventStream, ParseFailure, RoomMessage,
    RoomRoster, Signal, Subscription,
};
pub use parley_protocol::{
    ChatMessage, ChatRoomCommand, Codec, Command, Credentials, JsonCodec,
    Participant, ProtocolError, RoomEvent, RoomId, ServerEvent,
    SessionDescription, SessionId, UserProfile, decode_event,
};
pub use parley_session::{
    ConnectionState, RoomHandle, Session, SessionConfig, SessionError,
};
pub use parley_transport::{
    CloseFrame, ConnectionId, Connector, Frame, FrameSink, FrameSource,
    TransportError, WebSocketConnector,
};

/// The commonly needed subset, for glob import.
pub mod prelude {
    pub use crate::{
        ChatMessage, Command, ConnectionState, Credentials, ParleyError,
        RoomEvent, RoomHandle, RoomId, RoomMessage, ServerEvent, Session,
        SessionConfig, SessionId,
    };
}
