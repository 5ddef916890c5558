//! Session layer: connection lifecycle, authentication, and rooms.
//!
//! A [`Session`] is the client's handle on one chat server: it opens
//! the WebSocket, pumps inbound frames through a
//! [`Dispatcher`](parley_dispatch::Dispatcher), tracks the
//! [`ConnectionState`] machine, and mints [`RoomHandle`]s that scope
//! sends and streams to a single room.
//!
//! One connection carries everything. Joining five rooms multiplexes
//! five conversations over the same socket; there is no
//! connection-per-room.

mod error;
mod room;
mod session;

pub use error::SessionError;
pub use room::RoomHandle;
pub use session::{ConnectionState, Session, SessionConfig};
