//! Event dispatch layer for Parley.
//!
//! Sits between transport (inbound frames) and session (state):
//!
//! - [`Signal`] — a synchronous publish-subscribe primitive: an ordered
//!   list of callbacks with disposer-based removal.
//! - [`Dispatcher`] — decodes each inbound frame against the protocol
//!   taxonomy and fans it out, catch-all channel first, then exactly
//!   one type-specific channel.
//!
//! ```text
//! Transport (frames) → Dispatcher → Signals → Session state / consumers
//! ```
//!
//! Dispatch is fully synchronous: all observers of a frame run, in
//! registration order, before `dispatch` returns. One frame is
//! therefore completely processed before the next is handed in.

mod dispatcher;
mod signal;

pub use dispatcher::{
    ConnectionClose, Dispatcher, ParseFailure, RoomMessage, RoomRoster,
};
pub use signal::{EventStream, Signal, Subscription};
