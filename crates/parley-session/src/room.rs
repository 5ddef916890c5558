//! Room handles: room-scoped projections of a session.

use std::sync::Arc;

use parley_dispatch::{EventStream, RoomMessage, RoomRoster};
use parley_protocol::{ChatRoomCommand, Command, RoomEvent, RoomId};

use crate::error::SessionError;
use crate::session::SessionCore;

/// A view of one room on an existing session.
///
/// A handle owns no connection of its own: it borrows the session's
/// socket for sends and filters the session's inbound channels down to
/// its room. Handles for different rooms never see each other's
/// traffic. Dropping a handle does not leave the room; call
/// [`leave`](Self::leave) for that.
pub struct RoomHandle {
    core: Arc<SessionCore>,
    room: RoomId,
}

impl RoomHandle {
    pub(crate) fn new(core: Arc<SessionCore>, room: RoomId) -> Self {
        Self { core, room }
    }

    /// The room this handle is scoped to.
    pub fn id(&self) -> &RoomId {
        &self.room
    }

    /// Streams chat messages delivered to this room only.
    pub fn messages(&self) -> EventStream<RoomMessage> {
        let room = self.room.clone();
        self.core
            .dispatcher
            .message
            .subscribe_filtered(move |m: &RoomMessage| m.room == room)
    }

    /// Streams membership events (joins and leaves) for this room only.
    pub fn events(&self) -> EventStream<(RoomId, RoomEvent)> {
        let room = self.room.clone();
        self.core
            .dispatcher
            .room_event
            .subscribe_filtered(move |(r, _): &(RoomId, RoomEvent)| *r == room)
    }

    /// Streams participant rosters for this room only. Each roster is
    /// a wholesale replacement, not a patch.
    pub fn rosters(&self) -> EventStream<RoomRoster> {
        let room = self.room.clone();
        self.core
            .dispatcher
            .room_participants
            .subscribe_filtered(move |roster: &RoomRoster| roster.room == room)
    }

    /// Sends a chat message to this room.
    pub async fn send(
        &self,
        content: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.command(ChatRoomCommand::Message {
            content: content.into(),
        })
        .await
    }

    /// Requests this room's participant roster; the reply arrives on
    /// [`rosters`](Self::rosters).
    pub async fn list_participants(&self) -> Result<(), SessionError> {
        self.command(ChatRoomCommand::ListParticipants).await
    }

    /// Leaves this room. The handle stays valid for the session's
    /// lifetime but will see no further traffic once the server stops
    /// routing the room to this client.
    pub async fn leave(&self) -> Result<(), SessionError> {
        self.command(ChatRoomCommand::Leave).await
    }

    async fn command(
        &self,
        command: ChatRoomCommand,
    ) -> Result<(), SessionError> {
        self.core
            .send_command(&Command::ChatRoom {
                room: self.room.clone(),
                command,
            })
            .await
    }
}

// =========================================================================
// Tests
// =========================================================================
