//! The session: one logical conversation with a chat server over one
//! persistent WebSocket connection.
//!
//! A [`Session`] owns the connection lifecycle
//! (`Disconnected → Connecting → Connected`), routes every inbound
//! frame through its [`Dispatcher`], and hands out [`RoomHandle`]s as
//! room-scoped views of the same connection.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use parley_dispatch::{ConnectionClose, Dispatcher, EventStream, Subscription};
use parley_protocol::{
    Codec, Command, Credentials, JsonCodec, RoomId, ServerEvent,
    SessionDescription, SessionId, UserProfile,
};
use parley_transport::{
    Connector, Frame, FrameSink, FrameSource, WebSocketConnector,
    WebSocketSender,
};
use tokio::task::JoinHandle;

use crate::RoomHandle;
use crate::error::SessionError;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket URL of the chat server, e.g. `ws://localhost:8080/chat`.
    pub url: String,

    /// How long [`Session::authenticate`] waits for the server's
    /// confirmation before giving up.
    ///
    /// Default: 1 second.
    pub auth_timeout: Duration,
}

impl SessionConfig {
    /// Creates a config for the given server URL with default timeouts.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_timeout: Duration::from_secs(1),
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectionState
// ---------------------------------------------------------------------------

/// Lifecycle state of a session's connection.
///
/// ```text
///   Disconnected ─(connect)→ Connecting ─(welcome)→ Connected { authenticated: false }
///        ↑                                                    │ (authenticated event)
///        └────────────(close / failure)─────────── Connected { authenticated: true }
/// ```
///
/// The session stays `Connecting` after the socket opens until the
/// server's `welcome` arrives. Any close, local or remote, returns the
/// session to `Disconnected`; authentication does not survive a
/// reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection. The initial state, and the state after any close.
    Disconnected,

    /// The socket is being opened, or is open and awaiting the
    /// server's `welcome`.
    Connecting,

    /// The server has welcomed this session. `authenticated` flips to
    /// `true` when it confirms credentials.
    Connected { authenticated: bool },
}

// ---------------------------------------------------------------------------
// SessionCore
// ---------------------------------------------------------------------------

/// Shared interior of a session, held by the [`Session`] itself, its
/// read task, and every [`RoomHandle`] minted from it.
pub(crate) struct SessionCore {
    config: SessionConfig,
    pub(crate) dispatcher: Dispatcher,
    state: Mutex<ConnectionState>,
    description: Mutex<Option<SessionDescription>>,
    profile: Mutex<Option<UserProfile>>,
    sender: tokio::sync::Mutex<Option<WebSocketSender>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl SessionCore {
    /// Encodes and sends one command on the open socket. Sends are
    /// allowed as soon as the socket is up, before the welcome.
    pub(crate) async fn send_command(
        &self,
        command: &Command,
    ) -> Result<(), SessionError> {
        if *self.state.lock().expect("state lock")
            == ConnectionState::Disconnected
        {
            return Err(SessionError::NotConnected);
        }
        let frame = JsonCodec.encode(command)?;
        let mut sender = self.sender.lock().await;
        let sink = sender.as_mut().ok_or(SessionError::NotConnected)?;
        sink.send(&frame).await?;
        Ok(())
    }

    /// Resets to `Disconnected` and announces the close. Emits at most
    /// once per connection: a second call is a no-op.
    fn teardown(&self, close: Option<ConnectionClose>) {
        let was_live = {
            let mut state = self.state.lock().expect("state lock");
            if *state == ConnectionState::Disconnected {
                false
            } else {
                *state = ConnectionState::Disconnected;
                true
            }
        };
        if was_live {
            *self.description.lock().expect("description lock") = None;
            *self.profile.lock().expect("profile lock") = None;
            tracing::info!(?close, "connection closed");
            self.dispatcher.connection_close.emit(&close);
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A client session against one chat server.
///
/// All inbound traffic fans out through [`dispatcher`](Self::dispatcher);
/// observers run synchronously in arrival order, so state reads from a
/// callback always see the effects of earlier events.
pub struct Session {
    pub(crate) core: Arc<SessionCore>,
    // Internal observers that keep `state` and `description` current.
    // Dropped with the session.
    _internal: Vec<Subscription>,
}

impl Session {
    /// Creates a disconnected session.
    pub fn new(config: SessionConfig) -> Self {
        let core = Arc::new(SessionCore {
            config,
            dispatcher: Dispatcher::new(),
            state: Mutex::new(ConnectionState::Disconnected),
            description: Mutex::new(None),
            profile: Mutex::new(None),
            sender: tokio::sync::Mutex::new(None),
            reader: Mutex::new(None),
        });

        // Registered before any consumer observer, so these run first
        // on every emit.
        let mut internal = Vec::new();

        let weak = Arc::downgrade(&core);
        internal.push(core.dispatcher.welcome.connect(
            move |description: &SessionDescription| {
                if let Some(core) = weak.upgrade() {
                    tracing::info!(
                        session_id = %description.session_id,
                        "session established"
                    );
                    *core.description.lock().expect("description lock") =
                        Some(description.clone());
                    let mut state = core.state.lock().expect("state lock");
                    if *state == ConnectionState::Connecting {
                        *state = ConnectionState::Connected {
                            authenticated: false,
                        };
                    }
                }
            },
        ));

        let weak: Weak<SessionCore> = Arc::downgrade(&core);
        internal.push(core.dispatcher.profile.connect(
            move |profile: &UserProfile| {
                if let Some(core) = weak.upgrade() {
                    *core.profile.lock().expect("profile lock") =
                        Some(profile.clone());
                }
            },
        ));

        let weak: Weak<SessionCore> = Arc::downgrade(&core);
        internal.push(core.dispatcher.authenticated.connect(move |_| {
            if let Some(core) = weak.upgrade() {
                let mut state = core.state.lock().expect("state lock");
                if let ConnectionState::Connected { authenticated } = &mut *state
                {
                    *authenticated = true;
                }
            }
        }));

        Self {
            core,
            _internal: internal,
        }
    }

    /// Opens the WebSocket connection and starts the read loop.
    ///
    /// The session stays `Connecting` until the server's `welcome`
    /// arrives; only then does it become `Connected`.
    ///
    /// # Errors
    /// [`SessionError::AlreadyConnected`] if a connection attempt or
    /// connection is already in progress; [`SessionError::Transport`]
    /// if the endpoint cannot be reached (the session returns to
    /// `Disconnected`).
    pub async fn connect(&self) -> Result<(), SessionError> {
        {
            let mut state = self.core.state.lock().expect("state lock");
            match *state {
                ConnectionState::Disconnected => {
                    *state = ConnectionState::Connecting;
                }
                _ => return Err(SessionError::AlreadyConnected),
            }
        }

        let (sender, mut receiver) =
            match WebSocketConnector.connect(&self.core.config.url).await {
                Ok(halves) => halves,
                Err(error) => {
                    *self.core.state.lock().expect("state lock") =
                        ConnectionState::Disconnected;
                    return Err(error.into());
                }
            };

        tracing::info!(
            id = %sender.id(),
            url = %self.core.config.url,
            "connected"
        );
        *self.core.sender.lock().await = Some(sender);

        let core = Arc::clone(&self.core);
        let handle = tokio::spawn(async move {
            let close = loop {
                match receiver.recv().await {
                    Ok(Some(Frame::Message(text))) => {
                        core.dispatcher.dispatch(&text);
                    }
                    Ok(Some(Frame::Close(frame))) => {
                        break frame.map(|f| ConnectionClose {
                            code: f.code,
                            reason: f.reason,
                        });
                    }
                    Ok(None) => break None,
                    Err(error) => {
                        tracing::warn!(%error, "transport receive failed");
                        core.dispatcher
                            .connection_error
                            .emit(&error.to_string());
                        break None;
                    }
                }
            };
            // Release the transport before announcing the close, so
            // observers reacting with a fresh connect find no stale
            // sender.
            if let Some(mut sender) = core.sender.lock().await.take() {
                if let Err(error) = sender.close().await {
                    tracing::debug!(%error, "close after remote shutdown failed");
                }
            }
            core.teardown(close);
        });
        *self.core.reader.lock().expect("reader lock") = Some(handle);

        Ok(())
    }

    /// Closes the connection and resets to `Disconnected`.
    ///
    /// Idempotent: disconnecting a session that is not connected is a
    /// no-op.
    pub async fn disconnect(&self) -> Result<(), SessionError> {
        let reader = self.core.reader.lock().expect("reader lock").take();
        if let Some(handle) = reader {
            handle.abort();
        }
        if let Some(mut sender) = self.core.sender.lock().await.take() {
            if let Err(error) = sender.close().await {
                tracing::debug!(%error, "close handshake failed");
            }
        }
        self.core.teardown(None);
        Ok(())
    }

    /// Sends one protocol command on the live connection.
    ///
    /// # Errors
    /// [`SessionError::NotConnected`] when there is no connection.
    pub async fn send_command(
        &self,
        command: &Command,
    ) -> Result<(), SessionError> {
        self.core.send_command(command).await
    }

    /// Authenticates with the given credentials and waits for the
    /// server's confirmation.
    ///
    /// # Errors
    /// [`SessionError::AuthenticationTimeout`] when no confirmation
    /// arrives within [`SessionConfig::auth_timeout`]. The command was
    /// still sent; a late confirmation flips the session to
    /// authenticated when it arrives.
    pub async fn authenticate(
        &self,
        credentials: Credentials,
    ) -> Result<(), SessionError> {
        // Subscribe before sending so the reply cannot slip past.
        let mut authenticated = self.core.dispatcher.authenticated.subscribe();
        self.send_command(&Command::Authenticate { credentials }).await?;

        tokio::select! {
            reply = authenticated.recv() => match reply {
                Some(()) => Ok(()),
                None => Err(SessionError::NotConnected),
            },
            _ = tokio::time::sleep(self.core.config.auth_timeout) => {
                tracing::warn!(
                    timeout = ?self.core.config.auth_timeout,
                    "authentication timed out"
                );
                Err(SessionError::AuthenticationTimeout)
            }
        }
    }

    /// Authenticates with just a username, no secret.
    pub async fn ad_hoc(
        &self,
        username: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.authenticate(Credentials::AdHoc {
            username: username.into(),
        })
        .await
    }

    /// Joins a room and returns a handle scoped to it.
    ///
    /// Join is optimistic: the handle is returned as soon as the
    /// command is sent, without waiting for a confirmation.
    pub async fn join(
        &self,
        room: impl Into<RoomId>,
    ) -> Result<RoomHandle, SessionError> {
        let room = room.into();
        self.send_command(&Command::Join { room: room.clone() }).await?;
        Ok(RoomHandle::new(Arc::clone(&self.core), room))
    }

    /// Leaves a room by name, without needing its [`RoomHandle`].
    pub async fn leave(
        &self,
        room: impl Into<RoomId>,
    ) -> Result<(), SessionError> {
        self.send_command(&Command::Leave { room: room.into() }).await
    }

    /// Requests the global room list; the reply arrives on
    /// [`Dispatcher::room_list`].
    pub async fn list_rooms(&self) -> Result<(), SessionError> {
        self.send_command(&Command::ListRooms).await
    }

    /// Requests the joined-room list; the reply arrives on
    /// [`Dispatcher::my_room_list`].
    pub async fn list_my_rooms(&self) -> Result<(), SessionError> {
        self.send_command(&Command::ListMyRooms).await
    }

    /// Requests server shutdown (privileged).
    pub async fn shut_down(&self) -> Result<(), SessionError> {
        self.send_command(&Command::ShutDown).await
    }

    /// The server-assigned session id, once a welcome has arrived.
    pub fn session_id(&self) -> Option<SessionId> {
        self.core
            .description
            .lock()
            .expect("description lock")
            .as_ref()
            .map(|d| d.session_id.clone())
    }

    /// Profile of the authenticated user, once the server has sent
    /// one. Cleared on close, like the session id.
    pub fn profile(&self) -> Option<UserProfile> {
        self.core.profile.lock().expect("profile lock").clone()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.core.state.lock().expect("state lock")
    }

    /// The signal hub for this session's inbound channels.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.core.dispatcher
    }

    /// Streams every decoded server event, regardless of kind.
    pub fn events(&self) -> EventStream<ServerEvent> {
        self.core.dispatcher.event.subscribe()
    }
}

// =========================================================================
// Tests
// =========================================================================
