//! Frame demultiplexer: decode, then fan out.
//!
//! [`Dispatcher::dispatch`] takes one inbound text frame and publishes
//! it twice: first on the catch-all [`event`](Dispatcher::event)
//! signal, then on exactly one type-specific signal. Decode failures
//! are contained — they surface on the
//! [`parse_error`](Dispatcher::parse_error) signal and never unwind
//! past the dispatch boundary.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use parley_protocol::{
    ChatMessage, Participant, ProtocolError, RoomEvent, RoomId,
    ServerEvent, SessionDescription, UserProfile, decode_event,
};

use crate::Signal;

/// An inbound frame that failed to decode against the protocol schema.
///
/// Local and non-fatal: no state changes, the connection stays up.
#[derive(Debug, Clone)]
pub struct ParseFailure {
    /// The raw frame text as received.
    pub raw: String,
    /// Human-readable decode failure.
    pub cause: String,
}

/// A chat message as delivered to consumers, stamped on arrival.
#[derive(Debug, Clone)]
pub struct RoomMessage {
    pub room: RoomId,
    pub message: ChatMessage,
    /// Local receive time, stamped at dispatch. Non-decreasing in
    /// dispatch order, unlike the server-supplied `message.sent`.
    pub received: DateTime<Utc>,
}

/// Wholesale replacement roster for one room.
#[derive(Debug, Clone)]
pub struct RoomRoster {
    pub room: RoomId,
    pub participants: Vec<Participant>,
}

/// Details of a peer-initiated connection close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionClose {
    pub code: u16,
    pub reason: String,
}

/// One signal per observable channel of a session.
///
/// Inbound protocol events are published by [`dispatch`](Self::dispatch);
/// the connection-lifecycle signals (`connection_close`,
/// `connection_error`) are emitted by the owner of the transport.
#[derive(Default)]
pub struct Dispatcher {
    /// Catch-all: every successfully decoded event, before its
    /// type-specific signal fires.
    pub event: Signal<ServerEvent>,
    pub welcome: Signal<SessionDescription>,
    pub authenticated: Signal<()>,
    pub profile: Signal<UserProfile>,
    pub room_list: Signal<Vec<String>>,
    pub my_room_list: Signal<Vec<String>>,
    pub room_participants: Signal<RoomRoster>,
    pub room_event: Signal<(RoomId, RoomEvent)>,
    pub message: Signal<RoomMessage>,
    /// Unrecognized message kinds, raw payload intact.
    pub any: Signal<serde_json::Value>,
    /// Server-reported errors. Receipt does not close the connection.
    pub server_error: Signal<String>,
    pub parse_error: Signal<ParseFailure>,
    pub connection_close: Signal<Option<ConnectionClose>>,
    pub connection_error: Signal<String>,
    last_received: Mutex<Option<DateTime<Utc>>>,
}

impl Dispatcher {
    /// Creates a dispatcher with no observers registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one frame and publishes it.
    ///
    /// On decode failure the [`parse_error`](Self::parse_error) signal
    /// fires and nothing else happens. On success the catch-all fires
    /// first, then the type-specific signal; all observers run before
    /// this returns.
    pub fn dispatch(&self, frame: &str) {
        let event = match decode_event(frame) {
            Ok(event) => event,
            Err(cause) => {
                self.report_parse_failure(frame, &cause);
                return;
            }
        };

        self.event.emit(&event);

        match event {
            ServerEvent::Welcome { session } => self.welcome.emit(&session),
            ServerEvent::Authenticated => self.authenticated.emit(&()),
            ServerEvent::Profile { profile } => self.profile.emit(&profile),
            ServerEvent::RoomList { rooms } => self.room_list.emit(&rooms),
            ServerEvent::MyRoomList { rooms } => {
                self.my_room_list.emit(&rooms);
            }
            ServerEvent::RoomParticipants { room, participants } => {
                self.room_participants.emit(&RoomRoster {
                    room,
                    participants,
                });
            }
            ServerEvent::RoomEvent { room, event } => {
                self.room_event.emit(&(room, event));
            }
            ServerEvent::Message { room, message } => {
                let received = self.stamp();
                self.message.emit(&RoomMessage {
                    room,
                    message,
                    received,
                });
            }
            ServerEvent::Any { payload } => self.any.emit(&payload),
            ServerEvent::Error { message } => {
                tracing::warn!(%message, "server reported an error");
                self.server_error.emit(&message);
            }
        }
    }

    fn report_parse_failure(&self, frame: &str, cause: &ProtocolError) {
        tracing::warn!(%cause, raw = frame, "dropping undecodable frame");
        self.parse_error.emit(&ParseFailure {
            raw: frame.to_string(),
            cause: cause.to_string(),
        });
    }

    /// Hands out receive timestamps that never go backwards, even if
    /// the wall clock does.
    fn stamp(&self) -> DateTime<Utc> {
        let mut last = self.last_received.lock().expect("stamp lock");
        let now = Utc::now();
        let stamped = match *last {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        *last = Some(stamped);
        stamped
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn message_frame(room: &str, content: &str, uuid: &str) -> String {
        format!(
            r#"{{"type":"message","room":"{room}","message":{{"content":"{content}","sender":"s1","sent":"2024-01-01T00:00:00Z","uuid":"{uuid}"}}}}"#
        )
    }

    #[test]
    fn test_dispatch_fires_catch_all_before_type_specific() {
        let dispatcher = Dispatcher::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&order);
        let _all = dispatcher
            .event
            .connect(move |_| log.lock().unwrap().push("catch-all"));
        let log = Arc::clone(&order);
        let _welcome = dispatcher
            .welcome
            .connect(move |_| log.lock().unwrap().push("welcome"));

        dispatcher
            .dispatch(r#"{"type":"welcome","session":{"sessionId":"s1"}}"#);

        assert_eq!(*order.lock().unwrap(), vec!["catch-all", "welcome"]);
    }

    #[test]
    fn test_dispatch_ordering_holds_for_every_event_kind() {
        let frames = [
            r#"{"type":"welcome","session":{"sessionId":"s1"}}"#.to_string(),
            r#"{"type":"authenticated"}"#.to_string(),
            r#"{"type":"profile","profile":{"fullName":"Ada"}}"#.to_string(),
            r#"{"type":"roomList","rooms":["a"]}"#.to_string(),
            r#"{"type":"myRoomList","rooms":[]}"#.to_string(),
            r#"{"type":"roomParticipants","room":"a","participants":[]}"#
                .to_string(),
            r#"{"type":"roomEvent","room":"a","event":{"participantJoined":{"name":"x"}}}"#
                .to_string(),
            message_frame("a", "hi", "6dfac7a4-8c31-4e5a-9f0e-000000000001"),
            r#"{"type":"any","payload":{}}"#.to_string(),
            r#"{"type":"error","message":"boom"}"#.to_string(),
        ];

        for frame in frames {
            let dispatcher = Dispatcher::new();
            let order = Arc::new(Mutex::new(Vec::new()));

            let log = Arc::clone(&order);
            let _all = dispatcher
                .event
                .connect(move |_| log.lock().unwrap().push("catch-all"));
            macro_rules! tap {
                ($signal:ident) => {{
                    let log = Arc::clone(&order);
                    dispatcher.$signal.connect(move |_| {
                        log.lock().unwrap().push("specific")
                    })
                }};
            }
            let _subs = (
                tap!(welcome),
                tap!(authenticated),
                tap!(profile),
                tap!(room_list),
                tap!(my_room_list),
                tap!(room_participants),
                tap!(room_event),
                tap!(message),
                tap!(any),
                tap!(server_error),
            );

            dispatcher.dispatch(&frame);

            assert_eq!(
                *order.lock().unwrap(),
                vec!["catch-all", "specific"],
                "ordering violated for frame {frame}"
            );
        }
    }

    #[test]
    fn test_dispatch_parse_failure_fires_parse_error_only() {
        let dispatcher = Dispatcher::new();
        let failures = Arc::new(Mutex::new(Vec::new()));
        let events = Arc::new(Mutex::new(0u32));

        let log = Arc::clone(&failures);
        let _err = dispatcher.parse_error.connect(move |failure: &ParseFailure| {
            log.lock().unwrap().push(failure.clone());
        });
        let count = Arc::clone(&events);
        let _all = dispatcher
            .event
            .connect(move |_| *count.lock().unwrap() += 1);

        dispatcher.dispatch("not json");

        let failures = failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].raw, "not json");
        assert_eq!(*events.lock().unwrap(), 0, "no dispatch on parse failure");
    }

    #[test]
    fn test_dispatch_unknown_tag_goes_to_any_channel() {
        let dispatcher = Dispatcher::new();
        let payloads = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&payloads);
        let _any = dispatcher.any.connect(move |payload: &serde_json::Value| {
            log.lock().unwrap().push(payload.clone());
        });

        dispatcher.dispatch(r#"{"type":"telemetry","cpu":0.5}"#);

        let payloads = payloads.lock().unwrap();
        assert_eq!(payloads.len(), 1);
        // Raw payload intact.
        assert_eq!(payloads[0]["type"], "telemetry");
        assert_eq!(payloads[0]["cpu"], 0.5);
    }

    #[test]
    fn test_dispatch_message_stamps_received() {
        let dispatcher = Dispatcher::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&received);
        let _sub = dispatcher.message.connect(move |msg: &RoomMessage| {
            log.lock().unwrap().push(msg.received);
        });

        let before = Utc::now();
        dispatcher.dispatch(&message_frame(
            "lobby",
            "hi",
            "6dfac7a4-8c31-4e5a-9f0e-000000000001",
        ));
        dispatcher.dispatch(&message_frame(
            "lobby",
            "again",
            "6dfac7a4-8c31-4e5a-9f0e-000000000002",
        ));
        let after = Utc::now();

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 2);
        assert!(received[0] >= before && received[1] <= after);
        // Monotonically non-decreasing in dispatch order.
        assert!(received[1] >= received[0]);
    }

    #[test]
    fn test_dispatch_server_error_does_not_panic_or_close() {
        let dispatcher = Dispatcher::new();
        let errors = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&errors);
        let _sub = dispatcher.server_error.connect(move |message: &String| {
            log.lock().unwrap().push(message.clone());
        });

        dispatcher.dispatch(r#"{"type":"error","message":"room is full"}"#);

        assert_eq!(*errors.lock().unwrap(), vec!["room is full"]);
    }

    #[test]
    fn test_state_observer_runs_before_later_registrations() {
        // Observers registered first (e.g. internal session state
        // updates) must see the event before consumers registered
        // later, so state reads from consumer callbacks are current.
        let dispatcher = Dispatcher::new();
        let state = Arc::new(Mutex::new(None::<String>));

        let writer = Arc::clone(&state);
        let _internal = dispatcher.welcome.connect(
            move |desc: &parley_protocol::SessionDescription| {
                *writer.lock().unwrap() = Some(desc.session_id.to_string());
            },
        );

        let seen = Arc::new(Mutex::new(None));
        let reader = Arc::clone(&state);
        let seen_slot = Arc::clone(&seen);
        let _consumer = dispatcher.welcome.connect(move |_| {
            *seen_slot.lock().unwrap() = reader.lock().unwrap().clone();
        });

        dispatcher
            .dispatch(r#"{"type":"welcome","session":{"sessionId":"s9"}}"#);

        assert_eq!(*seen.lock().unwrap(), Some("s9".to_string()));
    }
}
