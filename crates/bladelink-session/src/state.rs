//! Connection lifecycle and caller-facing notifications.
//!
//! ```text
//!  Disconnected ──connect()──► Connecting ──established──► Connected
//!       ▲                          │                          │
//!       │                    socket error            heartbeat lost /
//!       │                          ▼                   socket error
//!       └──disconnect()──────  Reconnecting ◄─────────────────┘
//!                                  │
//!                                  └──backoff elapsed──► Connecting
//! ```

use std::fmt;

use bladelink_frame::Event;
use serde::Serialize;

/// Lifecycle state of the single session owned by a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No socket and no pending reconnect. Initial state.
    #[default]
    Disconnected,
    /// TCP connect in flight.
    Connecting,
    /// Socket established; frames flow in both directions.
    Connected,
    /// Link torn down; a reconnect attempt is scheduled.
    Reconnecting,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        }
    }

    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health reported alongside each state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    Connecting,
    ConnectionFailure,
    Disconnected,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Connecting => "connecting",
            Self::ConnectionFailure => "connection_failure",
            Self::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something the caller should know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The session moved to `state`. `message` carries the failure reason.
    StatusChanged {
        state: ConnectionState,
        status: Status,
        message: Option<String>,
    },
    /// One inbound frame, in wire order. Unrecognized frames are delivered too.
    Event(Event),
}

impl Notification {
    pub fn as_event(&self) -> Option<&Event> {
        match self {
            Notification::Event(event) => Some(event),
            Notification::StatusChanged { .. } => None,
        }
    }

    pub fn state(&self) -> Option<ConnectionState> {
        match self {
            Notification::StatusChanged { state, .. } => Some(*state),
            Notification::Event(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert!(!ConnectionState::default().is_connected());
        assert!(ConnectionState::Connected.is_connected());
    }

    #[test]
    fn display_format() {
        assert_eq!(ConnectionState::Reconnecting.to_string(), "reconnecting");
        assert_eq!(Status::ConnectionFailure.to_string(), "connection_failure");
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&ConnectionState::Connected).unwrap();
        assert_eq!(json, "\"connected\"");
        let json = serde_json::to_string(&Status::ConnectionFailure).unwrap();
        assert_eq!(json, "\"connection_failure\"");
    }

    #[test]
    fn notification_accessors() {
        let status = Notification::StatusChanged {
            state: ConnectionState::Connecting,
            status: Status::Connecting,
            message: None,
        };
        assert_eq!(status.state(), Some(ConnectionState::Connecting));
        assert!(status.as_event().is_none());

        let event = Notification::Event(bladelink_frame::parse_frame("<OK>"));
        assert!(event.state().is_none());
        assert_eq!(event.as_event().map(|e| e.frame_type.as_str()), Some("OK"));
    }
}
