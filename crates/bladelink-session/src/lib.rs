//! Connection management for Axia/Telos Blade devices.
//!
//! A [`ConnectionManager`] owns exactly one TCP session at a time. It buffers
//! inbound bytes into frames, sends heartbeats, declares the link dead when
//! the device goes silent, and reconnects after a fixed delay. Callers send
//! [`Command`](bladelink_frame::Command)s and observe the session through a
//! [`Notifications`] stream of status changes and parsed events.

pub mod clock;
pub mod config;
mod driver;
pub mod error;
pub mod manager;
pub mod mixer;
pub mod state;
mod transport;

pub use clock::HeartbeatClock;
pub use config::{SessionConfig, DEFAULT_PORT};
pub use error::{Result, SessionError};
pub use manager::{ConnectionManager, Notifications};
pub use mixer::MixerState;
pub use state::{ConnectionState, Notification, Status};
