//! Control protocol client for Axia/Telos Blade audio routing devices.
//!
//! Blades speak a line-oriented text protocol over TCP: bracketed frames such
//! as `<UMIX:1.2|ON:1>` with `/`-escaped values, plus `<>` heartbeats.
//!
//! # Crate Structure
//!
//! - [`frame`]: escaping, frame build/parse, the line codec and typed commands
//! - [`session`]: the connection manager (heartbeat, timeout, reconnect)

/// Re-export frame types.
pub mod frame {
    pub use bladelink_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use bladelink_session::*;
}
