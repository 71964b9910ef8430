//! Frame codec for Axia/Telos Blade routing devices.
//!
//! The device speaks a line-oriented ASCII protocol over TCP. Every message
//! is a single bracketed frame:
//! - `<TARGET[:SUBADDR]>` optionally followed by `|KEY:VALUE,KEY:VALUE...`
//! - values escape `| : ? < >` with a leading `/`
//! - frames are terminated by CRLF on the wire
//!
//! Everything in this crate is pure: no sockets, no timers.

pub mod catalog;
pub mod codec;
pub mod command;
pub mod error;
pub mod escape;
pub mod event;
pub mod frame;
pub mod target;

pub use codec::{ensure_encodable, BladeCodec, DEFAULT_MAX_LINE_LENGTH, LINE_TERMINATOR};
pub use command::Command;
pub use error::{FrameError, Result};
pub use escape::{escape, unescape};
pub use event::{Event, EventKind};
pub use frame::{build_frame, build_query, parse_frame, HEARTBEAT};
pub use target::{DST, LIO, MIC, SALVO, SLIO, SRC, SYS, UMIX, UMIXEVENT, UMIXSUB};
