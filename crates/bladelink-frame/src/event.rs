use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::target::{self, SYS};

/// Classification of an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// `SYS` reply (name, BLID, model, version, ...).
    SystemInfo,
    /// `UMIX`/`UMIXEVENT` frame carrying a mixer.channel sub-address.
    MixerUpdate,
    /// Anything else, including malformed input.
    Unrecognized,
}

impl EventKind {
    /// Classify a frame by its type tag and sub-address.
    pub fn classify(frame_type: &str, subaddr: Option<&str>) -> Self {
        if frame_type == SYS {
            Self::SystemInfo
        } else if target::is_mixer(frame_type) && subaddr.is_some() {
            Self::MixerUpdate
        } else {
            Self::Unrecognized
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SystemInfo => "system_info",
            Self::MixerUpdate => "mixer_update",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed inbound frame.
///
/// Parameter values are already unescaped. A key repeated within one frame
/// keeps its last value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub kind: EventKind,
    /// Raw type tag, e.g. `UMIXEVENT` or `SRC`.
    pub frame_type: String,
    /// Sub-address after the first `:` of the target, e.g. `1.2`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subaddr: Option<String>,
    pub params: BTreeMap<String, String>,
}

impl Event {
    /// Create an event, classifying it from its type tag and sub-address.
    pub fn new(
        frame_type: impl Into<String>,
        subaddr: Option<String>,
        params: BTreeMap<String, String>,
    ) -> Self {
        let frame_type = frame_type.into();
        Self {
            kind: EventKind::classify(&frame_type, subaddr.as_deref()),
            frame_type,
            subaddr,
            params,
        }
    }

    /// Look up a parameter value.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn is_system_info(&self) -> bool {
        self.kind == EventKind::SystemInfo
    }

    pub fn is_mixer_update(&self) -> bool {
        self.kind == EventKind::MixerUpdate
    }
}
