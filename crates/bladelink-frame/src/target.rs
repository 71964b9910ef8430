//! Well-known frame targets.
//!
//! The device vocabulary is open-ended; these are the object classes the
//! codec classifies or the command catalog builds.

/// System object (identity, subscription rate, system info replies).
pub const SYS: &str = "SYS";

/// Utility mixer command target.
pub const UMIX: &str = "UMIX";

/// Utility mixer change notification.
pub const UMIXEVENT: &str = "UMIXEVENT";

/// Utility mixer subscription request.
pub const UMIXSUB: &str = "UMIXSUB";

/// Routing destination.
pub const DST: &str = "DST";

/// Routing source.
pub const SRC: &str = "SRC";

/// Preset salvo.
pub const SALVO: &str = "SALVO";

/// Stereo logical I/O.
pub const SLIO: &str = "SLIO";

/// Logical I/O.
pub const LIO: &str = "LIO";

/// Microphone preamp.
pub const MIC: &str = "MIC";

/// Returns true if the target carries utility mixer state.
pub fn is_mixer(target: &str) -> bool {
    target == UMIX || target == UMIXEVENT
}
