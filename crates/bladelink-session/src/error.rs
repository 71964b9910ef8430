use bladelink_frame::FrameError;

/// Errors returned to callers of the connection manager.
///
/// Socket failures during a session are not returned here; they surface as
/// status notifications and drive reconnection.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A write was attempted outside the `Connected` state. Nothing was sent.
    #[error("not connected")]
    NotConnected,

    /// The command cannot be framed safely. Nothing was sent.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// The socket failed while writing this request.
    #[error("session I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame-level error other than an invalid command or I/O.
    #[error("frame error: {0}")]
    Frame(FrameError),

    /// The configuration cannot be used to open a session.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The manager's background task is gone.
    #[error("connection manager closed")]
    Closed,
}

impl From<FrameError> for SessionError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::InvalidCommand(msg) => SessionError::InvalidCommand(msg),
            FrameError::Io(io) => SessionError::Io(io),
            other => SessionError::Frame(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
