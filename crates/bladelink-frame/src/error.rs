/// Errors that can occur while building or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The command cannot be framed without corrupting the stream.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// Inbound text violates the frame grammar.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// A single inbound line exceeded the configured limit.
    #[error("line too long ({len} bytes, max {max})")]
    LineTooLong { len: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
