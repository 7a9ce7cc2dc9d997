/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The telegram exceeds the configured maximum size.
    #[error("telegram too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A reply was expected but the telegram is something else.
    #[error("not a reply telegram (command type 0x{command_type:02X})")]
    NotAReply { command_type: u8 },

    /// A reply answered a different opcode than the one expected.
    #[error("reply for opcode 0x{actual:02X}, expected 0x{expected:02X}")]
    UnexpectedOpcode { expected: u8, actual: u8 },

    /// A telegram is shorter or longer than its opcode's layout.
    #[error("malformed 0x{opcode:02X} telegram ({actual} bytes, expected {expected})")]
    BadLength {
        opcode: u8,
        expected: usize,
        actual: usize,
    },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl From<nxtlink_transport::TransportError> for FrameError {
    fn from(err: nxtlink_transport::TransportError) -> Self {
        match err {
            nxtlink_transport::TransportError::Io(io) => FrameError::Io(io),
            other => FrameError::Io(std::io::Error::other(other.to_string())),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
