use std::fmt;

use nxtlink_channel::{ConnectError, ReceiveError, SendError};
use nxtlink_frame::FrameError;

/// The brick answered a file-transfer request with something unusable.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Non-zero status byte in a reply.
    #[error("brick rejected {opcode:#04x} with status {status:#04x}")]
    Status { opcode: u8, status: u8 },

    /// Wrong reply type, opcode or length.
    #[error(transparent)]
    Reply(#[from] FrameError),
}

/// Errors from an upload task.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// The local file or bundled resource could not be opened or read.
    #[error("cannot open {name}: {source}")]
    Source {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Send(#[from] SendError),

    #[error(transparent)]
    Receive(#[from] ReceiveError),

    /// Reading the next chunk from the source failed mid-transfer.
    #[error("reading upload source failed: {0}")]
    Read(#[source] std::io::Error),

    /// The link could not be shut down after the transfer.
    #[error("closing link failed: {0}")]
    Close(#[source] SendError),

    #[error("upload worker stopped")]
    WorkerStopped,

    #[error("cannot start upload worker: {0}")]
    Spawn(#[source] std::io::Error),
}

impl UploadError {
    /// The code reported to the upload listener for this failure.
    pub fn code(&self) -> UploadErrorCode {
        match self {
            UploadError::Connect(_) => UploadErrorCode::OpenConnectionError,
            UploadError::Source { .. } => UploadErrorCode::OpenFileError,
            UploadError::Close(_) => UploadErrorCode::CloseConnectionError,
            UploadError::Protocol(_)
            | UploadError::Send(_)
            | UploadError::Receive(_)
            | UploadError::Read(_)
            | UploadError::WorkerStopped
            | UploadError::Spawn(_) => UploadErrorCode::TransferError,
        }
    }
}

/// Last upload failure, kept until the listener resets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadErrorCode {
    #[default]
    None,
    OpenConnectionError,
    CloseConnectionError,
    OpenFileError,
    TransferError,
}

impl UploadErrorCode {
    pub fn is_error(self) -> bool {
        self != UploadErrorCode::None
    }
}

impl fmt::Display for UploadErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            UploadErrorCode::None => "none",
            UploadErrorCode::OpenConnectionError => "cannot connect to brick",
            UploadErrorCode::CloseConnectionError => "cannot close connection",
            UploadErrorCode::OpenFileError => "cannot open file",
            UploadErrorCode::TransferError => "transfer failed",
        };
        f.write_str(text)
    }
}

pub type Result<T> = std::result::Result<T, UploadError>;
