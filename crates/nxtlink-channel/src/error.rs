use std::time::Duration;

use nxtlink_frame::FrameError;
use nxtlink_transport::TransportError;

/// Why a connection attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// No device answers to the address.
    #[error("no brick found at {address}")]
    DeviceNotFound { address: String },

    /// The device exists but the link could not be opened.
    #[error("cannot open link to {address}: {source}")]
    Socket {
        address: String,
        #[source]
        source: TransportError,
    },

    /// The link could not be opened while the brick is still being paired.
    #[error("cannot open link to {address}; accept the pairing request on the brick and retry")]
    PairingRequired {
        address: String,
        #[source]
        source: TransportError,
    },
}

/// A telegram could not be written; the link is considered faulted.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("not connected")]
    NotConnected,

    #[error("send failed: {0}")]
    Frame(#[from] FrameError),
}

/// A telegram could not be read.
#[derive(Debug, thiserror::Error)]
pub enum ReceiveError {
    #[error("not connected")]
    NotConnected,

    /// No telegram arrived within the reply timeout.
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    /// The brick closed the link.
    #[error("connection closed by brick")]
    ConnectionClosed,

    /// Read failure or malformed telegram.
    #[error("receive failed: {0}")]
    Frame(#[from] FrameError),
}

/// Errors surfaced by [`Channel`](crate::Channel) operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Send(#[from] SendError),

    #[error(transparent)]
    Receive(#[from] ReceiveError),

    /// The operation needs a connected brick.
    #[error("not connected")]
    NotConnected,

    /// The worker thread has exited.
    #[error("channel worker stopped")]
    WorkerStopped,

    #[error("cannot start worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
