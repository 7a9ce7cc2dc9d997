use std::path::PathBuf;

/// Errors that can occur while opening or using a brick link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No device is known for the requested address.
    #[error("no device found for {address}")]
    DeviceNotFound { address: String },

    /// The address string could not be parsed.
    #[error("invalid device address: {0:?}")]
    InvalidAddress(String),

    /// The device exists but the serial link could not be opened.
    #[error("failed to open {device}: {source}")]
    Open {
        device: PathBuf,
        source: serialport::Error,
    },

    /// A serial port driver error after the link was opened.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// An I/O error occurred on the link stream.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link has been shut down.
    #[error("link shut down")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, TransportError>;
