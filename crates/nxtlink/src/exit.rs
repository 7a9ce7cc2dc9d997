use std::fmt;
use std::io;

use nxtlink_channel::{ChannelError, ConnectError, ReceiveError, SendError};
use nxtlink_frame::FrameError;
use nxtlink_transport::TransportError;
use nxtlink_upload::UploadErrorCode;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DEVICE_NOT_FOUND: i32 = 4;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const NO_INPUT: i32 = 66;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => DEVICE_NOT_FOUND,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::DeviceNotFound { .. } => {
            CliError::new(DEVICE_NOT_FOUND, format!("{context}: {err}"))
        }
        TransportError::InvalidAddress(_) => CliError::new(USAGE, format!("{context}: {err}")),
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn connect_error(context: &str, err: ConnectError) -> CliError {
    match err {
        ConnectError::DeviceNotFound { .. } => {
            CliError::new(DEVICE_NOT_FOUND, format!("{context}: {err}"))
        }
        ConnectError::Socket { source, .. } => transport_error(context, source),
        ConnectError::PairingRequired { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
    }
}

pub fn channel_error(context: &str, err: ChannelError) -> CliError {
    match err {
        ChannelError::Connect(err) => connect_error(context, err),
        ChannelError::Send(SendError::Frame(err)) => frame_error(context, err),
        ChannelError::Receive(ReceiveError::Timeout(_)) => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        ChannelError::Receive(ReceiveError::Frame(err)) => frame_error(context, err),
        ChannelError::NotConnected => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn upload_error(code: UploadErrorCode) -> CliError {
    let exit = match code {
        UploadErrorCode::None => SUCCESS,
        UploadErrorCode::OpenConnectionError => DEVICE_NOT_FOUND,
        UploadErrorCode::OpenFileError => NO_INPUT,
        UploadErrorCode::CloseConnectionError => TRANSPORT_ERROR,
        UploadErrorCode::TransferError => FAILURE,
    };
    CliError::new(exit, format!("upload failed: {code}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_device_maps_to_device_not_found() {
        let err = connect_error(
            "connect",
            ConnectError::DeviceNotFound {
                address: "/dev/rfcomm9".into(),
            },
        );
        assert_eq!(err.code, DEVICE_NOT_FOUND);
        assert!(err.message.contains("/dev/rfcomm9"));
    }

    #[test]
    fn reply_timeout_maps_to_timeout() {
        let err = channel_error(
            "firmware",
            ChannelError::Receive(ReceiveError::Timeout(std::time::Duration::from_secs(1))),
        );
        assert_eq!(err.code, TIMEOUT);
    }

    #[test]
    fn upload_codes_have_distinct_exits() {
        assert_eq!(upload_error(UploadErrorCode::OpenFileError).code, NO_INPUT);
        assert_eq!(upload_error(UploadErrorCode::TransferError).code, FAILURE);
    }
}
