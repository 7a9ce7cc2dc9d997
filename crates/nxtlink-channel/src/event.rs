use std::fmt;
use std::time::Duration;

use nxtlink_frame::{Capability, FileEntry, FirmwareVersion, Port, SpeechRequest};

/// Lifecycle of a channel's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
    /// The link failed and is being torn down.
    Faulted,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnecting => "disconnecting",
            ConnectionState::Faulted => "faulted",
        };
        f.write_str(name)
    }
}

/// Notifications a [`Channel`](crate::Channel) delivers to its controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Connected,
    /// Short user-facing message.
    Toast(String),
    ConnectError(String),
    /// A write failed; the connection is gone.
    SendError(String),
    /// A read failed while connected; the connection is gone.
    ReceiveError(String),
    /// Reply to `ReadMotorState`.
    MotorState { port: Port, position: i32 },
    /// Reply to `FirmwareVersion`, with the capability it implies.
    FirmwareVersion {
        version: FirmwareVersion,
        capability: Capability,
    },
    /// Reply to `FindFiles`; `None` ends the listing.
    FileFound(Option<FileEntry>),
    /// Reply to `GetProgramName`; `None` when no program runs.
    ProgramName(Option<String>),
    /// The brick asks the host to speak.
    SayText(SpeechRequest),
    /// The brick asks the host to vibrate.
    Vibrate(Duration),
    Disconnected,
}
