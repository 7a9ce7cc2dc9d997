use std::io::Write;
use std::thread;
use std::time::Instant;

use nxtlink_frame::{command, is_timeout, Frame, FrameConfig, FrameError, FrameReader, FrameWriter, Port};
use nxtlink_transport::{Connector, DeviceAddress, LinkStream, TransportError};
use tracing::{debug, info, warn};

use crate::config::ChannelConfig;
use crate::error::{ConnectError, ReceiveError, SendError};

/// Blocking request/reply primitives over one brick connection.
///
/// The upload protocol is written against this trait so it can run over a
/// real [`Link`] or a scripted brick in tests.
pub trait MessageLink {
    fn send_message(&mut self, frame: &Frame) -> Result<(), SendError>;
    fn receive_message(&mut self) -> Result<Frame, ReceiveError>;
}

/// Open the raw stream for `address`, classifying failures.
pub(crate) fn open_stream(
    connector: &dyn Connector,
    address: &DeviceAddress,
    config: &ChannelConfig,
) -> Result<LinkStream, ConnectError> {
    connector
        .connect(address)
        .map_err(|err| classify_connect_error(address, err, config.pairing))
}

fn classify_connect_error(address: &DeviceAddress, err: TransportError, pairing: bool) -> ConnectError {
    let address = address.to_string();
    match err {
        TransportError::DeviceNotFound { .. } => ConnectError::DeviceNotFound { address },
        source if pairing => ConnectError::PairingRequired { address, source },
        source => ConnectError::Socket { address, source },
    }
}

/// Split a stream into a polling reader and a writer.
pub(crate) fn split_stream(
    stream: LinkStream,
    config: &ChannelConfig,
) -> Result<(FrameReader<LinkStream>, FrameWriter<LinkStream>), FrameError> {
    let frame_config = FrameConfig {
        read_timeout: Some(config.poll_interval),
        ..FrameConfig::default()
    };
    let reader = FrameReader::with_config_link(stream.try_clone()?, frame_config.clone())?;
    let writer = FrameWriter::with_config_link(stream, frame_config)?;
    Ok((reader, writer))
}

/// Stop every motor; used before a link is closed.
pub(crate) fn stop_all_motors<W: Write>(writer: &mut FrameWriter<W>) -> Result<(), FrameError> {
    for port in Port::ALL {
        writer.write_frame(&command::set_output_state(port, 0))?;
    }
    Ok(())
}

/// A synchronous connection to one brick.
///
/// Unlike [`Channel`](crate::Channel) there is no worker and no receive
/// loop: the caller sends a telegram and reads the reply itself.
pub struct Link {
    address: DeviceAddress,
    reader: FrameReader<LinkStream>,
    writer: FrameWriter<LinkStream>,
    config: ChannelConfig,
    open: bool,
}

impl Link {
    /// Connect to the brick at `address`.
    pub fn open(
        connector: &dyn Connector,
        address: &DeviceAddress,
        config: ChannelConfig,
    ) -> Result<Self, ConnectError> {
        let stream = open_stream(connector, address, &config)?;
        let link = Self::from_stream(stream, address.clone(), config)?;
        info!(%address, "link open");
        Ok(link)
    }

    /// Wrap an already connected stream.
    pub fn from_stream(
        stream: LinkStream,
        address: DeviceAddress,
        config: ChannelConfig,
    ) -> Result<Self, ConnectError> {
        let (reader, writer) = split_stream(stream, &config).map_err(|err| ConnectError::Socket {
            address: address.to_string(),
            source: TransportError::Io(frame_io(err)),
        })?;
        Ok(Self {
            address,
            reader,
            writer,
            config,
            open: true,
        })
    }

    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Stop all motors, let them settle, then shut the link down.
    ///
    /// Closing an already closed link does nothing.
    pub fn close(&mut self) -> Result<(), SendError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;

        let stopped = stop_all_motors(&mut self.writer);
        if stopped.is_ok() {
            thread::sleep(self.config.settle_time);
        }
        let shutdown = self.writer.get_ref().shutdown();
        info!(address = %self.address, "link closed");

        stopped?;
        shutdown.map_err(|err| SendError::Frame(err.into()))
    }
}

impl MessageLink for Link {
    fn send_message(&mut self, frame: &Frame) -> Result<(), SendError> {
        if !self.open {
            return Err(SendError::NotConnected);
        }
        debug!(
            opcode = frame.opcode().map(nxtlink_frame::opcode::opcode_name),
            len = frame.len(),
            "send"
        );
        self.writer.write_frame(frame)?;
        Ok(())
    }

    fn receive_message(&mut self) -> Result<Frame, ReceiveError> {
        if !self.open {
            return Err(ReceiveError::NotConnected);
        }
        let deadline = Instant::now() + self.config.reply_timeout;
        loop {
            match self.reader.read_frame() {
                Ok(frame) => {
                    debug!(
                        opcode = frame.opcode().map(nxtlink_frame::opcode::opcode_name),
                        len = frame.len(),
                        "receive"
                    );
                    return Ok(frame);
                }
                Err(err) if is_timeout(&err) => {
                    if Instant::now() >= deadline {
                        warn!(address = %self.address, "brick did not reply");
                        return Err(ReceiveError::Timeout(self.config.reply_timeout));
                    }
                }
                Err(FrameError::ConnectionClosed) => return Err(ReceiveError::ConnectionClosed),
                Err(err) => return Err(err.into()),
            }
        }
    }
}

pub(crate) fn frame_io(err: FrameError) -> std::io::Error {
    match err {
        FrameError::Io(io) => io,
        other => std::io::Error::other(other.to_string()),
    }
}
