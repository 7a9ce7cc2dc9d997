//! LEGO Communication Protocol (LCP) telegrams and their Bluetooth framing.
//!
//! Every telegram on the wire is prefixed with:
//! - A 2-byte little-endian length of the telegram that follows
//!
//! followed by a command type byte, an opcode and opcode-specific parameters.
//! [`command`] builds outbound telegrams, [`reply`] decodes inbound ones, and
//! [`FrameReader`]/[`FrameWriter`] move them over any byte stream.

pub mod codec;
pub mod command;
pub mod error;
pub mod opcode;
pub mod reader;
pub mod reply;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

#[cfg(feature = "async")]
pub use async_codec::LcpCodec;
pub use codec::{decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE};
pub use command::{Language, Pitch, Port, SpeechRate, Voice, MAX_WRITE_CHUNK};
pub use error::{FrameError, Result};
pub use reader::{is_timeout, FrameReader};
pub use reply::{Capability, FileEntry, FirmwareVersion, OutputState, Reply, SpeechRequest};
pub use writer::FrameWriter;
