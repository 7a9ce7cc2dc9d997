use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::opcode;

/// Length prefix: 2 bytes, little-endian.
pub const HEADER_SIZE: usize = 2;

/// Largest telegram the brick accepts over Bluetooth.
pub const DEFAULT_MAX_PAYLOAD: usize = 64;

/// One LCP telegram: `[cmdType][opcode][params...]`.
///
/// The length prefix is not part of the frame; it is added by
/// [`encode_frame`] and stripped by [`decode_frame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Bytes,
}

impl Frame {
    /// Create a frame from raw telegram bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// The telegram bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Cheap clone of the underlying buffer.
    pub fn bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// First byte of the telegram.
    pub fn command_type(&self) -> Option<u8> {
        self.bytes.first().copied()
    }

    /// Second byte of the telegram.
    pub fn opcode(&self) -> Option<u8> {
        self.bytes.get(1).copied()
    }

    /// True for reply telegrams (`0x02` marker plus at least an opcode).
    pub fn is_reply(&self) -> bool {
        self.bytes.len() >= 2 && self.bytes[0] == opcode::REPLY
    }

    /// True if the brick will answer this telegram.
    pub fn expects_reply(&self) -> bool {
        self.command_type().is_some_and(opcode::expects_reply)
    }

    /// The total wire size of this frame (prefix + telegram).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.bytes.len()
    }

    /// Encode with the length prefix.
    ///
    /// Fails with [`FrameError::PayloadTooLarge`] if the telegram does not
    /// fit the 16-bit prefix.
    pub fn to_wire(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        encode_frame(&self.bytes, &mut buf)?;
        Ok(buf.freeze())
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for Frame {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

/// Encode a telegram into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────┬────────┬──────────────────┐
/// │ Length   │ Cmd type │ Opcode │ Parameters       │
/// │ (2B LE)  │ (1B)     │ (1B)   │ (Length-2 bytes) │
/// └──────────┴──────────┴────────┴──────────────────┘
/// ```
pub fn encode_frame(telegram: &[u8], dst: &mut BytesMut) -> Result<()> {
    if telegram.len() > u16::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: telegram.len(),
            max: u16::MAX as usize,
        });
    }
    dst.reserve(HEADER_SIZE + telegram.len());
    dst.put_u16_le(telegram.len() as u16);
    dst.put_slice(telegram);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    let len = u16::from_le_bytes([src[0], src[1]]) as usize;
    if len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + len;
    if src.len() < total {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let bytes = src.split_to(len).freeze();

    Ok(Some(Frame { bytes }))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum telegram size in bytes. Default: 64.
    pub max_payload_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
