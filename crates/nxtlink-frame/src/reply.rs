//! Decoders for inbound telegrams.
//!
//! Replies have the layout `[0x02][opcode][status][result...]`. The brick
//! pads string fields with NULs; decoders strip them.

use std::time::Duration;

use bytes::Bytes;

use crate::codec::Frame;
use crate::command::{Voice, MAX_FILE_NAME_LEN};
use crate::error::{FrameError, Result};
use crate::opcode;

pub const STATUS_SUCCESS: u8 = 0x00;
pub const STATUS_FILE_NOT_FOUND: u8 = 0x87;
pub const STATUS_FILE_EXISTS: u8 = 0x8F;
pub const STATUS_NO_ACTIVE_PROGRAM: u8 = 0xEC;

/// Reply sizes, marker and opcode included.
pub const OUTPUT_STATE_REPLY_LEN: usize = 25;
pub const FIRMWARE_REPLY_LEN: usize = 7;
pub const OPEN_WRITE_REPLY_LEN: usize = 4;
pub const WRITE_REPLY_LEN: usize = 6;
pub const CLOSE_REPLY_LEN: usize = 4;
pub const DELETE_REPLY_LEN: usize = 23;
pub const FIND_REPLY_LEN: usize = 28;
pub const PROGRAM_NAME_REPLY_LEN: usize = 23;

/// Offset of the rotation counter in a `GetOutputState` reply.
pub const ROTATION_COUNT_OFFSET: usize = 21;

/// Version bytes a leJOS MINDdroid connector reports instead of real ones.
pub const LEJOS_MINDDROID_VERSION: [u8; 4] = [0x6C, 0x4D, 0x49, 0x64];

const NAME_FIELD: usize = MAX_FILE_NAME_LEN + 1;

/// A validated reply telegram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    bytes: Bytes,
}

impl Reply {
    /// Accept a frame carrying the reply marker, an opcode and a status byte.
    pub fn parse(frame: &Frame) -> Result<Self> {
        if !frame.is_reply() {
            return Err(FrameError::NotAReply {
                command_type: frame.command_type().unwrap_or_default(),
            });
        }
        if frame.len() < 3 {
            return Err(FrameError::BadLength {
                opcode: frame.opcode().unwrap_or_default(),
                expected: 3,
                actual: frame.len(),
            });
        }
        Ok(Self {
            bytes: frame.bytes(),
        })
    }

    /// Check that this reply answers `opcode` and has exactly `len` bytes.
    pub fn expect(&self, opcode: u8, len: usize) -> Result<&Self> {
        if self.opcode() != opcode {
            return Err(FrameError::UnexpectedOpcode {
                expected: opcode,
                actual: self.opcode(),
            });
        }
        if self.bytes.len() != len {
            return Err(FrameError::BadLength {
                opcode,
                expected: len,
                actual: self.bytes.len(),
            });
        }
        Ok(self)
    }

    pub fn opcode(&self) -> u8 {
        self.bytes[1]
    }

    pub fn status(&self) -> u8 {
        self.bytes[2]
    }

    pub fn is_success(&self) -> bool {
        self.status() == STATUS_SUCCESS
    }

    /// The handle byte of file-transfer replies.
    pub fn handle(&self) -> Option<u8> {
        self.bytes.get(3).copied()
    }

    /// Result bytes after the status.
    pub fn body(&self) -> &[u8] {
        &self.bytes[3..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn i32_at(bytes: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Read a NUL-padded string field.
fn string_field(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Decoded `GetOutputState` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputState {
    pub port: u8,
    pub power: i8,
    pub mode: u8,
    pub regulation: u8,
    pub turn_ratio: i8,
    pub run_state: u8,
    pub tacho_limit: u32,
    pub tacho_count: i32,
    pub block_tacho_count: i32,
    pub rotation_count: i32,
}

impl OutputState {
    /// Accepts replies of at least the documented length; some firmwares
    /// append trailing bytes.
    pub fn decode(reply: &Reply) -> Result<Self> {
        let b = reply.as_bytes();
        if reply.opcode() != opcode::GET_OUTPUT_STATE {
            return Err(FrameError::UnexpectedOpcode {
                expected: opcode::GET_OUTPUT_STATE,
                actual: reply.opcode(),
            });
        }
        if b.len() < OUTPUT_STATE_REPLY_LEN {
            return Err(FrameError::BadLength {
                opcode: opcode::GET_OUTPUT_STATE,
                expected: OUTPUT_STATE_REPLY_LEN,
                actual: b.len(),
            });
        }
        Ok(Self {
            port: b[3],
            power: b[4] as i8,
            mode: b[5],
            regulation: b[6],
            turn_ratio: b[7] as i8,
            run_state: b[8],
            tacho_limit: u32_at(b, 9),
            tacho_count: i32_at(b, 13),
            block_tacho_count: i32_at(b, 17),
            rotation_count: i32_at(b, ROTATION_COUNT_OFFSET),
        })
    }

    /// Motor position in degrees.
    pub fn position(&self) -> i32 {
        self.rotation_count
    }
}

/// Protocol flavour spoken by the brick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capability {
    /// Stock LEGO firmware.
    #[default]
    Classic,
    /// leJOS program with the MINDdroid connector (understands extensions).
    Extended,
}

/// Decoded `GetFirmwareVersion` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub protocol_minor: u8,
    pub protocol_major: u8,
    pub firmware_minor: u8,
    pub firmware_major: u8,
}

impl FirmwareVersion {
    pub fn decode(reply: &Reply) -> Result<Self> {
        let b = reply
            .expect(opcode::GET_FIRMWARE_VERSION, FIRMWARE_REPLY_LEN)?
            .as_bytes();
        Ok(Self {
            protocol_minor: b[3],
            protocol_major: b[4],
            firmware_minor: b[5],
            firmware_major: b[6],
        })
    }

    pub fn raw(&self) -> [u8; 4] {
        [
            self.protocol_minor,
            self.protocol_major,
            self.firmware_minor,
            self.firmware_major,
        ]
    }

    pub fn capability(&self) -> Capability {
        if self.raw() == LEJOS_MINDDROID_VERSION {
            Capability::Extended
        } else {
            Capability::Classic
        }
    }

    pub fn protocol(&self) -> String {
        format!("{}.{}", self.protocol_major, self.protocol_minor)
    }

    pub fn firmware(&self) -> String {
        format!("{}.{:02}", self.firmware_major, self.firmware_minor)
    }
}

/// One `FindFirst`/`FindNext` result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub handle: u8,
    pub name: String,
    pub size: u32,
}

impl FileEntry {
    /// Decode a successful find reply. A non-zero status (no more files)
    /// decodes to `None`.
    pub fn decode(reply: &Reply) -> Result<Option<Self>> {
        let op = reply.opcode();
        if op != opcode::FIND_FIRST && op != opcode::FIND_NEXT {
            return Err(FrameError::UnexpectedOpcode {
                expected: opcode::FIND_FIRST,
                actual: op,
            });
        }
        if !reply.is_success() {
            return Ok(None);
        }
        let b = reply.expect(op, FIND_REPLY_LEN)?.as_bytes();
        Ok(Some(Self {
            handle: b[3],
            name: string_field(&b[4..4 + NAME_FIELD]),
            size: u32_at(b, 4 + NAME_FIELD),
        }))
    }

    /// Whether the file is a program the brick can start.
    pub fn is_program(&self, capability: Capability) -> bool {
        match capability {
            Capability::Extended => true,
            Capability::Classic => self.name.ends_with(".rxe") || self.name.ends_with(".nxj"),
        }
    }
}

/// Decoded `GetCurrentProgramName` reply: `None` when nothing is running.
pub fn decode_program_name(reply: &Reply) -> Result<Option<String>> {
    if reply.opcode() != opcode::GET_CURRENT_PROGRAM_NAME {
        return Err(FrameError::UnexpectedOpcode {
            expected: opcode::GET_CURRENT_PROGRAM_NAME,
            actual: reply.opcode(),
        });
    }
    if reply.status() == STATUS_NO_ACTIVE_PROGRAM {
        return Ok(None);
    }
    let b = reply
        .expect(opcode::GET_CURRENT_PROGRAM_NAME, PROGRAM_NAME_REPLY_LEN)?
        .as_bytes();
    Ok(Some(string_field(&b[3..])))
}

/// Text the brick asks the host to speak.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub voice: Voice,
    pub text: String,
}

impl SpeechRequest {
    /// Decode an inbound `SayText` telegram.
    pub fn decode(frame: &Frame) -> Result<Self> {
        let b = frame.as_bytes();
        expect_extension(frame, opcode::SAY_TEXT, 3)?;
        Ok(Self {
            voice: Voice::from_control_byte(b[2]),
            text: string_field(&b[3..]),
        })
    }
}

/// Decode an inbound `VibratePhone` telegram.
pub fn decode_vibrate(frame: &Frame) -> Result<Duration> {
    expect_extension(frame, opcode::VIBRATE_PHONE, 3)?;
    Ok(Duration::from_millis(u64::from(frame.as_bytes()[2]) * 10))
}

fn expect_extension(frame: &Frame, op: u8, min_len: usize) -> Result<()> {
    if frame.opcode() != Some(op) {
        return Err(FrameError::UnexpectedOpcode {
            expected: op,
            actual: frame.opcode().unwrap_or_default(),
        });
    }
    if frame.len() < min_len {
        return Err(FrameError::BadLength {
            opcode: op,
            expected: min_len,
            actual: frame.len(),
        });
    }
    Ok(())
}
