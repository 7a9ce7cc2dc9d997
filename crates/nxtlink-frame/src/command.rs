//! Builders for outbound LCP telegrams.
//!
//! Every builder is total over its parameter types: names and text are
//! truncated to their field width, durations are clamped to the range the
//! brick accepts. Range checks that change meaning (motor power clamping)
//! belong to the caller.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bytes::{BufMut, BytesMut};

use crate::codec::Frame;
use crate::opcode::*;

/// Motor output mode bits.
pub const MODE_MOTORON: u8 = 0x01;
pub const MODE_BRAKE: u8 = 0x02;
pub const MODE_REGULATED: u8 = 0x04;

/// Regulation modes.
pub const REGULATION_IDLE: u8 = 0x00;
pub const REGULATION_MOTOR_SPEED: u8 = 0x01;

/// Run states.
pub const RUN_STATE_IDLE: u8 = 0x00;
pub const RUN_STATE_RUNNING: u8 = 0x20;

/// Largest data block one `Write` telegram carries.
pub const MAX_WRITE_CHUNK: usize = 58;
/// Longest file name; the name field is this plus a NUL terminator.
pub const MAX_FILE_NAME_LEN: usize = 19;
/// Longest text a `SayText` telegram carries.
pub const MAX_SPEECH_TEXT_LEN: usize = 18;

/// Tone range the brick can play, in Hz.
pub const MIN_TONE_HZ: u16 = 200;
pub const MAX_TONE_HZ: u16 = 14_000;

/// Vibration range, in milliseconds.
pub const MIN_VIBRATE_MS: u64 = 10;
pub const MAX_VIBRATE_MS: u64 = 2_550;

const NAME_FIELD: usize = MAX_FILE_NAME_LEN + 1;

/// A motor output port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Port {
    A,
    B,
    C,
}

impl Port {
    pub const ALL: [Port; 3] = [Port::A, Port::B, Port::C];

    /// Port number on the wire.
    pub fn index(self) -> u8 {
        match self {
            Port::A => 0,
            Port::B => 1,
            Port::C => 2,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Port::A),
            1 => Some(Port::B),
            2 => Some(Port::C),
            _ => None,
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Port::A => "A",
            Port::B => "B",
            Port::C => "C",
        };
        f.write_str(name)
    }
}

impl FromStr for Port {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" | "0" => Ok(Port::A),
            "B" | "1" => Ok(Port::B),
            "C" | "2" => Ok(Port::C),
            other => Err(format!("unknown motor port: {other}")),
        }
    }
}

/// Speech language (control byte bit 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Local,
}

/// Speech pitch (control byte bit 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pitch {
    #[default]
    Normal,
    Low,
}

/// Speech rate (control byte bits 0-3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeechRate {
    #[default]
    Normal,
    Fast,
    Slow,
}

/// Voice settings packed into the `SayText` control byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Voice {
    pub language: Language,
    pub pitch: Pitch,
    pub rate: SpeechRate,
}

impl Voice {
    pub fn control_byte(self) -> u8 {
        let mut byte = match self.rate {
            SpeechRate::Normal => 0x00,
            SpeechRate::Fast => 0x01,
            SpeechRate::Slow => 0x02,
        };
        if self.language == Language::Local {
            byte |= 0x80;
        }
        if self.pitch == Pitch::Low {
            byte |= 0x40;
        }
        byte
    }

    /// Unknown rate values fall back to normal speed.
    pub fn from_control_byte(byte: u8) -> Self {
        Self {
            language: if byte & 0x80 == 0 {
                Language::English
            } else {
                Language::Local
            },
            pitch: if byte & 0x40 == 0 {
                Pitch::Normal
            } else {
                Pitch::Low
            },
            rate: match byte & 0x0F {
                0x01 => SpeechRate::Fast,
                0x02 => SpeechRate::Slow,
                _ => SpeechRate::Normal,
            },
        }
    }
}

fn telegram(command_type: u8, opcode: u8, params: usize) -> BytesMut {
    let mut buf = BytesMut::with_capacity(2 + params);
    buf.put_u8(command_type);
    buf.put_u8(opcode);
    buf
}

/// Write `text` into a zero-padded field of `width` bytes, truncated so the
/// last byte is always NUL.
fn put_padded(buf: &mut BytesMut, text: &str, width: usize) {
    let bytes = text.as_bytes();
    let len = bytes.len().min(width - 1);
    buf.put_slice(&bytes[..len]);
    buf.put_bytes(0, width - len);
}

/// True if `name` does not fit in a file name field.
pub fn name_truncated(name: &str) -> bool {
    name.len() > MAX_FILE_NAME_LEN
}

/// `PlayTone`: frequency in Hz, duration in ms.
pub fn play_tone(frequency: u16, duration_ms: u16) -> Frame {
    let mut buf = telegram(DIRECT_NO_REPLY, PLAY_TONE, 4);
    buf.put_u16_le(frequency);
    buf.put_u16_le(duration_ms);
    Frame::new(buf.freeze())
}

/// `SetOutputState` running until told otherwise.
///
/// Power 0 encodes a coast stop with every mode byte cleared.
pub fn set_output_state(port: Port, power: i8) -> Frame {
    set_output_state_limited(port, power, 0)
}

/// `SetOutputState` with a tachometer limit in degrees (0 = unlimited).
pub fn set_output_state_limited(port: Port, power: i8, tacho_limit: u32) -> Frame {
    let mut buf = telegram(DIRECT_NO_REPLY, SET_OUTPUT_STATE, 10);
    buf.put_u8(port.index());
    if power == 0 {
        buf.put_i8(0);
        buf.put_u8(0);
        buf.put_u8(REGULATION_IDLE);
        buf.put_i8(0);
        buf.put_u8(RUN_STATE_IDLE);
    } else {
        buf.put_i8(power);
        buf.put_u8(MODE_MOTORON | MODE_BRAKE);
        buf.put_u8(REGULATION_MOTOR_SPEED);
        buf.put_i8(0);
        buf.put_u8(RUN_STATE_RUNNING);
    }
    buf.put_u32_le(tacho_limit);
    Frame::new(buf.freeze())
}

/// `ResetMotorPosition` relative to the last movement.
pub fn reset_motor_position(port: Port) -> Frame {
    let mut buf = telegram(DIRECT_NO_REPLY, RESET_MOTOR_POSITION, 2);
    buf.put_u8(port.index());
    buf.put_u8(0);
    Frame::new(buf.freeze())
}

pub fn get_output_state(port: Port) -> Frame {
    let mut buf = telegram(DIRECT_REPLY, GET_OUTPUT_STATE, 1);
    buf.put_u8(port.index());
    Frame::new(buf.freeze())
}

pub fn get_firmware_version() -> Frame {
    Frame::new(telegram(SYSTEM_REPLY, GET_FIRMWARE_VERSION, 0).freeze())
}

/// `FindFirst` with a search pattern, or `FindNext` continuing from `handle`.
pub fn find_files(first: bool, handle: u8, pattern: &str) -> Frame {
    if first {
        let mut buf = telegram(SYSTEM_REPLY, FIND_FIRST, NAME_FIELD);
        put_padded(&mut buf, pattern, NAME_FIELD);
        Frame::new(buf.freeze())
    } else {
        let mut buf = telegram(SYSTEM_REPLY, FIND_NEXT, 1);
        buf.put_u8(handle);
        Frame::new(buf.freeze())
    }
}

pub fn start_program(name: &str) -> Frame {
    let mut buf = telegram(DIRECT_NO_REPLY, START_PROGRAM, NAME_FIELD);
    put_padded(&mut buf, name, NAME_FIELD);
    Frame::new(buf.freeze())
}

pub fn stop_program() -> Frame {
    Frame::new(telegram(DIRECT_NO_REPLY, STOP_PROGRAM, 0).freeze())
}

pub fn get_current_program_name() -> Frame {
    Frame::new(telegram(DIRECT_REPLY, GET_CURRENT_PROGRAM_NAME, 0).freeze())
}

pub fn open_write(name: &str, length: u32) -> Frame {
    let mut buf = telegram(SYSTEM_REPLY, OPEN_WRITE, NAME_FIELD + 4);
    put_padded(&mut buf, name, NAME_FIELD);
    buf.put_u32_le(length);
    Frame::new(buf.freeze())
}

/// `Write` of at most [`MAX_WRITE_CHUNK`] bytes; anything beyond is dropped.
pub fn write(handle: u8, data: &[u8]) -> Frame {
    let data = &data[..data.len().min(MAX_WRITE_CHUNK)];
    let mut buf = telegram(SYSTEM_REPLY, WRITE, 1 + data.len());
    buf.put_u8(handle);
    buf.put_slice(data);
    Frame::new(buf.freeze())
}

pub fn close(handle: u8) -> Frame {
    let mut buf = telegram(SYSTEM_REPLY, CLOSE, 1);
    buf.put_u8(handle);
    Frame::new(buf.freeze())
}

pub fn delete(name: &str) -> Frame {
    let mut buf = telegram(SYSTEM_REPLY, DELETE, NAME_FIELD);
    put_padded(&mut buf, name, NAME_FIELD);
    Frame::new(buf.freeze())
}

/// Extension `SayText`: control byte, 18 text bytes, NUL.
pub fn say_text(text: &str, voice: Voice) -> Frame {
    let mut buf = telegram(DIRECT_NO_REPLY, SAY_TEXT, 1 + MAX_SPEECH_TEXT_LEN + 1);
    buf.put_u8(voice.control_byte());
    put_padded(&mut buf, text, MAX_SPEECH_TEXT_LEN + 1);
    Frame::new(buf.freeze())
}

/// Extension `VibratePhone`, in tens of milliseconds.
pub fn vibrate_phone(duration: Duration) -> Frame {
    let ms = u64::try_from(duration.as_millis())
        .unwrap_or(u64::MAX)
        .clamp(MIN_VIBRATE_MS, MAX_VIBRATE_MS);
    let mut buf = telegram(DIRECT_NO_REPLY, VIBRATE_PHONE, 1);
    buf.put_u8((ms / 10) as u8);
    Frame::new(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beep_440_for_one_second() {
        let frame = play_tone(440, 1000);
        assert_eq!(frame.as_bytes(), &[0x80, 0x03, 0xB8, 0x01, 0xE8, 0x03]);
        assert_eq!(
            frame.to_wire().unwrap().as_ref(),
            &[0x06, 0x00, 0x80, 0x03, 0xB8, 0x01, 0xE8, 0x03]
        );
    }

    #[test]
    fn motor_running_frame() {
        let frame = set_output_state(Port::B, 75);
        assert_eq!(
            frame.as_bytes(),
            &[0x80, 0x04, 0x01, 75, 0x03, 0x01, 0x00, 0x20, 0, 0, 0, 0]
        );
    }

    #[test]
    fn motor_reverse_power_is_twos_complement() {
        let frame = set_output_state(Port::A, -100);
        assert_eq!(frame.as_bytes()[3], 0x9C);
    }

    #[test]
    fn motor_zero_power_is_coast_stop() {
        let stop = set_output_state(Port::C, 0);
        let run = set_output_state(Port::C, 1);
        assert_eq!(
            stop.as_bytes(),
            &[0x80, 0x04, 0x02, 0, 0, 0, 0, 0, 0, 0, 0, 0]
        );
        assert_ne!(stop.as_bytes()[4], run.as_bytes()[4], "mode byte differs");
    }

    #[test]
    fn motor_tacho_limit_little_endian() {
        let frame = set_output_state_limited(Port::A, -80, 360);
        assert_eq!(frame.len(), 12);
        assert_eq!(&frame.as_bytes()[8..12], &[0x68, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn reset_and_read_state() {
        assert_eq!(reset_motor_position(Port::B).as_bytes(), &[0x80, 0x0A, 0x01, 0x00]);
        let read = get_output_state(Port::C);
        assert_eq!(read.as_bytes(), &[0x00, 0x06, 0x02]);
        assert!(read.expects_reply());
    }

    #[test]
    fn firmware_version_request() {
        let frame = get_firmware_version();
        assert_eq!(frame.as_bytes(), &[0x01, 0x88]);
        assert!(frame.expects_reply());
    }

    #[test]
    fn find_first_sends_terminated_pattern() {
        let frame = find_files(true, 0, "*.*");
        assert_eq!(frame.len(), 22);
        assert_eq!(&frame.as_bytes()[..5], &[0x01, 0x86, b'*', b'.', b'*']);
        assert!(frame.as_bytes()[5..].iter().all(|b| *b == 0));
    }

    #[test]
    fn find_next_sends_handle_only() {
        assert_eq!(find_files(false, 7, "ignored").as_bytes(), &[0x01, 0x87, 0x07]);
    }

    #[test]
    fn program_control_frames() {
        let start = start_program("Pong.rxe");
        assert_eq!(start.len(), 22);
        assert_eq!(&start.as_bytes()[..10], b"\x80\x00Pong.rxe");
        assert_eq!(stop_program().as_bytes(), &[0x80, 0x01]);
        assert_eq!(get_current_program_name().as_bytes(), &[0x00, 0x11]);
    }

    #[test]
    fn open_write_layout() {
        let frame = open_write("Block.rxe", 130);
        let bytes = frame.as_bytes();
        assert_eq!(frame.len(), 26);
        assert_eq!(&bytes[..2], &[0x01, 0x81]);
        assert_eq!(&bytes[2..11], b"Block.rxe");
        assert_eq!(bytes[21], 0);
        assert_eq!(&bytes[22..26], &[130, 0, 0, 0]);
    }

    #[test]
    fn long_names_are_truncated_and_terminated() {
        let name = "a_really_long_program_name.rxe";
        assert!(name_truncated(name));
        let frame = delete(name);
        assert_eq!(frame.len(), 22);
        assert_eq!(&frame.as_bytes()[2..21], &name.as_bytes()[..19]);
        assert_eq!(frame.as_bytes()[21], 0);
    }

    #[test]
    fn write_caps_chunk() {
        let data = [0xAA; 80];
        let frame = write(3, &data);
        assert_eq!(frame.len(), 3 + MAX_WRITE_CHUNK);
        assert_eq!(&frame.as_bytes()[..3], &[0x01, 0x83, 0x03]);

        let small = write(4, &[1, 2, 3]);
        assert_eq!(small.as_bytes(), &[0x01, 0x83, 0x04, 1, 2, 3]);
    }

    #[test]
    fn close_frame() {
        assert_eq!(close(9).as_bytes(), &[0x01, 0x84, 0x09]);
    }

    #[test]
    fn say_text_layout() {
        let voice = Voice {
            language: Language::Local,
            pitch: Pitch::Low,
            rate: SpeechRate::Slow,
        };
        let frame = say_text("hello", voice);
        let bytes = frame.as_bytes();
        assert_eq!(frame.len(), 22);
        assert_eq!(&bytes[..3], &[0x80, 0x30, 0xC2]);
        assert_eq!(&bytes[3..8], b"hello");
        assert_eq!(bytes[21], 0);
    }

    #[test]
    fn say_text_truncates_to_eighteen_chars() {
        let frame = say_text("abcdefghijklmnopqrstuvwxyz", Voice::default());
        assert_eq!(frame.len(), 22);
        assert_eq!(&frame.as_bytes()[3..21], b"abcdefghijklmnopqr");
        assert_eq!(frame.as_bytes()[21], 0);
    }

    #[test]
    fn voice_control_byte_roundtrip() {
        let voice = Voice {
            language: Language::English,
            pitch: Pitch::Normal,
            rate: SpeechRate::Fast,
        };
        assert_eq!(voice.control_byte(), 0x01);
        assert_eq!(Voice::from_control_byte(0x01), voice);
        assert_eq!(Voice::from_control_byte(0x0F).rate, SpeechRate::Normal);
    }

    #[test]
    fn vibrate_clamps_to_range() {
        assert_eq!(vibrate_phone(Duration::from_millis(500)).as_bytes(), &[0x80, 0x31, 50]);
        assert_eq!(vibrate_phone(Duration::from_millis(1)).as_bytes()[2], 1);
        assert_eq!(vibrate_phone(Duration::from_secs(10)).as_bytes()[2], 255);
        assert_eq!(vibrate_phone(Duration::MAX).as_bytes()[2], 255);
    }

    #[test]
    fn port_parsing() {
        assert_eq!("a".parse::<Port>().unwrap(), Port::A);
        assert_eq!("2".parse::<Port>().unwrap(), Port::C);
        assert!("D".parse::<Port>().is_err());
        assert_eq!(Port::from_index(1), Some(Port::B));
        assert_eq!(Port::from_index(3), None);
    }
}
