//! LCP command types and opcodes.
//!
//! Every telegram starts with a command type byte followed by an opcode.
//! Replies start with [`REPLY`] and echo the opcode they answer.

/// Direct command, reply requested.
pub const DIRECT_REPLY: u8 = 0x00;
/// System command, reply requested.
pub const SYSTEM_REPLY: u8 = 0x01;
/// Reply telegram.
pub const REPLY: u8 = 0x02;
/// Direct command, no reply.
pub const DIRECT_NO_REPLY: u8 = 0x80;
/// System command, no reply.
pub const SYSTEM_NO_REPLY: u8 = 0x81;

// Direct commands.
pub const START_PROGRAM: u8 = 0x00;
pub const STOP_PROGRAM: u8 = 0x01;
pub const PLAY_TONE: u8 = 0x03;
pub const SET_OUTPUT_STATE: u8 = 0x04;
pub const GET_OUTPUT_STATE: u8 = 0x06;
pub const RESET_MOTOR_POSITION: u8 = 0x0A;
pub const GET_CURRENT_PROGRAM_NAME: u8 = 0x11;

// Extension commands understood by the leJOS MINDdroid connector.
pub const SAY_TEXT: u8 = 0x30;
pub const VIBRATE_PHONE: u8 = 0x31;

// System commands.
pub const OPEN_WRITE: u8 = 0x81;
pub const WRITE: u8 = 0x83;
pub const CLOSE: u8 = 0x84;
pub const DELETE: u8 = 0x85;
pub const FIND_FIRST: u8 = 0x86;
pub const FIND_NEXT: u8 = 0x87;
pub const GET_FIRMWARE_VERSION: u8 = 0x88;

/// Returns a human-readable name for an opcode.
///
/// Direct and system opcodes overlap numerically only above 0x80, where
/// every value here is a system command.
pub fn opcode_name(opcode: u8) -> &'static str {
    match opcode {
        START_PROGRAM => "START_PROGRAM",
        STOP_PROGRAM => "STOP_PROGRAM",
        PLAY_TONE => "PLAY_TONE",
        SET_OUTPUT_STATE => "SET_OUTPUT_STATE",
        GET_OUTPUT_STATE => "GET_OUTPUT_STATE",
        RESET_MOTOR_POSITION => "RESET_MOTOR_POSITION",
        GET_CURRENT_PROGRAM_NAME => "GET_CURRENT_PROGRAM_NAME",
        SAY_TEXT => "SAY_TEXT",
        VIBRATE_PHONE => "VIBRATE_PHONE",
        OPEN_WRITE => "OPEN_WRITE",
        WRITE => "WRITE",
        CLOSE => "CLOSE",
        DELETE => "DELETE",
        FIND_FIRST => "FIND_FIRST",
        FIND_NEXT => "FIND_NEXT",
        GET_FIRMWARE_VERSION => "GET_FIRMWARE_VERSION",
        _ => "UNKNOWN",
    }
}

/// Returns true if the command type asks the brick for a reply.
pub fn expects_reply(command_type: u8) -> bool {
    command_type == DIRECT_REPLY || command_type == SYSTEM_REPLY
}

/// Returns true for extension opcodes (not part of stock firmware).
pub fn is_extension(opcode: u8) -> bool {
    opcode == SAY_TEXT || opcode == VIBRATE_PHONE
}
