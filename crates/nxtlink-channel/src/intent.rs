use nxtlink_frame::{command, Frame, Port};

/// Power used by bounded rotations.
pub const ROTATE_POWER: i32 = -80;

/// Default search pattern for file listings.
pub const ALL_FILES: &str = "*.*";

/// Something the controller wants the brick to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Play a tone (Hz, ms).
    Beep { frequency: u16, duration_ms: u16 },
    /// Run a motor until told otherwise; 0 stops it.
    Motor { port: Port, power: i32 },
    /// Run a motor for `tacho_limit` degrees.
    RotateMotor {
        port: Port,
        power: i32,
        tacho_limit: u32,
    },
    ResetMotor(Port),
    /// Ask for the output state; answered by a `MotorState` event.
    ReadMotorState(Port),
    /// Ask for the firmware version; answered by a `FirmwareVersion` event.
    FirmwareVersion,
    /// Start or continue a file listing; answered by `FileFound` events.
    FindFiles {
        first: bool,
        handle: u8,
        pattern: String,
    },
    StartProgram(String),
    StopProgram,
    /// Ask which program runs; answered by a `ProgramName` event.
    GetProgramName,
}

impl Intent {
    pub fn motor(port: Port, power: i32) -> Self {
        Intent::Motor { port, power }
    }

    pub fn beep(frequency: u16, duration_ms: u16) -> Self {
        Intent::Beep {
            frequency,
            duration_ms,
        }
    }

    /// Rotate a motor to `degrees` at the standard rotation power.
    pub fn rotate_to(port: Port, degrees: u32) -> Self {
        Intent::RotateMotor {
            port,
            power: ROTATE_POWER,
            tacho_limit: degrees,
        }
    }

    /// First page of a file listing with the default pattern.
    pub fn list_files() -> Self {
        Intent::FindFiles {
            first: true,
            handle: 0,
            pattern: ALL_FILES.to_string(),
        }
    }

    /// Encode as a telegram. Motor power is clamped to `[-100, 100]`.
    pub fn to_frame(&self) -> Frame {
        match self {
            Intent::Beep {
                frequency,
                duration_ms,
            } => command::play_tone(*frequency, *duration_ms),
            Intent::Motor { port, power } => command::set_output_state(*port, clamp_power(*power)),
            Intent::RotateMotor {
                port,
                power,
                tacho_limit,
            } => command::set_output_state_limited(*port, clamp_power(*power), *tacho_limit),
            Intent::ResetMotor(port) => command::reset_motor_position(*port),
            Intent::ReadMotorState(port) => command::get_output_state(*port),
            Intent::FirmwareVersion => command::get_firmware_version(),
            Intent::FindFiles {
                first,
                handle,
                pattern,
            } => command::find_files(*first, *handle, pattern),
            Intent::StartProgram(name) => command::start_program(name),
            Intent::StopProgram => command::stop_program(),
            Intent::GetProgramName => command::get_current_program_name(),
        }
    }

    pub fn is_beep(&self) -> bool {
        matches!(self, Intent::Beep { .. })
    }
}

/// Clamp a requested motor power to the range the brick accepts.
pub fn clamp_power(power: i32) -> i8 {
    power.clamp(-100, 100) as i8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_is_clamped() {
        assert_eq!(clamp_power(250), 100);
        assert_eq!(clamp_power(-1000), -100);
        assert_eq!(clamp_power(42), 42);

        for power in [-500, -101, -100, -1, 0, 1, 100, 101, 500] {
            let frame = Intent::motor(Port::A, power).to_frame();
            let encoded = frame.as_bytes()[3] as i8;
            assert!((-100..=100).contains(&encoded), "power {power} encoded as {encoded}");
        }
    }

    #[test]
    fn zero_power_is_stop_mode() {
        let stop = Intent::motor(Port::B, 0).to_frame();
        let run = Intent::motor(Port::B, 30).to_frame();
        assert_eq!(stop.as_bytes()[4], 0);
        assert_ne!(stop.as_bytes()[4], run.as_bytes()[4]);
    }

    #[test]
    fn rotate_to_uses_limited_reverse_power() {
        let frame = Intent::rotate_to(Port::C, 90).to_frame();
        assert_eq!(frame.as_bytes()[3] as i8, -80);
        assert_eq!(&frame.as_bytes()[8..], &[90, 0, 0, 0]);
    }

    #[test]
    fn beep_matches_codec() {
        let frame = Intent::beep(440, 1000).to_frame();
        assert_eq!(frame.as_bytes(), &[0x80, 0x03, 0xB8, 0x01, 0xE8, 0x03]);
        assert!(Intent::beep(440, 1000).is_beep());
        assert!(!Intent::StopProgram.is_beep());
    }

    #[test]
    fn list_files_starts_with_pattern() {
        let frame = Intent::list_files().to_frame();
        assert_eq!(frame.opcode(), Some(0x86));
        assert_eq!(&frame.as_bytes()[2..5], b"*.*");
    }
}
