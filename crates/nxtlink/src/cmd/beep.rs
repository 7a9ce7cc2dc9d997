use std::thread;
use std::time::Duration;

use nxtlink_channel::Intent;
use serde::Serialize;

use crate::cmd::{parse_duration, BeepArgs, Session};
use crate::exit::{CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_record, OutputFormat};

/// Silence between consecutive tones.
const TONE_SPACING: Duration = Duration::from_millis(100);

#[derive(Serialize)]
struct BeepOutput {
    device: String,
    frequency_hz: u16,
    duration_ms: u16,
    count: u32,
}

pub fn run(args: BeepArgs, format: OutputFormat) -> CliResult<i32> {
    let duration = parse_duration(&args.duration)?;
    let duration_ms = u16::try_from(duration.as_millis())
        .map_err(|_| CliError::new(USAGE, "tone duration must be below 65s"))?;
    if args.count == 0 {
        return Err(CliError::new(USAGE, "count must be at least 1"));
    }

    let session = Session::open(&args.link)?;
    let period = duration + TONE_SPACING;
    for i in 0..args.count {
        session.submit(Intent::beep(args.frequency, duration_ms), period * i)?;
    }
    thread::sleep(period * args.count);
    session.close()?;

    print_record(
        &BeepOutput {
            device: args.link.device,
            frequency_hz: args.frequency,
            duration_ms,
            count: args.count,
        },
        format,
    );
    Ok(SUCCESS)
}
