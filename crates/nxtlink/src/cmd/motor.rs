use std::thread;
use std::time::Duration;

use nxtlink_channel::{ChannelEvent, Intent};
use serde::Serialize;

use crate::cmd::{parse_duration, MotorArgs, Session};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

/// Time allowed for a bounded rotation to finish before the motor is read.
const ROTATION_WAIT: Duration = Duration::from_secs(2);

#[derive(Serialize)]
struct MotorOutput {
    port: String,
    power: i32,
    mode: &'static str,
    position: i32,
}

pub fn run(args: MotorArgs, format: OutputFormat) -> CliResult<i32> {
    let session = Session::open(&args.link)?;

    let mode = match args.rotate {
        Some(degrees) => {
            session.submit(Intent::rotate_to(args.port, degrees), Duration::ZERO)?;
            thread::sleep(ROTATION_WAIT);
            "rotate"
        }
        None => {
            let run_for = parse_duration(&args.run_for)?;
            session.submit(Intent::motor(args.port, args.power), Duration::ZERO)?;
            session.submit(Intent::motor(args.port, 0), run_for)?;
            thread::sleep(run_for);
            "timed"
        }
    };

    session.submit(Intent::ReadMotorState(args.port), Duration::ZERO)?;
    let port = args.port;
    let position = session.wait_for("read motor", |event| match event {
        ChannelEvent::MotorState { port: p, position } if p == port => Some(position),
        _ => None,
    })?;
    session.close()?;

    print_record(
        &MotorOutput {
            port: args.port.to_string(),
            power: nxtlink_channel::clamp_power(args.power).into(),
            mode,
            position,
        },
        format,
    );
    Ok(SUCCESS)
}
