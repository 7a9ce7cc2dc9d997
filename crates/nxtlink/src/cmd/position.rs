use std::time::Duration;

use nxtlink_channel::{ChannelEvent, Intent};
use serde::Serialize;

use crate::cmd::{PositionArgs, Session};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct PositionOutput {
    port: String,
    position: i32,
    reset: bool,
}

pub fn run(args: PositionArgs, format: OutputFormat) -> CliResult<i32> {
    let session = Session::open(&args.link)?;
    if args.reset {
        session.submit(Intent::ResetMotor(args.port), Duration::ZERO)?;
    }
    session.submit(Intent::ReadMotorState(args.port), Duration::ZERO)?;

    let port = args.port;
    let position = session.wait_for("read motor", |event| match event {
        ChannelEvent::MotorState { port: p, position } if p == port => Some(position),
        _ => None,
    })?;
    session.close()?;

    print_record(
        &PositionOutput {
            port: port.to_string(),
            position,
            reset: args.reset,
        },
        format,
    );
    Ok(SUCCESS)
}
