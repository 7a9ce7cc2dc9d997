use std::time::Duration;

use nxtlink_channel::{ChannelEvent, Intent};
use serde::Serialize;

use crate::cmd::{ProgramAction, ProgramArgs, Session};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct ProgramOutput {
    action: &'static str,
    program: Option<String>,
}

pub fn run(args: ProgramArgs, format: OutputFormat) -> CliResult<i32> {
    let session = Session::open(&args.link)?;

    let out = match args.action {
        ProgramAction::Start { name } => {
            session.submit(Intent::StartProgram(name.clone()), Duration::ZERO)?;
            ProgramOutput {
                action: "start",
                program: Some(name),
            }
        }
        ProgramAction::Stop => {
            session.submit(Intent::StopProgram, Duration::ZERO)?;
            ProgramOutput {
                action: "stop",
                program: None,
            }
        }
        ProgramAction::Current => {
            session.submit(Intent::GetProgramName, Duration::ZERO)?;
            let program = session.wait_for("program name", |event| match event {
                ChannelEvent::ProgramName(name) => Some(name),
                _ => None,
            })?;
            ProgramOutput {
                action: "current",
                program,
            }
        }
    };
    session.close()?;

    print_record(&out, format);
    Ok(SUCCESS)
}
