use std::time::Duration;

use nxtlink_channel::{ChannelEvent, Intent};
use nxtlink_frame::Capability;
use serde::Serialize;

use crate::cmd::firmware;
use crate::cmd::{FilesArgs, Session};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_rows, OutputFormat};

#[derive(Serialize)]
struct FileRow {
    name: String,
    size: u32,
}

pub fn run(args: FilesArgs, format: OutputFormat) -> CliResult<i32> {
    let session = Session::open(&args.link)?;
    let capability = if args.programs {
        firmware::query(&session)?.1
    } else {
        Capability::Classic
    };

    let mut rows = Vec::new();
    session.submit(
        Intent::FindFiles {
            first: true,
            handle: 0,
            pattern: args.pattern.clone(),
        },
        Duration::ZERO,
    )?;
    loop {
        let entry = session.wait_for("list files", |event| match event {
            ChannelEvent::FileFound(entry) => Some(entry),
            _ => None,
        })?;
        let Some(entry) = entry else { break };

        session.submit(
            Intent::FindFiles {
                first: false,
                handle: entry.handle,
                pattern: args.pattern.clone(),
            },
            Duration::ZERO,
        )?;
        if !args.programs || entry.is_program(capability) {
            rows.push(FileRow {
                name: entry.name,
                size: entry.size,
            });
        }
    }
    session.close()?;

    print_rows(&["NAME", "SIZE"], &rows, format);
    Ok(SUCCESS)
}
