use std::time::Duration;

use nxtlink_channel::{ChannelEvent, Intent};
use nxtlink_frame::{Capability, FirmwareVersion};
use serde::Serialize;

use crate::cmd::{FirmwareArgs, Session};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct FirmwareOutput {
    device: String,
    protocol: String,
    firmware: String,
    capability: &'static str,
}

pub fn run(args: FirmwareArgs, format: OutputFormat) -> CliResult<i32> {
    let session = Session::open(&args.link)?;
    let (version, capability) = query(&session)?;
    session.close()?;

    print_record(
        &FirmwareOutput {
            device: args.link.device,
            protocol: version.protocol(),
            firmware: version.firmware(),
            capability: capability_name(capability),
        },
        format,
    );
    Ok(SUCCESS)
}

/// Ask for the firmware version and wait for the answer.
pub fn query(session: &Session) -> CliResult<(FirmwareVersion, Capability)> {
    session.submit(Intent::FirmwareVersion, Duration::ZERO)?;
    session.wait_for("firmware version", |event| match event {
        ChannelEvent::FirmwareVersion {
            version,
            capability,
        } => Some((version, capability)),
        _ => None,
    })
}

pub fn capability_name(capability: Capability) -> &'static str {
    match capability {
        Capability::Classic => "classic",
        Capability::Extended => "extended",
    }
}
