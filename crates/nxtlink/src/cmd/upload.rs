use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use nxtlink_upload::{
    remote_name, DirBundle, ResourceBundle, UploadConfig, UploadListener, UploadProgress,
    UploadStatus, Uploader,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::cmd::UploadArgs;
use crate::exit::{upload_error, CliError, CliResult, INTERNAL, SUCCESS, TIMEOUT};
use crate::output::{print_record, OutputFormat};

/// Stop waiting for the upload worker after this long.
const UPLOAD_DEADLINE: Duration = Duration::from_secs(600);

#[derive(Serialize)]
struct UploadOutput {
    device: String,
    file: String,
    remote_name: String,
    bytes: u32,
}

pub fn run(args: UploadArgs, format: OutputFormat) -> CliResult<i32> {
    let address = args.link.address()?;
    let config = UploadConfig {
        chunk_size: args.chunk_size,
        channel: args.link.channel_config()?,
    };
    let connector = Arc::new(args.link.connector()?);
    let bundle = args
        .bundle
        .as_ref()
        .map(|dir| Arc::new(DirBundle::new(dir)) as Arc<dyn ResourceBundle>);

    let (done_tx, done) = mpsc::channel();
    let done_tx = Mutex::new(done_tx);
    let listener = move |status: UploadStatus, progress: UploadProgress| {
        match status {
            UploadStatus::Connecting => info!("connecting"),
            UploadStatus::Uploading => debug!(
                sent = progress.bytes_sent,
                total = progress.total_length,
                "uploading"
            ),
            UploadStatus::Idle => {
                if let Ok(tx) = done_tx.lock() {
                    let _ = tx.send(());
                }
            }
        }
    };
    let listener: Arc<dyn UploadListener> = Arc::new(listener);

    let uploader = Uploader::spawn(connector, bundle, config, listener)
        .map_err(|err| CliError::new(INTERNAL, format!("start uploader: {err}")))?;
    uploader
        .enqueue_upload(address, args.file.clone())
        .map_err(|err| CliError::new(INTERNAL, format!("queue upload: {err}")))?;

    let finished = done.recv_timeout(UPLOAD_DEADLINE).is_ok();
    let _ = uploader.request_stop();
    let code = uploader.error_code();
    let bytes = uploader.bytes_uploaded();
    uploader.join();

    if !finished {
        return Err(CliError::new(TIMEOUT, "upload did not finish"));
    }
    if code.is_error() {
        return Err(upload_error(code));
    }

    print_record(
        &UploadOutput {
            device: args.link.device,
            remote_name: remote_name(&args.file).to_string(),
            file: args.file,
            bytes,
        },
        format,
    );
    Ok(SUCCESS)
}
