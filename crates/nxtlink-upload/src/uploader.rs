use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use nxtlink_channel::{ChannelConfig, Link};
use nxtlink_frame::MAX_WRITE_CHUNK;
use nxtlink_transport::{Connector, DeviceAddress};
use tracing::{debug, info, warn};

use crate::error::{Result, UploadError, UploadErrorCode};
use crate::protocol::upload_file;
use crate::source::{ResourceBundle, UploadSource};

/// What the upload worker is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Idle,
    Connecting,
    Uploading,
}

/// Progress of the current upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadProgress {
    pub total_length: u32,
    pub bytes_sent: u32,
}

/// Receives status changes from the upload worker.
///
/// Called on the worker thread. Any `Fn(UploadStatus, UploadProgress)`
/// closure works as a listener.
pub trait UploadListener: Send + Sync {
    fn on_update(&self, status: UploadStatus, progress: UploadProgress);
}

impl<F> UploadListener for F
where
    F: Fn(UploadStatus, UploadProgress) + Send + Sync,
{
    fn on_update(&self, status: UploadStatus, progress: UploadProgress) {
        self(status, progress)
    }
}

/// Uploader settings.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Bytes per `Write` telegram, at most [`MAX_WRITE_CHUNK`].
    pub chunk_size: usize,
    /// Settings for the link opened for each upload.
    pub channel: ChannelConfig,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: MAX_WRITE_CHUNK,
            channel: ChannelConfig::default(),
        }
    }
}

enum Task {
    Upload { address: DeviceAddress, name: String },
    Stop,
}

#[derive(Default)]
struct State {
    error_code: Mutex<UploadErrorCode>,
    file_length: AtomicU32,
    bytes_uploaded: AtomicU32,
}

impl State {
    fn error_code(&self) -> MutexGuard<'_, UploadErrorCode> {
        self.error_code.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn progress(&self) -> UploadProgress {
        UploadProgress {
            total_length: self.file_length.load(Ordering::SeqCst),
            bytes_sent: self.bytes_uploaded.load(Ordering::SeqCst),
        }
    }
}

/// Runs uploads one after another on a dedicated thread.
///
/// Each upload opens its own [`Link`], so it never shares a connection with
/// a [`Channel`](nxtlink_channel::Channel) receive loop.
pub struct Uploader {
    tasks: Sender<Task>,
    state: Arc<State>,
    worker: Option<JoinHandle<()>>,
}

impl Uploader {
    /// Start the worker thread.
    ///
    /// `bundle` serves names without a `/`; without one only filesystem
    /// paths can be uploaded.
    pub fn spawn(
        connector: Arc<dyn Connector>,
        bundle: Option<Arc<dyn ResourceBundle>>,
        config: UploadConfig,
        listener: Arc<dyn UploadListener>,
    ) -> Result<Self> {
        let (tasks, rx) = mpsc::channel();
        let state = Arc::new(State::default());

        let worker = Worker {
            connector,
            bundle,
            config,
            listener,
            state: Arc::clone(&state),
        };
        let handle = thread::Builder::new()
            .name("nxtlink-upload".to_string())
            .spawn(move || worker.run(rx))
            .map_err(UploadError::Spawn)?;

        Ok(Self {
            tasks,
            state,
            worker: Some(handle),
        })
    }

    /// Queue an upload of `name` to the brick at `address`.
    pub fn enqueue_upload(&self, address: DeviceAddress, name: impl Into<String>) -> Result<()> {
        self.post(Task::Upload {
            address,
            name: name.into(),
        })
    }

    /// Ask the worker to exit once the queued tasks before this one finish.
    pub fn request_stop(&self) -> Result<()> {
        self.post(Task::Stop)
    }

    /// Wait for the worker thread to exit.
    pub fn join(mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    /// The last failure, until [`reset_error_code`](Self::reset_error_code).
    pub fn error_code(&self) -> UploadErrorCode {
        *self.state.error_code()
    }

    pub fn reset_error_code(&self) {
        *self.state.error_code() = UploadErrorCode::None;
    }

    /// Length of the file being uploaded.
    pub fn file_length(&self) -> u32 {
        self.state.file_length.load(Ordering::SeqCst)
    }

    pub fn bytes_uploaded(&self) -> u32 {
        self.state.bytes_uploaded.load(Ordering::SeqCst)
    }

    fn post(&self, task: Task) -> Result<()> {
        self.tasks.send(task).map_err(|_| UploadError::WorkerStopped)
    }
}

impl Drop for Uploader {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.tasks.send(Task::Stop);
            let _ = worker.join();
        }
    }
}

struct Worker {
    connector: Arc<dyn Connector>,
    bundle: Option<Arc<dyn ResourceBundle>>,
    config: UploadConfig,
    listener: Arc<dyn UploadListener>,
    state: Arc<State>,
}

impl Worker {
    fn run(self, tasks: Receiver<Task>) {
        while let Ok(task) = tasks.recv() {
            match task {
                Task::Upload { address, name } => self.upload(&address, &name),
                Task::Stop => break,
            }
        }
        debug!("upload worker stopped");
    }

    fn upload(&self, address: &DeviceAddress, name: &str) {
        self.state.file_length.store(0, Ordering::SeqCst);
        self.state.bytes_uploaded.store(0, Ordering::SeqCst);
        self.signal(UploadStatus::Connecting);
        let mut failed = false;

        match Link::open(self.connector.as_ref(), address, self.config.channel.clone()) {
            Ok(mut link) => {
                self.signal(UploadStatus::Uploading);
                if let Err(err) = self.transfer(&mut link, name) {
                    self.record(&err);
                    failed = true;
                }
                if let Err(err) = link.close() {
                    let err = UploadError::Close(err);
                    if failed {
                        warn!(%err, "ignoring close failure after earlier error");
                    } else {
                        self.record(&err);
                    }
                }
            }
            Err(err) => self.record(&UploadError::Connect(err)),
        }

        self.signal(UploadStatus::Idle);
    }

    fn transfer(&self, link: &mut Link, name: &str) -> Result<()> {
        let source = UploadSource::resolve(name, self.bundle.as_deref())?;
        self.state.file_length.store(source.length(), Ordering::SeqCst);
        self.state.bytes_uploaded.store(0, Ordering::SeqCst);

        let remote = source.remote_name().to_string();
        let length = source.length();
        upload_file(
            link,
            &remote,
            source.into_reader(),
            length,
            self.config.chunk_size,
            |sent| {
                self.state.bytes_uploaded.store(sent, Ordering::SeqCst);
                self.signal(UploadStatus::Uploading);
            },
        )?;
        info!(address = %link.address(), name = %remote, "uploaded");
        Ok(())
    }

    fn record(&self, err: &UploadError) {
        warn!(%err, "upload failed");
        *self.state.error_code() = err.code();
    }

    fn signal(&self, status: UploadStatus) {
        self.listener.on_update(status, self.state.progress());
    }
}
