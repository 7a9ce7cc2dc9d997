//! File uploads to a LEGO NXT brick.
//!
//! [`upload_file`] runs the LCP transfer sequence over any
//! [`MessageLink`](nxtlink_channel::MessageLink). [`Uploader`] wraps it in a
//! worker thread that serializes upload requests, opens a fresh link for
//! each one and reports status to an [`UploadListener`].

pub mod error;
pub mod protocol;
pub mod source;
pub mod uploader;

pub use error::{ProtocolError, Result, UploadError, UploadErrorCode};
pub use protocol::upload_file;
pub use source::{remote_name, DirBundle, ResourceBundle, UploadSource};
pub use uploader::{UploadConfig, UploadListener, UploadProgress, UploadStatus, Uploader};
