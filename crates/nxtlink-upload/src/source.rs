use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, UploadError};

/// Named, read-only resources shipped with the application.
///
/// Resources can only be streamed from the start, so the uploader reads a
/// resource once to learn its length and then opens it again.
pub trait ResourceBundle: Send + Sync {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + Send>>;
}

/// A bundle backed by a directory. Names are looked up lower-cased, so
/// `MINDdroid.rxe` resolves to `<root>/minddroid.rxe`.
#[derive(Debug, Clone)]
pub struct DirBundle {
    root: PathBuf,
}

impl DirBundle {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name.to_lowercase())
    }
}

impl ResourceBundle for DirBundle {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + Send>> {
        let file = File::open(self.path_for(name))?;
        Ok(Box::new(file))
    }
}

/// The bytes to upload, their length and the name they get on the brick.
pub struct UploadSource {
    reader: Box<dyn Read + Send>,
    length: u32,
    remote_name: String,
}

impl UploadSource {
    /// Resolve `name` to something readable.
    ///
    /// A name containing `/` is a path on the local filesystem. Anything
    /// else is looked up in `bundle`.
    pub fn resolve(name: &str, bundle: Option<&dyn ResourceBundle>) -> Result<Self> {
        let source_err = |source: io::Error| UploadError::Source {
            name: name.to_string(),
            source,
        };

        let (reader, length): (Box<dyn Read + Send>, u64) = if name.contains('/') {
            let file = File::open(name).map_err(source_err)?;
            let length = file.metadata().map_err(source_err)?.len();
            (Box::new(file), length)
        } else {
            let bundle = bundle.ok_or_else(|| {
                source_err(io::Error::new(io::ErrorKind::NotFound, "no resource bundle configured"))
            })?;
            let mut probe = bundle.open(name).map_err(source_err)?;
            let length = io::copy(&mut probe, &mut io::sink()).map_err(source_err)?;
            (bundle.open(name).map_err(source_err)?, length)
        };

        let length = u32::try_from(length).map_err(|_| {
            source_err(io::Error::new(io::ErrorKind::InvalidData, "file too large for the brick"))
        })?;
        let remote_name = remote_name(name).to_string();
        debug!(name, remote = %remote_name, length, "upload source resolved");

        Ok(Self {
            reader,
            length,
            remote_name,
        })
    }

    /// Wrap an arbitrary reader of known length.
    pub fn from_reader(remote_name: impl Into<String>, reader: impl Read + Send + 'static, length: u32) -> Self {
        Self {
            reader: Box::new(reader),
            length,
            remote_name: remote_name.into(),
        }
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    pub fn into_reader(self) -> Box<dyn Read + Send> {
        self.reader
    }
}

/// The final path component, which is the file name used on the brick.
pub fn remote_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}
