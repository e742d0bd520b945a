//! Output sinks: where generated artifacts end up.
//!
//! A run writes three kinds of artifacts: HTML pages, compiled stylesheets
//! and downloaded images. Every writer talks to an [`OutputSink`], which is
//! chosen once per run by [`open`] and never changes mode afterwards:
//!
//! | Mode | Backend | Result |
//! |------|---------|--------|
//! | [`OutputMode::Filesystem`] | [`FilesystemSink`] | loose files under the output directory |
//! | [`OutputMode::Archive`] | [`ArchiveSink`] | one zip file, written by [`OutputSink::finalize`] |
//!
//! Images are handed over base64-encoded and stored under the configured
//! image subdirectory (`images/` by default). Text paths are relative to the
//! output root; absolute paths and `..` components are rejected.

mod archive;
mod filesystem;

pub use self::archive::ArchiveSink;
pub use self::filesystem::FilesystemSink;

use crate::config::SiteConfig;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid output path: {0}")]
    InvalidPath(String),
    #[error("image payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("archive writer task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("output already finalized")]
    Finalized,
}

impl SinkError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SinkError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Output mode, fixed for the lifetime of a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Loose files in the output directory.
    Filesystem,
    /// A single zip archive.
    Archive,
}

/// Destination for generated artifacts.
///
/// Implementations are shared by concurrent image downloads, so every method
/// takes `&self`.
#[async_trait]
pub trait OutputSink: Send + Sync {
    fn mode(&self) -> OutputMode;

    /// Whether an image with this filename is already present in the output.
    async fn has_image(&self, filename: &str) -> bool;

    /// Write an HTML or CSS artifact. A later write to the same path wins.
    async fn write_text(&self, relative_path: &str, content: &str) -> Result<(), SinkError>;

    /// Decode `base64` and store it as `<image_dir>/<filename>`.
    async fn write_image(&self, filename: &str, base64: &str) -> Result<(), SinkError>;

    /// Flush everything. Must be called exactly once, after the last write.
    async fn finalize(&self) -> Result<(), SinkError>;
}

/// Open the sink for `mode` using the output locations in `config`.
pub fn open(config: &SiteConfig, mode: OutputMode) -> Result<Box<dyn OutputSink>, SinkError> {
    let output = &config.output;
    Ok(match mode {
        OutputMode::Filesystem => Box::new(FilesystemSink::new(
            &output.directory,
            &output.image_dir,
        )?),
        OutputMode::Archive => Box::new(ArchiveSink::new(&output.archive, &output.image_dir)),
    })
}

/// Normalize a relative output path into `/`-separated segments.
///
/// Rejects empty, absolute and parent-escaping paths.
pub(crate) fn validate_relative(path: &str) -> Result<String, SinkError> {
    let mut segments = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_string_lossy()),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(SinkError::InvalidPath(path.to_string()));
            }
        }
    }
    if segments.is_empty() {
        return Err(SinkError::InvalidPath(path.to_string()));
    }
    Ok(segments.join("/"))
}

/// Validate an image filename: a single plain path segment.
pub(crate) fn validate_filename(filename: &str) -> Result<(), SinkError> {
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(SinkError::InvalidPath(filename.to_string())),
    }
}
