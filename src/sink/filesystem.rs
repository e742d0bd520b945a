//! Loose-file output.

use super::{OutputMode, OutputSink, SinkError, validate_filename, validate_relative};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::{Path, PathBuf};

/// Writes artifacts as files below an output root.
///
/// The root and its image subdirectory are created up front, so existing
/// images from earlier runs are visible to [`has_image`](OutputSink::has_image)
/// and are not downloaded again.
#[derive(Debug)]
pub struct FilesystemSink {
    root: PathBuf,
    image_dir: PathBuf,
}

impl FilesystemSink {
    pub fn new(root: &Path, image_dir: &str) -> Result<Self, SinkError> {
        let image_dir = root.join(validate_relative(image_dir)?);
        std::fs::create_dir_all(&image_dir).map_err(|e| SinkError::io(&image_dir, e))?;
        Ok(Self {
            root: root.to_path_buf(),
            image_dir,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn write_bytes(&self, path: PathBuf, bytes: &[u8]) -> Result<(), SinkError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SinkError::io(parent, e))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| SinkError::io(&path, e))
    }
}

#[async_trait]
impl OutputSink for FilesystemSink {
    fn mode(&self) -> OutputMode {
        OutputMode::Filesystem
    }

    async fn has_image(&self, filename: &str) -> bool {
        if validate_filename(filename).is_err() {
            return false;
        }
        tokio::fs::try_exists(self.image_dir.join(filename))
            .await
            .unwrap_or(false)
    }

    async fn write_text(&self, relative_path: &str, content: &str) -> Result<(), SinkError> {
        let path = self.root.join(validate_relative(relative_path)?);
        self.write_bytes(path, content.as_bytes()).await
    }

    async fn write_image(&self, filename: &str, base64: &str) -> Result<(), SinkError> {
        validate_filename(filename)?;
        let bytes = STANDARD.decode(base64)?;
        self.write_bytes(self.image_dir.join(filename), &bytes).await
    }

    async fn finalize(&self) -> Result<(), SinkError> {
        Ok(())
    }
}
