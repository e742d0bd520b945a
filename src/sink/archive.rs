//! Single-file zip output.

use super::{OutputMode, OutputSink, SinkError, validate_filename, validate_relative};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Images are usually already compressed; spend as little effort as possible.
const IMAGE_COMPRESSION_LEVEL: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Text,
    Image,
}

#[derive(Debug, Default)]
struct ArchiveState {
    entries: BTreeMap<String, (EntryKind, Vec<u8>)>,
    finalized: bool,
}

/// Accumulates artifacts in memory and writes them as one zip on
/// [`finalize`](OutputSink::finalize).
///
/// Nothing touches the disk before `finalize`. Re-writing a path replaces
/// the earlier entry, so the archive never carries duplicate names.
#[derive(Debug)]
pub struct ArchiveSink {
    path: PathBuf,
    image_dir: String,
    state: Mutex<ArchiveState>,
}

impl ArchiveSink {
    pub fn new(path: &Path, image_dir: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            image_dir: image_dir.trim_matches('/').to_string(),
            state: Mutex::new(ArchiveState::default()),
        }
    }

    /// Location of the archive written by `finalize`.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn image_entry(&self, filename: &str) -> String {
        format!("{}/{}", self.image_dir, filename)
    }

    fn state(&self) -> MutexGuard<'_, ArchiveState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn insert(&self, name: String, kind: EntryKind, bytes: Vec<u8>) -> Result<(), SinkError> {
        let mut state = self.state();
        if state.finalized {
            return Err(SinkError::Finalized);
        }
        state.entries.insert(name, (kind, bytes));
        Ok(())
    }
}

#[async_trait]
impl OutputSink for ArchiveSink {
    fn mode(&self) -> OutputMode {
        OutputMode::Archive
    }

    async fn has_image(&self, filename: &str) -> bool {
        self.state().entries.contains_key(&self.image_entry(filename))
    }

    async fn write_text(&self, relative_path: &str, content: &str) -> Result<(), SinkError> {
        let name = validate_relative(relative_path)?;
        self.insert(name, EntryKind::Text, content.as_bytes().to_vec())
    }

    async fn write_image(&self, filename: &str, base64: &str) -> Result<(), SinkError> {
        validate_filename(filename)?;
        let bytes = STANDARD.decode(base64)?;
        self.insert(self.image_entry(filename), EntryKind::Image, bytes)
    }

    async fn finalize(&self) -> Result<(), SinkError> {
        let entries = {
            let mut state = self.state();
            if state.finalized {
                return Err(SinkError::Finalized);
            }
            state.finalized = true;
            std::mem::take(&mut state.entries)
        };
        let path = self.path.clone();
        log::debug!("writing {} entries to {}", entries.len(), path.display());
        tokio::task::spawn_blocking(move || write_zip(&path, entries)).await?
    }
}

fn entry_options(kind: EntryKind) -> SimpleFileOptions {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    match kind {
        EntryKind::Text => options,
        EntryKind::Image => options.compression_level(Some(IMAGE_COMPRESSION_LEVEL)),
    }
}

fn write_zip(
    path: &Path,
    entries: BTreeMap<String, (EntryKind, Vec<u8>)>,
) -> Result<(), SinkError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SinkError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| SinkError::io(path, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));

    for (name, (kind, bytes)) in &entries {
        zip.start_file(name.as_str(), entry_options(*kind))?;
        zip.write_all(bytes).map_err(|e| SinkError::io(path, e))?;
    }

    let mut writer = zip.finish()?;
    writer.flush().map_err(|e| SinkError::io(path, e))
}
