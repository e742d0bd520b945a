//! Shared types passed between pipeline stages.
//!
//! Everything here is transient: built during one run, consumed by the
//! renderer or the report, and dropped when the run ends.

use std::path::PathBuf;

/// One wiki page on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Page identifier (file stem, e.g. `Getting-Started`). Becomes `<id>.html`.
    pub id: String,
    /// Full file name (e.g. `Getting-Started.md`).
    pub file_name: String,
    /// Location of the markdown file.
    pub path: PathBuf,
}

impl SourceDocument {
    /// Relative path of the HTML artifact produced for this page.
    pub fn output_name(&self) -> String {
        format!("{}.html", self.id)
    }
}

/// Side navigation entry, in processing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    pub id: String,
    pub title: String,
    pub href: String,
}

/// Table-of-contents entry collected from a rendered heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub level: u8,
    pub id: String,
    pub title: String,
}

/// An image that could not be downloaded. The page still references it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedImage {
    /// Page that referenced the image (empty when unknown to the caller).
    pub page: String,
    pub url: String,
    pub filename: String,
    pub reason: String,
}

/// What a run produced.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Output names of the pages written, in processing order.
    pub pages: Vec<String>,
    /// Output names of the compiled stylesheets.
    pub stylesheets: Vec<String>,
    /// Number of images downloaded and handed to the sink.
    pub images_written: usize,
    pub failed_images: Vec<FailedImage>,
    /// Archive file, when the run used archive mode.
    pub archive: Option<PathBuf>,
    /// Short revision of the wiki checkout, if it is a git checkout.
    pub revision: Option<String>,
}
