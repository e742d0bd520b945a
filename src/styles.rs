//! Stylesheet compilation.
//!
//! Every `.scss` or `.css` file directly inside the styles directory becomes
//! `<stem>.css` at the output root. Files whose name starts with `_` are
//! partials: they are only reachable through `@use`/`@import` and are never
//! emitted on their own.

use crate::config::StylesConfig;
use crate::sink::{OutputSink, SinkError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

const STYLE_EXTENSIONS: &[&str] = &["scss", "css"];

#[derive(Error, Debug)]
pub enum StyleError {
    #[error("failed to compile {path}: {message}")]
    Compile { path: PathBuf, message: String },
    #[error("failed to list styles: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Stylesheet sources in `dir`, sorted by file name.
pub fn sources(dir: &Path) -> Result<Vec<PathBuf>, StyleError> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let name = entry.file_name().to_string_lossy();
        let is_style = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| STYLE_EXTENSIONS.contains(&e));
        if is_style && !name.starts_with('_') {
            found.push(path.to_path_buf());
        }
    }
    Ok(found)
}

/// Compile a single stylesheet to CSS.
pub fn compile(path: &Path, config: &StylesConfig) -> Result<String, StyleError> {
    let style = if config.compressed {
        grass::OutputStyle::Compressed
    } else {
        grass::OutputStyle::Expanded
    };
    grass::from_path(path, &grass::Options::default().style(style)).map_err(|e| {
        StyleError::Compile {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })
}

/// Compile every stylesheet in `dir` and write `<stem>.css` to `sink`.
///
/// Returns the output names in source order. A missing directory yields
/// nothing.
pub async fn compile_all(
    dir: &Path,
    config: &StylesConfig,
    sink: &dyn OutputSink,
) -> Result<Vec<String>, StyleError> {
    if !dir.is_dir() {
        log::info!("no styles directory at {}, skipping stylesheets", dir.display());
        return Ok(Vec::new());
    }

    let mut written = Vec::new();
    for path in sources(dir)? {
        let css = compile(&path, config)?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = format!("{stem}.css");
        sink.write_text(&name, &css).await?;
        log::debug!("compiled {} -> {name}", path.display());
        written.push(name);
    }
    Ok(written)
}
