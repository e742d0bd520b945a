//! Source discovery.
//!
//! A wiki checkout is flat: every page is a markdown file in the top-level
//! directory. Discovery lists that directory (no recursion), keeps the files
//! with a recognized extension and returns them in processing order (see
//! [`naming::sort_pages`]).
//!
//! Files with `_` in their name are GitHub's special partials (`_Sidebar.md`,
//! `_Footer.md`). They are not pages and are skipped.

use crate::config::SourceConfig;
use crate::naming;
use crate::types::SourceDocument;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot list source directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// List the pages in `dir`, in processing order.
pub fn discover(dir: &Path, config: &SourceConfig) -> Result<Vec<SourceDocument>, ScanError> {
    let list_error = |source: std::io::Error| ScanError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut names: Vec<String> = Vec::new();
    for entry in fs::read_dir(dir).map_err(list_error)? {
        let entry = entry.map_err(list_error)?;
        let path = entry.path();
        if !path.is_file() || !has_page_extension(&path, &config.extensions) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.contains('_') {
            log::debug!("skipping partial {name}");
            continue;
        }
        names.push(name);
    }

    naming::sort_pages(&mut names, &config.home_page);

    Ok(names
        .into_iter()
        .map(|file_name| SourceDocument {
            id: naming::page_id(&file_name),
            path: dir.join(&file_name),
            file_name,
        })
        .collect())
}

fn has_page_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|e| {
            extensions
                .iter()
                .any(|known| e.eq_ignore_ascii_case(known.as_str()))
        })
        .unwrap_or(false)
}

/// Read a page's markdown.
pub fn read(doc: &SourceDocument) -> Result<String, ScanError> {
    fs::read_to_string(&doc.path).map_err(|source| ScanError::ReadFile {
        path: doc.path.clone(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn wiki(files: &[&str]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for name in files {
            fs::write(tmp.path().join(name), format!("# {name}\n")).unwrap();
        }
        tmp
    }

    fn ids(docs: &[SourceDocument]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn discovers_markdown_in_processing_order() {
        let tmp = wiki(&["Zeta.md", "Home.md", "Alpha.md"]);
        let docs = discover(tmp.path(), &SourceConfig::default()).unwrap();
        assert_eq!(ids(&docs), ["Alpha", "Zeta", "Home"]);
        assert_eq!(docs[0].file_name, "Alpha.md");
        assert_eq!(docs[0].path, tmp.path().join("Alpha.md"));
    }

    #[test]
    fn both_extensions_are_pages() {
        let tmp = wiki(&["A.md", "B.markdown", "C.MD"]);
        let docs = discover(tmp.path(), &SourceConfig::default()).unwrap();
        assert_eq!(ids(&docs), ["A", "B", "C"]);
    }

    #[test]
    fn other_files_are_ignored() {
        let tmp = wiki(&["Page.md", "logo.png", "README"]);
        fs::create_dir(tmp.path().join(".git")).unwrap();
        fs::create_dir(tmp.path().join("nested.md")).unwrap();
        let docs = discover(tmp.path(), &SourceConfig::default()).unwrap();
        assert_eq!(ids(&docs), ["Page"]);
    }

    #[test]
    fn partials_are_skipped() {
        let tmp = wiki(&["_Sidebar.md", "_Footer.md", "Home.md", "snake_case.md"]);
        let docs = discover(tmp.path(), &SourceConfig::default()).unwrap();
        assert_eq!(ids(&docs), ["Home"]);
    }

    #[test]
    fn no_recursion() {
        let tmp = wiki(&["Top.md"]);
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub/Deep.md"), "x").unwrap();
        let docs = discover(tmp.path(), &SourceConfig::default()).unwrap();
        assert_eq!(ids(&docs), ["Top"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let result = discover(&tmp.path().join("wiki"), &SourceConfig::default());
        assert!(matches!(result, Err(ScanError::ReadDir { .. })));
    }

    #[test]
    fn read_returns_content() {
        let tmp = wiki(&["Home.md"]);
        let docs = discover(tmp.path(), &SourceConfig::default()).unwrap();
        assert_eq!(read(&docs[0]).unwrap(), "# Home.md\n");
    }

    #[test]
    fn read_missing_file_is_an_error() {
        let doc = SourceDocument {
            id: "Gone".to_string(),
            file_name: "Gone.md".to_string(),
            path: PathBuf::from("/nonexistent/Gone.md"),
        };
        assert!(matches!(read(&doc), Err(ScanError::ReadFile { .. })));
    }
}
