//! Centralized naming rules for wiki pages.
//!
//! GitHub wikis name pages after their files: `Getting-Started.md` is the page
//! `Getting-Started`, displayed as "Getting Started". This module keeps every
//! rule that turns file names into identifiers, titles, ordering and heading
//! anchors in one place so the scanner, the renderer and the navigation agree.
//!
//! ## Ordering
//!
//! Pages are processed in lexical order, except the home page which is pinned
//! last. The processing order is also the navigation order, so it must be
//! stable across runs:
//!
//! ```text
//! Zeta.md, Home.md, Alpha.md  →  Alpha.md, Zeta.md, Home.md
//! ```

use std::collections::HashSet;
use std::path::Path;

/// Page identifier for a source file: the file stem.
///
/// - `"Getting-Started.md"` → `"Getting-Started"`
/// - `"Home"` → `"Home"`
pub fn page_id(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}

/// Display title for a page identifier: dashes become spaces.
pub fn display_title(id: &str) -> String {
    id.replace('-', " ")
}

/// Whether `file_name` names the pinned home page.
pub fn is_home(file_name: &str, home: &str) -> bool {
    page_id(file_name) == home
}

/// Sort file names lexically, pinning the home page last.
pub fn sort_pages<S: AsRef<str>>(names: &mut [S], home: &str) {
    names.sort_by(|a, b| {
        let (a, b) = (a.as_ref(), b.as_ref());
        is_home(a, home).cmp(&is_home(b, home)).then_with(|| a.cmp(b))
    });
}

/// Slugify heading text for use as an HTML id.
///
/// Lowercases alphanumerics, collapses every run of other characters into a
/// single hyphen and trims hyphens from both ends.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut prev_hyphen = true;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
            prev_hyphen = false;
        } else if !prev_hyphen {
            slug.push('-');
            prev_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Hands out heading anchors that are unique within one document.
///
/// The first heading keeps its slug; repeats get `-1`, `-2`, … in document
/// order. Slugs that would collide with an explicit earlier anchor keep
/// counting until they are free.
#[derive(Debug, Default)]
pub struct AnchorSet {
    used: HashSet<String>,
}

impl AnchorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve and return a unique anchor derived from `slug`.
    ///
    /// An empty slug becomes `section`.
    pub fn unique(&mut self, slug: &str) -> String {
        let base = if slug.is_empty() { "section" } else { slug };
        if self.used.insert(base.to_string()) {
            return base.to_string();
        }
        let mut n = 1;
        loop {
            let candidate = format!("{base}-{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
