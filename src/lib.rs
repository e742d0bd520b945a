//! # wikisite
//!
//! Turns a GitHub wiki into a self-contained, offline HTML bundle. The wiki's
//! git checkout is the data source: every markdown page becomes an HTML page
//! spliced into a shared template, links between wiki pages become relative
//! links, and remote images are downloaded next to the pages.
//!
//! # Architecture: One Pass, Two Sinks
//!
//! ```text
//! wiki/*.md ──► localize ──► render ──► splice into template ──► OutputSink
//!                 │                                                │
//!                 └── images ─────────────────────────────────────►┘
//!                                                     out/  or  doc.zip
//! ```
//!
//! The [`localize`] step and the [`sink`] are the core of the crate. The
//! localizer rewrites wiki links and image references in the raw markdown and
//! downloads images concurrently; the sink decides whether artifacts land as
//! loose files or inside a single zip archive. Everything else is plumbing
//! around well-known crates: pulldown-cmark, syntect, scraper, grass and git.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`generate`] | Pipeline driver plus navigation, TOC and footer markup |
//! | [`localize`] | Wiki link rewriting and image download/rewriting |
//! | [`sink`] | Output backends: loose files or zip archive |
//! | [`fetch`] | HTTP image fetcher and an in-memory fetcher |
//! | [`markdown`] | Markdown → HTML with heading anchors, TOC and highlighting |
//! | [`template`] | Page shell: template regions replaced per page |
//! | [`scan`] | Page discovery in the wiki checkout |
//! | [`styles`] | SCSS/CSS compilation |
//! | [`wiki`] | Cloning and updating the wiki checkout |
//! | [`config`] | `wikisite.toml` loading, merging and validation |
//! | [`naming`] | Page ids, titles, ordering and heading anchors |
//! | [`types`] | Shared types passed between stages |
//! | [`output`] | Console output: tagged progress lines and the run summary |
//!
//! # Design Decisions
//!
//! ## Localize the Markdown, Not the HTML
//!
//! Links and images are rewritten in the markdown source, before rendering.
//! Wiki pages reference other pages by absolute URL and images by remote URL;
//! a plain-text pass catches both in markdown links, autolinks and bare URLs,
//! and the renderer never sees a remote reference.
//!
//! ## The Mode Lives in the Sink
//!
//! Loose-file and archive output differ in one place only: the
//! [`sink::OutputSink`] implementation picked by [`sink::open`]. The pipeline
//! and the localizer ask the sink what it holds instead of branching on a flag.
//! Loose-file runs reuse images from earlier runs; archive runs always start
//! empty and download everything.
//!
//! ## Template as Data
//!
//! The page shell is an ordinary HTML file with CSS-selected regions, so the
//! look of the site can change without recompiling. The small generated
//! fragments (navigation, TOC, footer) are built with Maud and are escaped
//! by construction.

pub mod config;
pub mod fetch;
pub mod generate;
pub mod localize;
pub mod markdown;
pub mod naming;
pub mod output;
pub mod scan;
pub mod sink;
pub mod styles;
pub mod template;
pub mod types;
pub mod wiki;
