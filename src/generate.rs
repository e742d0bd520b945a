//! Site generation: page chrome and the build pipeline.
//!
//! [`build`] drives one run end to end:
//!
//! ```text
//! sync checkout → discover pages → for each page (in order):
//!     READ → localize (links + images) → render markdown → splice into shell → write → DONE
//! → compile stylesheets → finalize sink → report
//! ```
//!
//! Pages are processed one at a time. A page's image downloads all settle
//! before the next page starts, so the concurrency never spans documents.
//!
//! The navigation, table of contents and footer are generated here with
//! Maud and handed to the page shell as ready-made fragments.

use crate::config::{ConfigError, SiteConfig};
use crate::fetch::{FetchError, Fetcher};
use crate::localize::{LocalizeError, Localizer};
use crate::markdown::{MarkdownError, MarkdownRenderer};
use crate::naming;
use crate::output::Printer;
use crate::scan::{self, ScanError};
use crate::sink::{self, OutputMode, SinkError};
use crate::styles::{self, StyleError};
use crate::template::{PageParts, PageShell, TemplateError};
use crate::types::{BuildReport, NavItem, SourceDocument, TocEntry};
use crate::wiki::{self, WikiError};
use maud::{Markup, html};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Wiki checkout failed: {0}")]
    Wiki(#[from] WikiError),
    #[error("Source error: {0}")]
    Scan(#[from] ScanError),
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),
    #[error("Markdown setup failed: {0}")]
    Markdown(#[from] MarkdownError),
    #[error("HTTP setup failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("Localizing failed: {0}")]
    Localize(#[from] LocalizeError),
    #[error("Output error: {0}")]
    Sink(#[from] SinkError),
    #[error("Stylesheet error: {0}")]
    Style(#[from] StyleError),
}

// ============================================================================
// Page chrome
// ============================================================================

/// Navigation entry for a page.
pub fn nav_item(doc: &SourceDocument) -> NavItem {
    NavItem {
        id: doc.id.clone(),
        title: naming::display_title(&doc.id),
        href: format!("./{}", doc.output_name()),
    }
}

/// Side navigation: every page in processing order, the current one marked.
pub fn render_nav(items: &[NavItem], current_id: &str) -> Markup {
    html! {
        ul {
            @for item in items {
                li class=[(item.id == current_id).then_some("current")] {
                    a href=(item.href) { (item.title) }
                }
            }
        }
    }
}

/// Table of contents for one page. Empty when the page has no headings.
pub fn render_toc(entries: &[TocEntry]) -> Markup {
    html! {
        @if !entries.is_empty() {
            ul {
                @for entry in entries {
                    li class={ "toc-h" (entry.level) } {
                        a href={ "#" (entry.id) } { (entry.title) }
                    }
                }
            }
        }
    }
}

/// Footer naming the wiki revision and the generation date.
pub fn render_footer(commit: Option<&str>, generated_on: &str) -> Markup {
    html! {
        p.generated {
            "Generated "
            @if let Some(commit) = commit {
                "from revision " code { (commit) } " "
            }
            "on " time datetime=(generated_on) { (generated_on) }
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Run a full build in `mode`.
///
/// Setup problems (checkout, template, renderer, sink), unreadable pages,
/// output write failures and stylesheet errors abort the run. Image
/// download failures do not; they are listed in the report.
pub async fn build(
    config: &SiteConfig,
    mode: OutputMode,
    fetcher: &dyn Fetcher,
    printer: &Printer,
) -> Result<BuildReport, BuildError> {
    let source_dir = &config.source.directory;
    if config.wiki.update {
        let outcome = wiki::sync(&config.wiki, source_dir)?;
        printer.sync(outcome, source_dir);
    }
    let revision = wiki::short_commit(source_dir);

    let documents = scan::discover(source_dir, &config.source)?;
    let shell = PageShell::load(&config.template.path, &config.template)?;
    let renderer = MarkdownRenderer::new(&config.markdown)?;
    let localizer = Localizer::new(&config.wiki.base_url, &config.output.image_dir)?;
    let sink = sink::open(config, mode)?;
    log::info!(
        "building {} pages from {} ({mode:?})",
        documents.len(),
        source_dir.display()
    );

    let nav: Vec<NavItem> = documents.iter().map(nav_item).collect();
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    let footer = render_footer(revision.as_deref(), &today).into_string();

    let mut report = BuildReport {
        revision,
        ..BuildReport::default()
    };

    for doc in &documents {
        printer.read(&doc.file_name);
        let markdown = scan::read(doc)?;

        let localized = localizer.localize(&markdown, &*sink, fetcher).await?;
        for filename in &localized.fetched {
            printer.image(filename);
        }
        report.images_written += localized.fetched.len();
        report
            .failed_images
            .extend(localized.failed.into_iter().map(|mut failed| {
                failed.page = doc.id.clone();
                failed
            }));

        let rendered = renderer.render(&localized.text);
        let title = rendered
            .title
            .clone()
            .unwrap_or_else(|| naming::display_title(&doc.id));
        let navigation = render_nav(&nav, &doc.id).into_string();
        let toc = render_toc(&rendered.toc).into_string();
        let page = shell.render(&PageParts {
            title: &title,
            content: &rendered.html,
            navigation: &navigation,
            toc: &toc,
            footer: &footer,
        });

        let output_name = doc.output_name();
        sink.write_text(&output_name, &page).await?;
        printer.done(&output_name);
        report.pages.push(output_name);
    }

    report.stylesheets = styles::compile_all(&config.styles.directory, &config.styles, &*sink).await?;
    for name in &report.stylesheets {
        printer.css(name);
    }

    sink.finalize().await?;
    if mode == OutputMode::Archive {
        report.archive = Some(config.output.archive.clone());
    }
    Ok(report)
}
