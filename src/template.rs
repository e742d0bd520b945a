//! Page shell: the HTML template every page is spliced into.
//!
//! The template is an ordinary HTML document. Five regions, located by CSS
//! selectors from `[template]`, are filled per page:
//!
//! | Region | Filled with |
//! |--------|-------------|
//! | `content` | rendered markdown |
//! | `navigation` | side navigation list |
//! | `toc` | table of contents for the page |
//! | `footer` | generation footer |
//! | `title` | page title, as text |
//!
//! A region's existing children are replaced wholesale; everything else in
//! the template (stylesheet links, scripts, wrappers) is kept as parsed and
//! re-serialized, so attribute order may differ from the source file. The
//! template is parsed once and cloned for every page.

use crate::config::TemplateConfig;
use ego_tree::{NodeId, NodeRef, Tree};
use scraper::{Html, Node, Selector};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid {region} selector {selector:?}: {message}")]
    Selector {
        region: &'static str,
        selector: String,
        message: String,
    },
    #[error("template has no {region} region (selector {selector:?} matched nothing)")]
    MissingRegion {
        region: &'static str,
        selector: String,
    },
}

/// Per-page HTML for each region. Everything except `title` is markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageParts<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub navigation: &'a str,
    pub toc: &'a str,
    pub footer: &'a str,
}

#[derive(Debug, Clone, Copy)]
struct Regions {
    content: NodeId,
    navigation: NodeId,
    toc: NodeId,
    footer: NodeId,
    title: NodeId,
}

/// A parsed template with its regions resolved.
pub struct PageShell {
    document: Html,
    regions: Regions,
}

impl PageShell {
    /// Read and parse the template at `path`.
    pub fn load(path: &Path, config: &TemplateConfig) -> Result<Self, TemplateError> {
        let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source, config)
    }

    /// Parse a template from a string.
    pub fn parse(source: &str, config: &TemplateConfig) -> Result<Self, TemplateError> {
        let document = Html::parse_document(source);
        let regions = Regions {
            content: locate(&document, "content", &config.content)?,
            navigation: locate(&document, "navigation", &config.navigation)?,
            toc: locate(&document, "toc", &config.toc)?,
            footer: locate(&document, "footer", &config.footer)?,
            title: locate(&document, "title", &config.title)?,
        };
        Ok(Self { document, regions })
    }

    /// Fill every region and serialize the resulting document.
    pub fn render(&self, parts: &PageParts<'_>) -> String {
        let mut document = self.document.clone();
        let title = maud::html! { (parts.title) }.into_string();
        for (region, fragment) in [
            (self.regions.content, parts.content),
            (self.regions.navigation, parts.navigation),
            (self.regions.toc, parts.toc),
            (self.regions.footer, parts.footer),
            (self.regions.title, title.as_str()),
        ] {
            replace_children(&mut document.tree, region, fragment);
        }
        document.html()
    }
}

fn locate(document: &Html, region: &'static str, selector: &str) -> Result<NodeId, TemplateError> {
    let parsed = Selector::parse(selector).map_err(|e| TemplateError::Selector {
        region,
        selector: selector.to_string(),
        message: e.to_string(),
    })?;
    document
        .select(&parsed)
        .next()
        .map(|element| element.id())
        .ok_or_else(|| TemplateError::MissingRegion {
            region,
            selector: selector.to_string(),
        })
}

/// Detach every child of `target` and graft the nodes of `fragment` in.
fn replace_children(tree: &mut Tree<Node>, target: NodeId, fragment: &str) {
    let Some(mut node) = tree.get_mut(target) else {
        return;
    };
    while let Some(mut child) = node.first_child() {
        child.detach();
    }

    let fragment = Html::parse_fragment(fragment);
    for child in fragment.root_element().children() {
        graft(tree, target, child);
    }
}

fn graft(tree: &mut Tree<Node>, parent: NodeId, source: NodeRef<'_, Node>) {
    let Some(mut parent) = tree.get_mut(parent) else {
        return;
    };
    let id = parent.append(source.value().clone()).id();
    for child in source.children() {
        graft(tree, id, child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SHELL: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>placeholder</title>
  <link rel="stylesheet" href="style.css">
</head>
<body>
  <nav id="side-nav"><p>nav placeholder</p></nav>
  <main>main placeholder</main>
  <aside id="toc">toc placeholder</aside>
  <footer>footer placeholder</footer>
</body>
</html>"#;

    fn shell() -> PageShell {
        PageShell::parse(SHELL, &TemplateConfig::default()).unwrap()
    }

    fn parts<'a>() -> PageParts<'a> {
        PageParts {
            title: "Getting Started",
            content: "<h2 id=\"install\">Install</h2><p>Run it.</p>",
            navigation: "<ul><li><a href=\"./Home.html\">Home</a></li></ul>",
            toc: "<ul><li class=\"toc-h2\"><a href=\"#install\">Install</a></li></ul>",
            footer: "<p>Generated</p>",
        }
    }

    #[test]
    fn regions_are_filled() {
        let html = shell().render(&parts());
        assert!(html.contains("<main><h2 id=\"install\">Install</h2><p>Run it.</p></main>"));
        assert!(html.contains(
            "<nav id=\"side-nav\"><ul><li><a href=\"./Home.html\">Home</a></li></ul></nav>"
        ));
        assert!(html.contains("<aside id=\"toc\"><ul><li class=\"toc-h2\">"));
        assert!(html.contains("<footer><p>Generated</p></footer>"));
        assert!(html.contains("<title>Getting Started</title>"));
    }

    #[test]
    fn placeholders_are_removed() {
        let html = shell().render(&parts());
        assert!(!html.contains("placeholder"));
    }

    #[test]
    fn rest_of_template_is_kept() {
        let html = shell().render(&parts());
        assert!(html.starts_with("<!DOCTYPE html>"));
        let page = Html::parse_document(&html);
        let link = Selector::parse(r#"head > link[rel="stylesheet"][href="style.css"]"#).unwrap();
        assert_eq!(page.select(&link).count(), 1);
    }

    #[test]
    fn title_is_text_not_markup() {
        let html = shell().render(&PageParts {
            title: "a <b> & c",
            ..parts()
        });
        assert!(html.contains("<title>a &lt;b&gt; &amp; c</title>"));
    }

    #[test]
    fn renders_are_independent() {
        let shell = shell();
        let first = shell.render(&parts());
        let second = shell.render(&PageParts {
            content: "<p>other</p>",
            ..parts()
        });
        assert!(first.contains("Run it."));
        assert!(!second.contains("Run it."));
        assert!(second.contains("<main><p>other</p></main>"));
    }

    #[test]
    fn empty_fragment_empties_region() {
        let html = shell().render(&PageParts { toc: "", ..parts() });
        assert!(html.contains("<aside id=\"toc\"></aside>"));
    }

    #[test]
    fn missing_region_is_an_error() {
        let source = "<html><head><title></title></head><body><main></main></body></html>";
        match PageShell::parse(source, &TemplateConfig::default()) {
            Err(TemplateError::MissingRegion { region, .. }) => assert_eq!(region, "navigation"),
            other => panic!("expected MissingRegion, got {:?}", other.err()),
        }
    }

    #[test]
    fn invalid_selector_is_an_error() {
        let config = TemplateConfig {
            toc: "##".to_string(),
            ..TemplateConfig::default()
        };
        assert!(matches!(
            PageShell::parse(SHELL, &config),
            Err(TemplateError::Selector { region: "toc", .. })
        ));
    }

    #[test]
    fn load_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("template.html");
        fs::write(&path, SHELL).unwrap();
        assert!(PageShell::load(&path, &TemplateConfig::default()).is_ok());
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let result = PageShell::load(&tmp.path().join("nope.html"), &TemplateConfig::default());
        assert!(matches!(result, Err(TemplateError::Io { .. })));
    }
}
