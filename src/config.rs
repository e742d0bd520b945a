//! Site configuration module.
//!
//! Handles loading, validating, and merging `wikisite.toml`. Every option has
//! a stock default; the file in the working directory only needs the keys it
//! wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [wiki]
//! repository = "https://github.com/sumneko/lua-language-server.wiki.git"
//! base_url = "https://github.com/sumneko/lua-language-server/wiki"
//! update = true               # clone/pull the checkout before building
//!
//! [source]
//! directory = "wiki"          # checkout holding the markdown pages
//! extensions = ["md", "markdown"]
//! home_page = "Home"          # pinned last in processing and navigation order
//!
//! [template]
//! path = "template.html"
//! content = "body > main"     # CSS selectors of the regions replaced per page
//! navigation = "#side-nav"
//! toc = "#toc"
//! footer = "body > footer"
//! title = "head > title"
//!
//! [styles]
//! directory = "styles"        # .scss/.css sources, `_partials` skipped
//! compressed = true
//!
//! [output]
//! directory = "out"           # loose-file mode
//! archive = "doc.zip"         # archive mode
//! image_dir = "images"
//!
//! [markdown]
//! theme = "InspiredGitHub"    # syntect theme for fenced code blocks
//! toc_depth = 3               # deepest heading level listed in the TOC
//! ```
//!
//! Relative paths are resolved against the directory the config was loaded
//! from. Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Name of the config file looked up in the project root.
pub const CONFIG_FILE: &str = "wikisite.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `wikisite.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Where the wiki lives and how its links look.
    pub wiki: WikiConfig,
    /// Which files in the checkout are pages.
    pub source: SourceConfig,
    /// The page shell and its replaceable regions.
    pub template: TemplateConfig,
    /// Stylesheet sources.
    pub styles: StylesConfig,
    /// Output locations for both modes.
    pub output: OutputConfig,
    /// Markdown rendering options.
    pub markdown: MarkdownConfig,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wiki.base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "wiki.base_url must not be empty".into(),
            ));
        }
        if self.source.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "source.extensions must not be empty".into(),
            ));
        }
        if self.source.home_page.trim().is_empty() {
            return Err(ConfigError::Validation(
                "source.home_page must not be empty".into(),
            ));
        }
        if !is_plain_relative(&self.output.image_dir) {
            return Err(ConfigError::Validation(
                "output.image_dir must be a non-empty relative path without '..'".into(),
            ));
        }
        if !(1..=6).contains(&self.markdown.toc_depth) {
            return Err(ConfigError::Validation(
                "markdown.toc_depth must be 1-6".into(),
            ));
        }
        Ok(())
    }

    /// Resolve every relative path against `root`.
    pub fn with_root(mut self, root: &Path) -> Self {
        for path in [
            &mut self.source.directory,
            &mut self.template.path,
            &mut self.styles.directory,
            &mut self.output.directory,
            &mut self.output.archive,
        ] {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        }
        self
    }
}

fn is_plain_relative(path: &str) -> bool {
    let path = Path::new(path);
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Wiki repository settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WikiConfig {
    /// Git URL of the wiki repository.
    pub repository: String,
    /// Canonical URL prefix of wiki pages. Links below it become local links.
    pub base_url: String,
    /// Clone or fast-forward the checkout before building.
    pub update: bool,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            repository: "https://github.com/sumneko/lua-language-server.wiki.git".to_string(),
            base_url: "https://github.com/sumneko/lua-language-server/wiki".to_string(),
            update: true,
        }
    }
}

/// Source document discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Directory holding the markdown pages (the wiki checkout).
    pub directory: PathBuf,
    /// Recognized page extensions, without the dot.
    pub extensions: Vec<String>,
    /// Page identifier of the home page, pinned last.
    pub home_page: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("wiki"),
            extensions: vec!["md".to_string(), "markdown".to_string()],
            home_page: "Home".to_string(),
        }
    }
}

/// Page shell settings: template file and region selectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateConfig {
    pub path: PathBuf,
    /// Region receiving the rendered page body.
    pub content: String,
    /// Region receiving the side navigation.
    pub navigation: String,
    /// Region receiving the table of contents.
    pub toc: String,
    /// Region receiving the footer.
    pub footer: String,
    /// Element receiving the page title.
    pub title: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("template.html"),
            content: "body > main".to_string(),
            navigation: "#side-nav".to_string(),
            toc: "#toc".to_string(),
            footer: "body > footer".to_string(),
            title: "head > title".to_string(),
        }
    }
}

/// Stylesheet compilation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StylesConfig {
    pub directory: PathBuf,
    /// Emit minified CSS.
    pub compressed: bool,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("styles"),
            compressed: true,
        }
    }
}

/// Output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Root of the loose-file output.
    pub directory: PathBuf,
    /// Archive file written in archive mode.
    pub archive: PathBuf,
    /// Image subdirectory, relative to the output root.
    pub image_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("out"),
            archive: PathBuf::from("doc.zip"),
            image_dir: "images".to_string(),
        }
    }
}

/// Markdown rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkdownConfig {
    /// Name of a syntect default theme.
    pub theme: String,
    /// Deepest heading level included in the table of contents.
    pub toc_depth: u8,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            theme: "InspiredGitHub".to_string(),
            toc_depth: 3,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `wikisite.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the site config for the project rooted at `root`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// validates the result and resolves relative paths against `root`.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    Ok(resolve_config(base, overlay)?.with_root(root))
}
