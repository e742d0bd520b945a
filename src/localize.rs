//! Localizer: makes a wiki page work offline.
//!
//! Two rewrites happen on the raw markdown, in this order:
//!
//! 1. **Links.** Absolute links into the wiki (`<base>/Page#frag`) become
//!    relative links to the generated file (`./Page.html#frag`). Plain text
//!    substitution, so bare URLs are rewritten too.
//! 2. **Images.** Every `![alt](url)` is downloaded into the sink's image
//!    directory and rewritten to `![](images/<file>)`. The local filename is
//!    the last URL segment with any `?key=value` query removed.
//!
//! Downloads for one page run concurrently and all of them settle before
//! [`Localizer::localize`] returns. A download that fails is recorded and
//! skipped; the reference is still rewritten. In loose-file mode an image
//! already on disk is never downloaded again; the archive starts empty on
//! every run, so archive mode always downloads.

use crate::fetch::Fetcher;
use crate::sink::{OutputMode, OutputSink, SinkError};
use crate::types::FailedImage;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::future::join_all;
use regex::{Captures, Regex};
use std::collections::HashSet;
use std::sync::LazyLock;
use thiserror::Error;

/// Markdown image syntax with a restricted URL alphabet. Group 1 is the URL.
pub const IMAGE_PATTERN: &str = r"!\[[^\]]*\]\(([a-zA-Z0-9:/._?=+&%~-]+)\)";

static QUERY_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\?\w+=.*").unwrap());

#[derive(Error, Debug)]
pub enum LocalizeError {
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// A localized page body plus what happened to its images.
#[derive(Debug, Default)]
pub struct Localized {
    pub text: String,
    /// Filenames written to the sink during this call.
    pub fetched: Vec<String>,
    /// Downloads that failed. `page` is left empty for the caller to fill.
    pub failed: Vec<FailedImage>,
}

enum Download {
    Written(String),
    FetchFailed(FailedImage),
    SinkFailed(SinkError),
}

#[derive(Debug, Clone)]
pub struct Localizer {
    link: Regex,
    image: Regex,
    image_dir: String,
}

impl Localizer {
    /// Build a localizer for the wiki rooted at `base_url`.
    ///
    /// Page identifiers are `[A-Za-z0-9%-]+`, fragments `#[A-Za-z0-9_%-]+`.
    pub fn new(base_url: &str, image_dir: &str) -> Result<Self, LocalizeError> {
        let base = regex::escape(base_url.trim_end_matches('/'));
        let link = Regex::new(&format!("{base}/([A-Za-z0-9%-]+)(#[A-Za-z0-9_%-]+)?"))?;
        Ok(Self {
            link,
            image: Regex::new(IMAGE_PATTERN)?,
            image_dir: image_dir.trim_end_matches('/').to_string(),
        })
    }

    /// Build a localizer from caller-supplied patterns.
    ///
    /// `link` must capture the page identifier in group 1 and may capture a
    /// fragment (including `#`) in group 2; `image` must capture the URL in
    /// group 1.
    pub fn with_patterns(link: Regex, image: Regex, image_dir: &str) -> Self {
        Self {
            link,
            image,
            image_dir: image_dir.trim_end_matches('/').to_string(),
        }
    }

    /// Rewrite wiki links to `./<id>.html<fragment>`.
    pub fn rewrite_links(&self, text: &str) -> String {
        self.link
            .replace_all(text, "./${1}.html${2}")
            .into_owned()
    }

    fn image_ref(&self, filename: &str) -> String {
        format!("![]({}/{})", self.image_dir, filename)
    }

    /// Rewrite links and images in `text`, downloading images into `sink`.
    ///
    /// Only a sink failure is an error, and only after every download of this
    /// call has settled.
    pub async fn localize(
        &self,
        text: &str,
        sink: &dyn OutputSink,
        fetcher: &dyn Fetcher,
    ) -> Result<Localized, LocalizeError> {
        let text = self.rewrite_links(text);

        let mut seen = HashSet::new();
        let mut downloads = Vec::new();
        for caps in self.image.captures_iter(&text) {
            let url = &caps[1];
            let filename = image_filename(url);
            if !is_localizable(&filename) || !seen.insert(filename.clone()) {
                continue;
            }
            let wanted = match sink.mode() {
                OutputMode::Archive => true,
                OutputMode::Filesystem => !sink.has_image(&filename).await,
            };
            if wanted {
                downloads.push(download(url.to_string(), filename, sink, fetcher));
            } else {
                log::debug!("{filename} already present, not downloading");
            }
        }

        let text = self
            .image
            .replace_all(&text, |caps: &Captures| {
                let filename = image_filename(&caps[1]);
                if is_localizable(&filename) {
                    self.image_ref(&filename)
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned();

        let mut localized = Localized {
            text,
            ..Localized::default()
        };
        let mut sink_error = None;
        for outcome in join_all(downloads).await {
            match outcome {
                Download::Written(filename) => localized.fetched.push(filename),
                Download::FetchFailed(failed) => localized.failed.push(failed),
                Download::SinkFailed(err) => {
                    sink_error.get_or_insert(err);
                }
            }
        }
        match sink_error {
            Some(err) => Err(err.into()),
            None => Ok(localized),
        }
    }
}

async fn download(
    url: String,
    filename: String,
    sink: &dyn OutputSink,
    fetcher: &dyn Fetcher,
) -> Download {
    let bytes = match fetcher.fetch(&url).await {
        Ok(bytes) => bytes,
        Err(err) => {
            log::warn!("image download failed: {err}");
            return Download::FetchFailed(FailedImage {
                page: String::new(),
                url,
                filename,
                reason: err.to_string(),
            });
        }
    };
    match sink.write_image(&filename, &STANDARD.encode(&bytes)).await {
        Ok(()) => Download::Written(filename),
        Err(err) => Download::SinkFailed(err),
    }
}

/// Local filename for an image URL: the last path segment, minus any
/// `?key=value` query.
///
/// - `https://x/a/b/logo.png` → `logo.png`
/// - `https://x/shot.png?raw=true` → `shot.png`
pub fn image_filename(url: &str) -> String {
    let last = url.rsplit('/').next().unwrap_or(url);
    QUERY_SUFFIX.replace(last, "").into_owned()
}

fn is_localizable(filename: &str) -> bool {
    !matches!(filename, "" | "." | "..")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;
    use crate::sink::{ArchiveSink, FilesystemSink};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const BASE: &str = "https://github.com/sumneko/lua-language-server/wiki";

    fn localizer() -> Localizer {
        Localizer::new(BASE, "images").unwrap()
    }

    // =========================================================================
    // Links
    // =========================================================================

    #[test]
    fn wiki_links_become_local_files() {
        let text = format!("See [setup]({BASE}/Getting-Started).");
        assert_eq!(
            localizer().rewrite_links(&text),
            "See [setup](./Getting-Started.html)."
        );
    }

    #[test]
    fn fragments_are_kept() {
        let text = format!("[x]({BASE}/Settings#diagnostics_disable)");
        assert_eq!(
            localizer().rewrite_links(&text),
            "[x](./Settings.html#diagnostics_disable)"
        );
    }

    #[test]
    fn bare_urls_are_rewritten() {
        let text = format!("Visit {BASE}/Home for more");
        assert_eq!(localizer().rewrite_links(&text), "Visit ./Home.html for more");
    }

    #[test]
    fn foreign_links_are_untouched() {
        let text = "[x](https://github.com/other/project/wiki/Home) [y](https://example.com)";
        assert_eq!(localizer().rewrite_links(text), text);
    }

    #[test]
    fn rewriting_is_idempotent() {
        let localizer = localizer();
        let once = localizer.rewrite_links(&format!("[a]({BASE}/A) [b]({BASE}/B#c)"));
        assert_eq!(localizer.rewrite_links(&once), once);
    }

    #[test]
    fn trailing_slash_on_base_is_ignored() {
        let localizer = Localizer::new(&format!("{BASE}/"), "images").unwrap();
        assert_eq!(
            localizer.rewrite_links(&format!("{BASE}/Home")),
            "./Home.html"
        );
    }

    #[test]
    fn custom_patterns() {
        let localizer = Localizer::with_patterns(
            Regex::new(r"wiki:([A-Za-z]+)()").unwrap(),
            Regex::new(r"img:(\S+)").unwrap(),
            "assets/",
        );
        assert_eq!(localizer.rewrite_links("go to wiki:Home"), "go to ./Home.html");
        assert_eq!(localizer.image_ref("a.png"), "![](assets/a.png)");
    }

    // =========================================================================
    // Image filenames
    // =========================================================================

    #[test]
    fn filename_is_last_segment() {
        assert_eq!(image_filename("https://x.com/a/b/logo.png"), "logo.png");
    }

    #[test]
    fn query_suffix_is_stripped() {
        assert_eq!(image_filename("https://x.com/shot.png?raw=true"), "shot.png");
        assert_eq!(image_filename("https://x.com/s.png?v=1&w=2"), "s.png");
    }

    #[test]
    fn bare_filename_passes_through() {
        assert_eq!(image_filename("logo.png"), "logo.png");
    }

    // =========================================================================
    // localize
    // =========================================================================

    fn png(n: u8) -> Vec<u8> {
        vec![0x89, b'P', b'N', b'G', n]
    }

    #[tokio::test]
    async fn images_are_downloaded_and_rewritten() {
        let tmp = TempDir::new().unwrap();
        let sink = FilesystemSink::new(tmp.path(), "images").unwrap();
        let fetcher = MemoryFetcher::new().with_image("https://x.com/a/logo.png", png(1));

        let out = localizer()
            .localize("Intro ![The logo](https://x.com/a/logo.png) end", &sink, &fetcher)
            .await
            .unwrap();

        assert_eq!(out.text, "Intro ![](images/logo.png) end");
        assert_eq!(out.fetched, ["logo.png"]);
        assert!(out.failed.is_empty());
        assert_eq!(fs::read(tmp.path().join("images/logo.png")).unwrap(), png(1));
    }

    #[tokio::test]
    async fn links_are_rewritten_before_images() {
        let tmp = TempDir::new().unwrap();
        let sink = FilesystemSink::new(tmp.path(), "images").unwrap();
        let fetcher = MemoryFetcher::new();
        let text = format!("[home]({BASE}/Home)");
        let out = localizer().localize(&text, &sink, &fetcher).await.unwrap();
        assert_eq!(out.text, "[home](./Home.html)");
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn repeated_image_is_fetched_once() {
        let sink = ArchiveSink::new(Path::new("unused.zip"), "images");
        let fetcher = MemoryFetcher::new().with_image("https://x.com/a.png", png(1));
        let text = "![one](https://x.com/a.png)\n![two](https://x.com/a.png)";

        let out = localizer().localize(text, &sink, &fetcher).await.unwrap();

        assert_eq!(out.text, "![](images/a.png)\n![](images/a.png)");
        assert_eq!(fetcher.calls(), ["https://x.com/a.png"]);
    }

    #[tokio::test]
    async fn same_filename_from_different_urls_is_fetched_once() {
        let sink = ArchiveSink::new(Path::new("unused.zip"), "images");
        let fetcher = MemoryFetcher::new()
            .with_image("https://x.com/1/a.png", png(1))
            .with_image("https://x.com/2/a.png", png(2));
        let text = "![](https://x.com/1/a.png) ![](https://x.com/2/a.png)";

        let out = localizer().localize(text, &sink, &fetcher).await.unwrap();

        assert_eq!(fetcher.calls(), ["https://x.com/1/a.png"]);
        assert_eq!(out.fetched, ["a.png"]);
    }

    #[tokio::test]
    async fn existing_image_is_not_refetched_on_disk() {
        let tmp = TempDir::new().unwrap();
        let sink = FilesystemSink::new(tmp.path(), "images").unwrap();
        fs::write(tmp.path().join("images/logo.png"), png(9)).unwrap();
        let fetcher = MemoryFetcher::new().with_image("https://x.com/logo.png", png(1));

        let out = localizer()
            .localize("![](https://x.com/logo.png)", &sink, &fetcher)
            .await
            .unwrap();

        assert_eq!(out.text, "![](images/logo.png)");
        assert!(fetcher.calls().is_empty());
        assert_eq!(fs::read(tmp.path().join("images/logo.png")).unwrap(), png(9));
    }

    #[tokio::test]
    async fn archive_mode_always_fetches() {
        let tmp = TempDir::new().unwrap();
        // A leftover loose file must not suppress the download in archive mode
        fs::create_dir_all(tmp.path().join("images")).unwrap();
        fs::write(tmp.path().join("images/logo.png"), png(9)).unwrap();
        let sink = ArchiveSink::new(&tmp.path().join("doc.zip"), "images");
        let fetcher = MemoryFetcher::new().with_image("https://x.com/logo.png", png(1));

        localizer()
            .localize("![](https://x.com/logo.png)", &sink, &fetcher)
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), ["https://x.com/logo.png"]);
        assert!(sink.has_image("logo.png").await);
    }

    #[tokio::test]
    async fn failed_download_is_absorbed() {
        let tmp = TempDir::new().unwrap();
        let sink = FilesystemSink::new(tmp.path(), "images").unwrap();
        let fetcher = MemoryFetcher::new()
            .with_failure("https://x.com/broken.png", "404 Not Found")
            .with_image("https://x.com/ok.png", png(1));
        let text = "![](https://x.com/broken.png) ![](https://x.com/ok.png)";

        let out = localizer().localize(text, &sink, &fetcher).await.unwrap();

        assert_eq!(out.text, "![](images/broken.png) ![](images/ok.png)");
        assert_eq!(out.fetched, ["ok.png"]);
        assert_eq!(out.failed.len(), 1);
        assert_eq!(out.failed[0].filename, "broken.png");
        assert_eq!(out.failed[0].url, "https://x.com/broken.png");
        assert!(out.failed[0].reason.contains("404"));
        assert!(!tmp.path().join("images/broken.png").exists());
        assert!(tmp.path().join("images/ok.png").exists());
    }

    #[tokio::test]
    async fn slow_download_does_not_lose_others() {
        let tmp = TempDir::new().unwrap();
        let sink = FilesystemSink::new(tmp.path(), "images").unwrap();
        let fetcher = MemoryFetcher::new()
            .with_image("https://x.com/slow.png", png(1))
            .with_delay("https://x.com/slow.png", std::time::Duration::from_millis(30))
            .with_image("https://x.com/fast.png", png(2));
        let text = "![](https://x.com/slow.png) ![](https://x.com/fast.png)";

        let out = localizer().localize(text, &sink, &fetcher).await.unwrap();

        // Everything has settled by the time localize returns
        let mut fetched = out.fetched.clone();
        fetched.sort();
        assert_eq!(fetched, ["fast.png", "slow.png"]);
        assert!(tmp.path().join("images/slow.png").exists());
        assert!(tmp.path().join("images/fast.png").exists());
    }

    #[tokio::test]
    async fn downloads_of_one_page_overlap() {
        let tmp = TempDir::new().unwrap();
        let sink = FilesystemSink::new(tmp.path(), "images").unwrap();
        let delay = std::time::Duration::from_millis(200);
        let fetcher = MemoryFetcher::new()
            .with_image("https://x.com/a.png", png(1))
            .with_delay("https://x.com/a.png", delay)
            .with_image("https://x.com/b.png", png(2))
            .with_delay("https://x.com/b.png", delay);
        let text = "![](https://x.com/a.png) ![](https://x.com/b.png)";

        let started = std::time::Instant::now();
        let out = localizer().localize(text, &sink, &fetcher).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(out.fetched.len(), 2);
        // Run back to back the two delays would add up to 400ms
        assert!(elapsed < delay * 2, "downloads ran sequentially: {elapsed:?}");
    }

    #[tokio::test]
    async fn sink_failure_is_returned_after_downloads_settle() {
        let tmp = TempDir::new().unwrap();
        let sink = FilesystemSink::new(tmp.path(), "images").unwrap();
        // Replace the image directory with a plain file so writes fail
        fs::remove_dir(tmp.path().join("images")).unwrap();
        fs::write(tmp.path().join("images"), b"").unwrap();
        let fetcher = MemoryFetcher::new()
            .with_image("https://x.com/a.png", png(1))
            .with_image("https://x.com/b.png", png(2));
        let text = "![](https://x.com/a.png) ![](https://x.com/b.png)";

        let result = localizer().localize(text, &sink, &fetcher).await;

        assert!(matches!(result, Err(LocalizeError::Sink(_))));
        assert_eq!(fetcher.calls().len(), 2);
    }

    #[tokio::test]
    async fn unmatched_urls_are_left_alone() {
        let tmp = TempDir::new().unwrap();
        let sink = FilesystemSink::new(tmp.path(), "images").unwrap();
        let fetcher = MemoryFetcher::new();
        // Spaces are outside the URL alphabet
        let text = "![x](https://x.com/my image.png)";
        let out = localizer().localize(text, &sink, &fetcher).await.unwrap();
        assert_eq!(out.text, text);
        assert!(fetcher.calls().is_empty());
    }
}
