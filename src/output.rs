//! Console output for a build.
//!
//! # Tagged Progress Lines
//!
//! Every user-facing line starts with a short tag so a run can be scanned at
//! a glance:
//!
//! ```text
//!  READ  Getting-Started.md
//!  IMG↓  logo.png
//!  DONE  Getting-Started.html
//!  CSS   style.css
//!  WARN  could not download logo.png (https://…/logo.png): 404 Not Found
//! Generated 12 pages, 1 stylesheet, 7 images
//! ```
//!
//! Fatal errors get a ` FAIL ` banner on stderr followed by the error's
//! cause chain, one `caused by:` line per level.
//!
//! Tags are drawn as coloured badges when the stream they are written to is a
//! terminal and `NO_COLOR` is unset; otherwise output is plain text.
//!
//! # Architecture
//!
//! Each line has a `format_*` function (returns `String` or `Vec<String>`)
//! for testability, and [`Printer`] writes them. Format functions are pure:
//! no I/O, no side effects.

use crate::types::{BuildReport, FailedImage};
use crate::wiki::SyncOutcome;
use std::error::Error;
use std::io::IsTerminal;
use std::path::Path;

const RESET: &str = "\x1b[0m";
const NAME: &str = "\x1b[95m";

/// Line tags, one per kind of event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Read,
    Done,
    Image,
    Css,
    Git,
    Warn,
    Fail,
}

impl Tag {
    fn label(self) -> &'static str {
        match self {
            Tag::Read => " READ ",
            Tag::Done => " DONE ",
            Tag::Image => " IMG↓ ",
            Tag::Css => " CSS  ",
            Tag::Git => " GIT  ",
            Tag::Warn => " WARN ",
            Tag::Fail => " FAIL ",
        }
    }

    /// Foreground/background SGR codes for the badge.
    fn style(self) -> &'static str {
        match self {
            Tag::Read => "\x1b[97;46m",
            Tag::Done => "\x1b[30;102m",
            Tag::Image => "\x1b[30;106m",
            Tag::Css => "\x1b[97;45m",
            Tag::Git => "\x1b[97;44m",
            Tag::Warn => "\x1b[30;43m",
            Tag::Fail => "\x1b[97;41m",
        }
    }
}

/// Render a tag badge followed by `text`.
pub fn tagged(tag: Tag, text: &str, color: bool) -> String {
    if color {
        format!("{}{}{RESET} {text}", tag.style(), tag.label())
    } else {
        format!("{} {text}", tag.label())
    }
}

fn name(text: &str, color: bool) -> String {
    if color {
        format!("{NAME}{text}{RESET}")
    } else {
        text.to_string()
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{n} {}", if n == 1 { one } else { many })
}

// ============================================================================
// Per-event lines
// ============================================================================

pub fn format_read(file_name: &str, color: bool) -> String {
    tagged(Tag::Read, &name(file_name, color), color)
}

pub fn format_done(output_name: &str, color: bool) -> String {
    tagged(Tag::Done, &name(output_name, color), color)
}

pub fn format_image(filename: &str, color: bool) -> String {
    tagged(Tag::Image, &name(filename, color), color)
}

pub fn format_css(output_name: &str, color: bool) -> String {
    tagged(Tag::Css, &name(output_name, color), color)
}

/// Checkout line after a clone or pull.
pub fn format_sync(outcome: SyncOutcome, dir: &Path, color: bool) -> String {
    let verb = match outcome {
        SyncOutcome::Cloned => "cloned wiki into",
        SyncOutcome::Updated => "updated wiki in",
    };
    tagged(Tag::Git, &format!("{verb} {}", dir.display()), color)
}

/// One warning per failed image.
pub fn format_failed_image(failed: &FailedImage, color: bool) -> String {
    let page = if failed.page.is_empty() {
        String::new()
    } else {
        format!("{}: ", failed.page)
    };
    tagged(
        Tag::Warn,
        &format!(
            "{page}could not download {} ({}): {}",
            failed.filename, failed.url, failed.reason
        ),
        color,
    )
}

// ============================================================================
// Run summary
// ============================================================================

/// Final lines of a successful run: failed images, totals and the archive.
pub fn format_report(report: &BuildReport, color: bool) -> Vec<String> {
    let mut lines: Vec<String> = report
        .failed_images
        .iter()
        .map(|failed| format_failed_image(failed, color))
        .collect();

    let mut summary = format!(
        "Generated {}, {}, {}",
        plural(report.pages.len(), "page", "pages"),
        plural(report.stylesheets.len(), "stylesheet", "stylesheets"),
        plural(report.images_written, "image", "images"),
    );
    if !report.failed_images.is_empty() {
        summary.push_str(&format!(
            " ({} failed)",
            plural(report.failed_images.len(), "image", "images")
        ));
    }
    if let Some(revision) = &report.revision {
        summary.push_str(&format!(" from revision {revision}"));
    }
    lines.push(summary);

    if let Some(archive) = &report.archive {
        lines.push(format!("Wrote {}", archive.display()));
    }
    lines
}

/// ` FAIL ` banner with the error and its full cause chain.
///
/// A cause whose message is already part of the line above it is skipped, so
/// wrappers that quote their source do not print it twice.
pub fn format_error(err: &dyn Error, color: bool) -> Vec<String> {
    let mut shown = err.to_string();
    let mut lines = vec![tagged(Tag::Fail, &shown, color)];
    let mut source = err.source();
    while let Some(cause) = source {
        let message = cause.to_string();
        if !shown.contains(&message) {
            lines.push(format!("    caused by: {message}"));
            shown = message;
        }
        source = cause.source();
    }
    lines
}

// ============================================================================
// Printer
// ============================================================================

/// Writes formatted lines to the console.
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    color: bool,
    error_color: bool,
}

impl Printer {
    /// Colour when the stream a line goes to is a terminal and `NO_COLOR` is
    /// not set. Progress goes to stdout, the FAIL banner to stderr.
    pub fn detect() -> Self {
        let allowed = std::env::var_os("NO_COLOR").is_none();
        Self {
            color: allowed && std::io::stdout().is_terminal(),
            error_color: allowed && std::io::stderr().is_terminal(),
        }
    }

    /// Plain output, no escape codes.
    pub fn plain() -> Self {
        Self {
            color: false,
            error_color: false,
        }
    }

    pub fn color(&self) -> bool {
        self.color
    }

    pub fn error_color(&self) -> bool {
        self.error_color
    }

    pub fn read(&self, file_name: &str) {
        println!("{}", format_read(file_name, self.color));
    }

    pub fn done(&self, output_name: &str) {
        println!("{}", format_done(output_name, self.color));
    }

    pub fn image(&self, filename: &str) {
        println!("{}", format_image(filename, self.color));
    }

    pub fn css(&self, output_name: &str) {
        println!("{}", format_css(output_name, self.color));
    }

    pub fn sync(&self, outcome: SyncOutcome, dir: &Path) {
        println!("{}", format_sync(outcome, dir, self.color));
    }

    pub fn report(&self, report: &BuildReport) {
        for line in format_report(report, self.color) {
            println!("{line}");
        }
    }

    pub fn error(&self, err: &dyn Error) {
        for line in format_error(err, self.error_color) {
            eprintln!("{line}");
        }
    }
}
