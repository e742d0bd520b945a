//! Markdown rendering.
//!
//! Wiki pages are GitHub-flavoured markdown. Rendering goes through
//! pulldown-cmark with the GFM extensions the wiki uses (tables,
//! strikethrough, task lists, footnotes); raw HTML passes through untouched.
//!
//! The event stream is rewritten on the way to HTML:
//!
//! - every heading gets a unique `id`, and headings from level 2 down to the
//!   configured depth are collected into the page's table of contents;
//! - fenced code blocks with a language tag are replaced by syntect's
//!   highlighted HTML. When the language is unknown, or syntect fails, the
//!   block is emitted exactly as pulldown-cmark would have emitted it.

use crate::config::MarkdownConfig;
use crate::naming::{AnchorSet, slugify};
use crate::types::TocEntry;
use pulldown_cmark::{
    CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd, html::push_html,
};
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarkdownError {
    #[error("unknown highlighting theme {0:?}")]
    UnknownTheme(String),
}

/// A rendered page body.
#[derive(Debug, Clone, Default)]
pub struct Rendered {
    pub html: String,
    pub toc: Vec<TocEntry>,
    /// Text of the first level-1 heading, if any.
    pub title: Option<String>,
}

/// Markdown renderer holding the syntect syntax and theme sets.
///
/// Loading those is expensive; build one renderer per run.
pub struct MarkdownRenderer {
    syntaxes: SyntaxSet,
    theme: Theme,
    toc_depth: u8,
}

impl MarkdownRenderer {
    pub fn new(config: &MarkdownConfig) -> Result<Self, MarkdownError> {
        let theme = ThemeSet::load_defaults()
            .themes
            .remove(&config.theme)
            .ok_or_else(|| MarkdownError::UnknownTheme(config.theme.clone()))?;
        Ok(Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            theme,
            toc_depth: config.toc_depth,
        })
    }

    pub fn render(&self, text: &str) -> Rendered {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_FOOTNOTES;
        let parser = Parser::new_ext(text, options);

        let mut rendered = Rendered::default();
        let events = self.transform(parser, &mut rendered);

        let mut html = String::with_capacity(text.len() * 2);
        push_html(&mut html, events.into_iter());
        rendered.html = html;
        rendered
    }

    fn transform<'a>(&self, parser: Parser<'a>, rendered: &mut Rendered) -> Vec<Event<'a>> {
        let mut anchors = AnchorSet::new();
        let mut events = Vec::new();
        let mut heading: Option<(u8, String, Vec<Event<'a>>)> = None;
        let mut code: Option<(String, String, Vec<Event<'a>>)> = None;

        for event in parser {
            if let Some((level, text, buffered)) = heading.as_mut() {
                match event {
                    Event::End(TagEnd::Heading(_)) => {
                        let level = *level;
                        let text = text.trim().to_string();
                        let id = anchors.unique(&slugify(&text));
                        events.push(Event::Html(format!("<h{level} id=\"{id}\">").into()));
                        events.append(buffered);
                        events.push(Event::Html(format!("</h{level}>\n").into()));
                        if level == 1 && rendered.title.is_none() {
                            rendered.title = Some(text.clone());
                        }
                        if (2..=self.toc_depth).contains(&level) {
                            rendered.toc.push(TocEntry {
                                level,
                                id,
                                title: text,
                            });
                        }
                        heading = None;
                    }
                    Event::Text(ref t) | Event::Code(ref t) => {
                        text.push_str(t);
                        buffered.push(event);
                    }
                    other => buffered.push(other),
                }
                continue;
            }

            if let Some((lang, source, buffered)) = code.as_mut() {
                if let Event::Text(ref t) = event {
                    source.push_str(t);
                }
                let done = matches!(event, Event::End(TagEnd::CodeBlock));
                buffered.push(event);
                if done {
                    match self.highlight(lang, source) {
                        Some(html) => events.push(Event::Html(html.into())),
                        None => events.append(buffered),
                    }
                    code = None;
                }
                continue;
            }

            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    heading = Some((level_number(level), String::new(), Vec::new()));
                }
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(ref info)))
                    if language_token(info).is_some() =>
                {
                    let lang = language_token(info).unwrap_or_default().to_string();
                    code = Some((lang, String::new(), vec![event]));
                }
                other => events.push(other),
            }
        }

        events
    }

    /// Highlight `source` as `lang`. `None` means "leave the block as is".
    fn highlight(&self, lang: &str, source: &str) -> Option<String> {
        let Some(syntax) = self.syntaxes.find_syntax_by_token(lang) else {
            log::warn!("no syntax for code block language {lang:?}, leaving it unhighlighted");
            return None;
        };
        match highlighted_html_for_string(source, &self.syntaxes, syntax, &self.theme) {
            Ok(html) => {
                log::debug!("highlighted {lang} code block");
                Some(html)
            }
            Err(err) => {
                log::warn!("highlighting {lang} code block failed: {err}");
                None
            }
        }
    }
}

/// First word of a fence info string (` ```lua {.numbered}` → `lua`).
fn language_token<'s>(info: &'s CowStr<'_>) -> Option<&'s str> {
    info.split(|c: char| c.is_whitespace() || c == ',')
        .next()
        .filter(|token| !token.is_empty())
}

fn level_number(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
