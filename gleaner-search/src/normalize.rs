//! Text normalisation: raw page bodies to a title and flattened plain text.
//!
//! HTML is walked element by element. Every block element becomes one line
//! (no wrapping), list items get a `* ` bullet, and link targets, images,
//! table structure and emphasis are dropped while their visible text is
//! kept. Bodies without markup skip the HTML pass and are only tidied line
//! by line, which makes normalisation idempotent on its own output. The
//! declared media type is not consulted: servers routinely label HTML as
//! `text/plain`.

use encoding_rs::Encoding;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::config::PipelineConfig;
use crate::encoding;

/// Elements whose content never reaches the flattened text.
const SKIPPED_ELEMENTS: &[&str] = &[
    "head", "script", "style", "noscript", "template", "svg", "iframe", "object", "canvas", "img",
    "picture", "video", "audio", "select", "button",
];

/// Elements that start and end a line.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "caption", "dd", "details", "div", "dl",
    "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table", "tbody",
    "thead", "tfoot", "tr", "ul",
];

/// Prefixes that mark a line as a bullet for menu stripping.
const BULLET_PREFIXES: &[char] = &['*', '-', '+', '\u{2022}', '\u{b7}', '>', '|'];

/// Title and content of one normalised document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    pub title: String,
    pub content: String,
}

/// Post-processing applied to content before it is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPolicy {
    /// Drop short bullet lines.
    pub strip_menus: bool,
    /// Bullet lines with at least this many characters are kept.
    pub menu_line_threshold: usize,
    /// Byte cap on the final content.
    pub max_bytes: Option<usize>,
}

impl Default for ContentPolicy {
    fn default() -> Self {
        Self {
            strip_menus: false,
            menu_line_threshold: 50,
            max_bytes: None,
        }
    }
}

impl From<&PipelineConfig> for ContentPolicy {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            strip_menus: config.strip_menus,
            menu_line_threshold: config.menu_line_threshold,
            max_bytes: config.max_content_bytes,
        }
    }
}

impl ContentPolicy {
    /// Apply menu stripping then truncation.
    pub fn apply(&self, content: &str) -> String {
        let content = if self.strip_menus {
            strip_menu_lines(content, self.menu_line_threshold)
        } else {
            content.to_owned()
        };
        match self.max_bytes {
            Some(max) => truncate_to_bytes(&content, max),
            None => content,
        }
    }
}

/// Normalise a raw body decoded with `encoding`.
pub fn normalize(bytes: &[u8], encoding: &'static Encoding) -> Normalized {
    let text = encoding::decode(bytes, encoding);
    normalize_str(&text)
}

/// Normalise an already-decoded body.
///
/// Anything that looks like markup is flattened as HTML; everything else
/// takes the plain-text path.
pub fn normalize_str(text: &str) -> Normalized {
    if looks_like_markup(text) {
        normalize_html(text)
    } else {
        Normalized {
            title: String::new(),
            content: normalize_plain(text),
        }
    }
}

/// Flatten an HTML document into a title and line-per-block text.
pub fn normalize_html(html: &str) -> Normalized {
    let document = Html::parse_document(html);
    let title = extract_title(&document);

    let mut writer = LineWriter::default();
    flatten_element(document.root_element(), &mut writer);
    let flattened = writer.finish();

    Normalized {
        title,
        content: unescape(&flattened).trim().to_owned(),
    }
}

/// Tidy text that carries no markup: line whitespace and blank lines.
///
/// Entities are left alone, so already-normalised content passes through
/// unchanged.
pub fn normalize_plain(text: &str) -> String {
    text.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decode HTML entities in text lifted out of markup.
/// Clean a title: unescape entities, drop line breaks, trim.
pub fn clean_title(raw: &str) -> String {
    unescape(raw)
        .chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .collect::<String>()
        .trim()
        .to_owned()
}

/// Remove bullet-prefixed lines shorter than `threshold` characters.
pub fn strip_menu_lines(text: &str, threshold: usize) -> String {
    text.lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            let is_bullet = trimmed.starts_with(BULLET_PREFIXES);
            !(is_bullet && trimmed.chars().count() < threshold)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Truncate to at most `max_bytes` bytes, breaking at a char boundary.
pub fn truncate_to_bytes(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_owned();
    }

    let mut end = max_bytes;
    while !text.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    text[..end].trim_end().to_owned()
}

/// Whether `text` contains anything that looks like an HTML tag.
fn looks_like_markup(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.windows(2).any(|pair| {
        pair[0] == b'<' && (pair[1].is_ascii_alphabetic() || matches!(pair[1], b'/' | b'!' | b'?'))
    })
}

fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of the first `<title>` element, cleaned.
fn extract_title(document: &Html) -> String {
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };
    document
        .select(&selector)
        .next()
        .map(|el| clean_title(&el.text().collect::<String>()))
        .unwrap_or_default()
}

fn flatten_element(element: ElementRef<'_>, writer: &mut LineWriter) {
    let name = element.value().name();
    if SKIPPED_ELEMENTS.contains(&name) {
        return;
    }
    if name == "br" {
        writer.break_line();
        return;
    }

    let is_block = BLOCK_ELEMENTS.contains(&name);
    if is_block {
        writer.break_line();
    }
    if name == "li" {
        writer.push_text("* ");
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => writer.push_text(text),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    flatten_element(child_element, writer);
                }
            }
            _ => {}
        }
    }

    match name {
        "td" | "th" => writer.push_text(" "),
        _ if is_block => writer.break_line(),
        _ => {}
    }
}

/// Accumulates flattened text one line at a time.
#[derive(Default)]
struct LineWriter {
    lines: Vec<String>,
    current: String,
}

impl LineWriter {
    fn push_text(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                if !self.current.is_empty() && !self.current.ends_with(' ') {
                    self.current.push(' ');
                }
            } else {
                self.current.push(ch);
            }
        }
    }

    fn break_line(&mut self) {
        let line = self.current.trim();
        // A bullet with no text after it carries nothing.
        if !line.is_empty() && line != "*" {
            self.lines.push(line.to_owned());
        }
        self.current.clear();
    }

    fn finish(mut self) -> String {
        self.break_line();
        self.lines.join("\n")
    }
}
