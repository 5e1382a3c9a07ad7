//! Markdown-to-document-block conversion.
//!
//! Reports are plain Markdown; the document service wants its own block
//! objects. This crate maps the small Markdown subset the renderers emit
//! (headings 1-4, bullet and numbered lists, quotes, rules, bold and link
//! spans) onto those blocks and serializes them in the service's wire shape.

mod inline;

use std::sync::LazyLock;

use regex::Regex;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::{debug, instrument};

pub use inline::parse_inline;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Inline style flags for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub link: Option<String>,
}

impl TextStyle {
    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Self::default()
        }
    }

    pub fn link(url: impl Into<String>) -> Self {
        Self {
            link: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn is_plain(&self) -> bool {
        !self.bold && !self.italic && self.link.is_none()
    }
}

impl Serialize for TextStyle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if self.bold {
            map.serialize_entry("bold", &true)?;
        }
        if self.italic {
            map.serialize_entry("italic", &true)?;
        }
        if let Some(url) = &self.link {
            map.serialize_entry("link", &serde_json::json!({ "url": url }))?;
        }
        map.end()
    }
}

/// A span of text sharing one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub content: String,
    pub style: TextStyle,
}

impl TextRun {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            style: TextStyle::default(),
        }
    }
}

impl Serialize for TextRun {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Inner<'a> {
            content: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            text_element_style: Option<&'a TextStyle>,
        }

        let inner = Inner {
            content: &self.content,
            text_element_style: (!self.style.is_plain()).then_some(&self.style),
        };
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("text_run", &inner)?;
        map.end()
    }
}

/// One document block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Text(Vec<TextRun>),
    /// Level 1-4.
    Heading { level: u8, runs: Vec<TextRun> },
    Bullet(Vec<TextRun>),
    Ordered(Vec<TextRun>),
    Divider,
}

impl Block {
    /// Numeric block type used by the document service.
    pub fn block_type(&self) -> u8 {
        match self {
            Block::Text(_) => 2,
            Block::Heading { level, .. } => 2 + level,
            Block::Bullet(_) => 12,
            Block::Ordered(_) => 13,
            Block::Divider => 22,
        }
    }

    /// Runs carried by the block; empty for dividers.
    pub fn runs(&self) -> &[TextRun] {
        match self {
            Block::Text(runs)
            | Block::Heading { runs, .. }
            | Block::Bullet(runs)
            | Block::Ordered(runs) => runs,
            Block::Divider => &[],
        }
    }

    /// Concatenated run text.
    pub fn plain_text(&self) -> String {
        self.runs().iter().map(|r| r.content.as_str()).collect()
    }

    fn payload_key(&self) -> &'static str {
        match self {
            Block::Text(_) => "text",
            Block::Heading { level: 1, .. } => "heading1",
            Block::Heading { level: 2, .. } => "heading2",
            Block::Heading { level: 3, .. } => "heading3",
            Block::Heading { .. } => "heading4",
            Block::Bullet(_) => "bullet",
            Block::Ordered(_) => "ordered",
            Block::Divider => "divider",
        }
    }
}

impl Serialize for Block {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Elements<'a> {
            elements: &'a [TextRun],
        }

        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("block_type", &self.block_type())?;
        match self {
            Block::Divider => map.serialize_entry("divider", &serde_json::json!({}))?,
            _ => map.serialize_entry(
                self.payload_key(),
                &Elements {
                    elements: self.runs(),
                },
            )?,
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

static ORDERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s+").expect("valid regex"));

static ORDERED_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s*").expect("valid regex"));

/// Full-width space used to fake list nesting.
const NEST_INDENT: &str = "\u{3000}\u{3000}";

/// Convert Markdown into document blocks, one line at a time.
///
/// Headings are matched on the raw line; list and quote markers on the
/// trimmed line. Nested list items are flattened into bullets indented with
/// full-width spaces. Blank lines produce nothing.
#[instrument(skip_all, fields(bytes = markdown.len()))]
pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    let mut blocks = Vec::new();

    for line in markdown.lines() {
        let stripped = line.trim();

        if let Some((level, rest)) = heading(line) {
            blocks.push(Block::Heading {
                level,
                runs: parse_inline(rest),
            });
        } else if line.starts_with("---") {
            blocks.push(Block::Divider);
        } else if let Some(rest) = stripped.strip_prefix("- ") {
            let level = indent_level(line);
            if level == 0 {
                let text = stripped.trim_start_matches(['-', ' ']).trim();
                blocks.push(Block::Bullet(parse_inline(text)));
            } else {
                blocks.push(nested_bullet(level, rest));
            }
        } else if ORDERED_RE.is_match(stripped) {
            let text = ORDERED_MARKER_RE.replace(stripped, "");
            let level = indent_level(line);
            if level == 0 {
                blocks.push(Block::Ordered(parse_inline(text.trim())));
            } else {
                blocks.push(nested_bullet(level, &text));
            }
        } else if let Some(rest) = stripped.strip_prefix("> ") {
            let runs = parse_inline(rest)
                .into_iter()
                .map(|mut run| {
                    run.style.italic = true;
                    run
                })
                .collect();
            blocks.push(Block::Text(runs));
        } else if !stripped.is_empty() {
            blocks.push(Block::Text(parse_inline(stripped)));
        }
    }

    debug!(count = blocks.len(), "parsed blocks");
    blocks
}

fn heading(line: &str) -> Option<(u8, &str)> {
    ["# ", "## ", "### ", "#### "]
        .iter()
        .zip(1u8..)
        .find_map(|(marker, level)| line.strip_prefix(marker).map(|rest| (level, rest)))
}

/// Two spaces or one tab per level.
fn indent_level(line: &str) -> usize {
    let width: usize = line
        .chars()
        .map_while(|c| match c {
            ' ' => Some(1),
            '\t' => Some(2),
            _ => None,
        })
        .sum();
    width / 2
}

fn nested_bullet(level: usize, text: &str) -> Block {
    let text = text.trim_start_matches(['-', ' ']).trim();
    let mut runs = parse_inline(text);
    let prefix = NEST_INDENT.repeat(level);
    match runs.first_mut() {
        Some(first) if first.style.is_plain() => first.content.insert_str(0, &prefix),
        _ => runs.insert(0, TextRun::plain(prefix)),
    }
    Block::Bullet(runs)
}
