//! Inline span parsing: `**bold**` and `[text](url)`.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::{TextRun, TextStyle};

static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid regex"));

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid regex"));

/// Split a line into styled runs.
///
/// Whichever span starts first is taken; on a tie the link wins. Text between
/// spans becomes plain runs. Empty input yields a single empty run.
pub fn parse_inline(text: &str) -> Vec<TextRun> {
    let mut runs = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
        let bold = BOLD_RE.captures_at(text, pos);
        let link = LINK_RE.captures_at(text, pos);

        let (caps, style) = match (bold, link) {
            (Some(b), Some(l)) if start(&b) < start(&l) => (b, TextStyle::bold()),
            (Some(b), None) => (b, TextStyle::bold()),
            (_, Some(l)) => {
                let url = l[2].to_string();
                (l, TextStyle::link(url))
            }
            (None, None) => {
                runs.push(TextRun::plain(&text[pos..]));
                break;
            }
        };

        let Some(whole) = caps.get(0) else { break };
        if whole.start() > pos {
            runs.push(TextRun::plain(&text[pos..whole.start()]));
        }
        runs.push(TextRun {
            content: caps[1].to_string(),
            style,
        });
        pos = whole.end();
    }

    if runs.is_empty() {
        runs.push(TextRun::plain(text));
    }
    runs
}

fn start(caps: &Captures<'_>) -> usize {
    caps.get(0).map_or(usize::MAX, |m| m.start())
}
