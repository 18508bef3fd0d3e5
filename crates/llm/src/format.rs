//! Chat formatting for the final summary
//!
//! Output targets Telegram's legacy Markdown: `*bold*`, `_italic_` and
//! plain `•` bullets. Anything richer is flattened.

use regex::Regex;
use std::sync::LazyLock;

use crate::chunking::split_paragraphs;

/// Appended when the summary had to be cut
pub const TRUNCATION_MARKER: &str = "\n(…)";

static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#{1,6}\s+(.+?)\s*#*$").unwrap());
static DOUBLE_STAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static DOUBLE_UNDERSCORE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"__(.+?)__").unwrap());
static BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\s*)[-*+]\s+").unwrap());

/// Normalize model output for chat rendering
pub fn normalize_for_chat(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");

    let lines: Vec<String> = text
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .map(normalize_line)
        .collect();

    split_paragraphs(&lines.join("\n")).join("\n\n")
}

fn normalize_line(line: &str) -> String {
    let line = line.trim_end();
    let line = HEADING.replace(line, "*$1*");
    let line = DOUBLE_STAR.replace_all(&line, "*$1*");
    let line = DOUBLE_UNDERSCORE.replace_all(&line, "_${1}_");
    BULLET.replace(&line, "$1• ").into_owned()
}

/// Cut `text` to at most `limit` characters, marker included.
///
/// The cut lands on the last sentence or line end that fits, else on the
/// last whitespace, so words are never split unless a single word is
/// longer than the limit. Returns the text and whether it was cut.
pub fn truncate_at_sentence(text: &str, limit: usize) -> (String, bool) {
    if text.chars().count() <= limit {
        return (text.to_string(), false);
    }

    let budget = limit.saturating_sub(TRUNCATION_MARKER.chars().count());
    let prefix_end = text.char_indices().nth(budget).map_or(text.len(), |(i, _)| i);
    let prefix = &text[..prefix_end];
    let next_char = text[prefix_end..].chars().next();

    let mut sentence_cut = None;
    let mut word_cut = None;
    let mut chars = prefix.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let after = i + c.len_utf8();
        let following = chars.peek().map(|&(_, n)| n).or(next_char);
        let at_gap = following.map_or(true, char::is_whitespace);

        let ascii_end = matches!(c, '.' | '!' | '?') && at_gap;
        if c == '\n' || matches!(c, '。' | '！' | '？') || ascii_end {
            sentence_cut = Some(after);
        }
        if c.is_whitespace() {
            word_cut = Some(i);
        } else if at_gap {
            word_cut = Some(after);
        }
    }

    let cut = sentence_cut
        .filter(|&c| c > 0)
        .or(word_cut.filter(|&c| c > 0))
        .unwrap_or(prefix_end);

    let kept = text[..cut].trim_end();
    (format!("{}{}", kept, TRUNCATION_MARKER), true)
}
