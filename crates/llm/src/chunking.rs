use resumer_common::{Result, ResumerError};

use crate::types::Chunk;

/// How far a cut may move back from the size limit to land on a boundary
const BOUNDARY_LOOKBACK: usize = 200;

/// Sentence endings that need trailing whitespace to count
const SENTENCE_ENDINGS: [char; 3] = ['.', '!', '?'];

/// CJK sentence endings, complete on their own
const FULLWIDTH_ENDINGS: [char; 3] = ['。', '！', '？'];

/// Split text into ordered chunks of at most `max_chunk_size` characters.
///
/// Each chunk after the first starts with the last `overlap` characters of
/// the previous one. Cuts prefer a paragraph break, then a sentence end,
/// within a short window before the size limit and fall back to a hard cut.
/// Empty text yields no chunks.
pub fn split(text: &str, max_chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    if max_chunk_size == 0 {
        return Err(ResumerError::invalid_input("max_chunk_size must be greater than 0"));
    }

    if overlap >= max_chunk_size {
        return Err(ResumerError::invalid_input(format!(
            "overlap ({}) must be smaller than max_chunk_size ({})",
            overlap, max_chunk_size
        )));
    }

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total {
        let limit = (start + max_chunk_size).min(total);

        let end = if limit < total {
            // Cut must leave more than `overlap` chars so the next start advances
            let floor = start + overlap + 1;
            find_break_point(&chars, floor, limit, max_chunk_size)
        } else {
            limit
        };

        let content: String = chars[start..end].iter().collect();
        chunks.push(Chunk::new(chunks.len(), content));

        if end == total {
            break;
        }

        start = end - overlap;
    }

    Ok(chunks)
}

/// Find a good breaking point (paragraph, then sentence boundary)
fn find_break_point(chars: &[char], floor: usize, limit: usize, max_chunk_size: usize) -> usize {
    let window = BOUNDARY_LOOKBACK.min(max_chunk_size / 4);
    let lowest = limit.saturating_sub(window).max(floor);

    (lowest..=limit)
        .rev()
        .find(|&cut| is_paragraph_break(chars, cut))
        .or_else(|| (lowest..=limit).rev().find(|&cut| is_sentence_break(chars, cut)))
        .unwrap_or(limit)
}

fn is_paragraph_break(chars: &[char], cut: usize) -> bool {
    cut >= 2 && chars[cut - 1] == '\n' && chars[cut - 2] == '\n'
}

fn is_sentence_break(chars: &[char], cut: usize) -> bool {
    let prev = chars[cut - 1];

    if FULLWIDTH_ENDINGS.contains(&prev) {
        return true;
    }

    if SENTENCE_ENDINGS.contains(&prev) {
        return chars.get(cut).map_or(true, |c| c.is_whitespace());
    }

    prev.is_whitespace() && cut >= 2 && SENTENCE_ENDINGS.contains(&chars[cut - 2])
}

/// Split text by paragraphs
pub fn split_paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
