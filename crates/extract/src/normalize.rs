/// Page separator emitted by PDF text extraction
const PAGE_BREAK: char = '\x0C';

/// Clean extracted text before chunking
///
/// Whitespace inside a page collapses to single spaces, control characters
/// are dropped and pages are separated by a blank line. Empty pages vanish.
pub fn normalize_text(raw: &str) -> String {
    raw.split(PAGE_BREAK)
        .map(normalize_page)
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn normalize_page(page: &str) -> String {
    page.split_whitespace()
        .map(|word| word.chars().filter(|c| !c.is_control()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode file bytes as UTF-8, falling back to Latin-1
///
/// The fallback maps each byte to one char, so nothing becomes U+FFFD.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}
