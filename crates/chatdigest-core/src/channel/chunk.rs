//! Message chunking for Telegram.
//!
//! Telegram limits text messages to 4096 characters. Summaries can exceed
//! that, so outgoing text is split at paragraph or line boundaries before it
//! is sent.

/// Default split threshold in bytes (below the Telegram limit for any text).
pub const DEFAULT_MAX_LEN: usize = 4000;

/// Split `text` into chunks of at most `max_len` bytes.
///
/// Splits prefer paragraph boundaries (`\n\n`), then line boundaries, then a
/// hard cut on a UTF-8 character boundary.
pub fn chunk_text(text: &str, max_len: Option<usize>) -> Vec<String> {
    let limit = max_len.unwrap_or(DEFAULT_MAX_LEN).max(1);

    if text.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= limit {
            chunks.push(remaining.to_string());
            break;
        }

        let split_at = find_split_point(remaining, limit);
        let chunk = remaining[..split_at].trim_end_matches(['\n', '\r']);
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        remaining = skip_leading_newlines(&remaining[split_at..]);
    }

    chunks
}

/// Find the best byte offset to split `text`, never past `limit`.
fn find_split_point(text: &str, limit: usize) -> usize {
    let mut cut = limit.min(text.len());
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    if cut == 0 {
        // A single character wider than the limit: emit it whole.
        return text.chars().next().map(char::len_utf8).unwrap_or(text.len());
    }

    let candidate = &text[..cut];

    if let Some(pos) = candidate.rfind("\n\n")
        && pos > 0
    {
        return pos;
    }

    if let Some(pos) = candidate.rfind('\n')
        && pos > 0
    {
        return pos;
    }

    cut
}

/// Skip leading newlines so the next chunk doesn't start with blank lines
/// left over from a paragraph or line split.
fn skip_leading_newlines(s: &str) -> &str {
    s.trim_start_matches(['\n', '\r'])
}
