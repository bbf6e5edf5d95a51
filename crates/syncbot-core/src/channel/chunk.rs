//! Plain-text message chunking.
//!
//! Both platforms cap message length (Discord at 2000 characters, GroupMe at
//! 1000). Long relayed messages are split at safe boundaries instead of being
//! rejected by the API.

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Rules:
/// 1. Prefer splitting at line boundaries (`\n`).
/// 2. Fall back to word boundaries (` `), then a hard cut.
/// 3. Never split inside a UTF-8 code point.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if max_chars == 0 || text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.chars().count() <= max_chars {
            chunks.push(remaining.to_string());
            break;
        }

        // Byte offset just past the `max_chars`-th character.
        let limit = remaining
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(remaining.len());
        let candidate = &remaining[..limit];
        let split_at = find_split_point(candidate);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start_matches(['\n', ' ']);
    }

    chunks
}

/// Find the best byte offset to split `candidate`.
fn find_split_point(candidate: &str) -> usize {
    if let Some(pos) = candidate.rfind('\n')
        && pos > 0
    {
        return pos;
    }

    if let Some(pos) = candidate.rfind(' ')
        && pos > 0
    {
        return pos;
    }

    candidate.len()
}
