//! Splitting of oversized payloads into Telegram-sized chunks.
//!
//! Chunks are contiguous slices of the payload, so the bytes of the delivered chunks always form
//! a prefix of it.

/// Payloads longer than this many characters are split before sending.
pub const SPLIT_THRESHOLD: usize = 4000;
/// Maximum characters per chunk once a payload is split.
pub const CHUNK_CHARS: usize = 2000;

/// Splits `text` for delivery: whole when it has at most [`SPLIT_THRESHOLD`] characters, otherwise
/// in chunks of at most [`CHUNK_CHARS`] characters.
pub fn split_payload(text: &str) -> Vec<&str> {
    if text.chars().count() <= SPLIT_THRESHOLD {
        return vec![text];
    }
    split_chunks(text, CHUNK_CHARS)
}

/// Cuts `text` into chunks of at most `max_chars` characters, ending each chunk after the last
/// newline that fits and falling back to a hard cut for lines longer than a chunk.
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let hard = match rest.char_indices().nth(max_chars) {
            Some((idx, _)) => idx,
            None => {
                chunks.push(rest);
                break;
            }
        };
        let cut = rest[..hard].rfind('\n').map(|i| i + 1).unwrap_or(hard);
        chunks.push(&rest[..cut]);
        rest = &rest[cut..];
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_threshold_is_not_split() {
        let text = "a".repeat(SPLIT_THRESHOLD);
        assert_eq!(split_payload(&text), vec![text.as_str()]);
    }

    #[test]
    fn test_one_over_threshold_is_split() {
        let text = "a".repeat(SPLIT_THRESHOLD + 1);
        let chunks = split_payload(&text);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= CHUNK_CHARS));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_prefers_line_boundaries() {
        let line = format!("{}\n", "x".repeat(999));
        let text = line.repeat(5);
        let chunks = split_chunks(&text, CHUNK_CHARS);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], line.repeat(2));
        assert_eq!(chunks[1], line.repeat(2));
        assert_eq!(chunks[2], line);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let text = "é".repeat(SPLIT_THRESHOLD);
        assert_eq!(split_payload(&text).len(), 1);
        let chunks = split_chunks(&text, 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 3));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(split_payload(""), vec![""]);
        assert!(split_chunks("", 10).is_empty());
    }
}
