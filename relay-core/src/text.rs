//! Pure text helpers shared by both directions of the relay: mention defusing, content hashing,
//! and character-safe truncation.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Breaks `@` mentions in a game nickname so it cannot ping Telegram users.
///
/// A lone `@` is left alone; anything longer gets every `@` turned into `@-`.
#[inline]
pub fn defuse_mentions(nickname: &str) -> String {
    if nickname.len() > 1 && nickname.contains('@') {
        nickname.replace('@', "@-")
    } else {
        nickname.to_string()
    }
}

/// Hash used to tell two texts apart and to build idempotency keys. Deterministic within a build.
pub fn content_hash(content: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(content_hash("alice: hi"), content_hash("alice: hi"));
        assert_ne!(content_hash("alice: hi"), content_hash("bob: yo"));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 255), "hi");
        assert_eq!(truncate_chars("", 0), "");
    }

    #[test]
    fn test_defuse_mentions() {
        assert_eq!(defuse_mentions("@admin"), "@-admin");
        assert_eq!(defuse_mentions("a@b@c"), "a@-b@-c");
        assert_eq!(defuse_mentions("@"), "@");
        assert_eq!(defuse_mentions("plain"), "plain");
        assert_eq!(defuse_mentions(""), "");
    }
}
