//! Text helpers for caption splitting and log-safe truncation.

use unicode_segmentation::UnicodeSegmentation;

/// Splits text into a leading caption of at most `limit` characters plus the
/// untouched remainder.
///
/// The split point is backed off to an extended grapheme cluster boundary, so
/// emoji and combining sequences are never cut in half. Concatenating the two
/// halves always reconstructs the input exactly.
///
/// # Examples
///
/// ```
/// use newsroom_bot::utils::split_caption;
/// let (head, tail) = split_caption(&"a".repeat(2000), 1024);
/// assert_eq!(head.chars().count(), 1024);
/// assert_eq!(tail.as_deref().map(str::len), Some(976));
/// ```
#[must_use]
pub fn split_caption(text: &str, limit: usize) -> (String, Option<String>) {
    if text.chars().count() <= limit {
        return (text.to_string(), None);
    }

    let mut head_bytes = 0;
    let mut head_chars = 0;
    for grapheme in text.graphemes(true) {
        let grapheme_chars = grapheme.chars().count();
        if head_chars + grapheme_chars > limit {
            break;
        }
        head_chars += grapheme_chars;
        head_bytes += grapheme.len();
    }

    let (head, tail) = text.split_at(head_bytes);
    (head.to_string(), Some(tail.to_string()))
}

/// Safely truncates a string to a maximum character length (not bytes).
///
/// This is UTF-8 safe and will not panic on multi-byte characters.
///
/// # Examples
///
/// ```
/// use newsroom_bot::utils::truncate_str;
/// let s = "Привет, мир!";
/// assert_eq!(truncate_str(s, 6), "Привет");
/// ```
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}
