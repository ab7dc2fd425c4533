//! Text helpers shared by the bot layer

/// Truncate a string to at most `max_chars` characters (Unicode-safe)
///
/// # Examples
///
/// ```
/// use stream_relay_bot::utils::truncate_str;
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

/// Escape text for Telegram HTML, truncating it first to `max_chars`.
///
/// Truncation happens before escaping so entities are never cut in half.
#[must_use]
pub fn escape_truncated(s: &str, max_chars: usize) -> String {
    let truncated = truncate_str(s, max_chars);
    let mut escaped = html_escape::encode_text(&truncated).into_owned();
    if truncated.len() < s.len() {
        escaped.push('…');
    }
    escaped
}
