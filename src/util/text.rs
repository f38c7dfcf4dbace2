use std::borrow::Cow;

/// Ellipsis appended by [`truncate_chars`].
const ELLIPSIS: &str = "...";

/// Truncates a string to at most `max_chars` characters, appending "..."
/// when anything was cut.
///
/// Counts Unicode scalar values, not bytes, so multi-byte text never splits
/// mid-character. The ellipsis is not counted against `max_chars`.
///
/// ```
/// use feedvault::util::truncate_chars;
///
/// assert_eq!(truncate_chars("Short", 10), "Short");
/// assert_eq!(truncate_chars("Hello World", 5), "Hello...");
/// ```
pub fn truncate_chars(s: &str, max_chars: usize) -> Cow<'_, str> {
    match s.char_indices().nth(max_chars) {
        None => Cow::Borrowed(s),
        Some((cut, _)) => Cow::Owned(format!("{}{}", &s[..cut], ELLIPSIS)),
    }
}

/// Collapses every run of whitespace (including newlines) to a single space
/// and trims both ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replaces `\r\n` and `\n` line breaks with single spaces, then trims.
pub fn flatten_lines(s: &str) -> String {
    s.replace("\r\n", " ").replace('\n', " ").trim().to_string()
}
