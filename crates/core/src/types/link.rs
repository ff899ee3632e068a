//! Social link normalization for hall-of-fame profiles.

/// Normalize a user-entered social link.
///
/// Surrounding whitespace is trimmed. Blank input means "no link". Input that
/// already starts with `http://` or `https://` is kept as-is; anything else
/// gets `https://` prepended.
///
/// ```
/// use classfete_core::normalize_link;
///
/// assert_eq!(normalize_link("example.com").as_deref(), Some("https://example.com"));
/// assert_eq!(normalize_link("https://x.com").as_deref(), Some("https://x.com"));
/// assert_eq!(normalize_link("   "), None);
/// ```
#[must_use]
pub fn normalize_link(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Some(trimmed.to_owned())
    } else {
        Some(format!("https://{trimmed}"))
    }
}
