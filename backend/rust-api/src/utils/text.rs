use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Lowercases, trims and strips diacritics (NFD decomposition minus combining marks).
///
/// Used for the exact-match check and before embedding a guess, so a guess is
/// embedded exactly the way target words were at ingestion time.
pub fn normalize_text(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Uniqueness key for anonymous nicknames: case-insensitive, whitespace-collapsed.
pub fn nickname_key(nickname: &str) -> String {
    nickname
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
