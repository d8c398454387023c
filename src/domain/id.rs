//! Entity ids
//!
//! Ids reach the system only as path text. They are checked here before any
//! numeric parse or storage lookup happens.

/// A valid id is non-empty and made of ASCII digits only.
pub fn is_valid_id(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// Parse id text, `None` when it is malformed or does not fit in an `i64`.
pub fn parse_id(text: &str) -> Option<i64> {
    if !is_valid_id(text) {
        return None;
    }
    text.parse().ok()
}
