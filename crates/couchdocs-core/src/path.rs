//! Key <-> filename mapping.
//!
//! Document keys may contain `/`, which can't appear in a filename,
//! so it travels to disk as `%2F`.

use std::path::Path;

const SLASH: &str = "/";
const ENCODED_SLASH: &str = "%2F";

/// Turns a document key into something usable as a file or directory name.
pub fn encode_segment(key: &str) -> String {
    key.replace(SLASH, ENCODED_SLASH)
}

/// Turns a file or directory name back into the document key.
pub fn decode_segment(name: &str) -> String {
    name.replace(ENCODED_SLASH, SLASH)
}

/// Dot-files (editor swap files, `.DS_Store`, ...) are never documents.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slash_is_percent_encoded() {
        assert_eq!(encode_segment("bar/baz"), "bar%2Fbaz");
        assert_eq!(decode_segment("bar%2Fbaz"), "bar/baz");
        assert_eq!(encode_segment("plain"), "plain");
    }

    #[test]
    fn test_hidden_files() {
        assert!(is_hidden(Path::new("dir/.DS_Store")));
        assert!(!is_hidden(Path::new(".hidden/visible.js")));
    }
}
