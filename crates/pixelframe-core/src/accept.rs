//! Accept-list matching for the file-picking surface.
//!
//! The list uses the same syntax as an HTML `accept` attribute: comma separated
//! extensions (`.jpg`), exact media types (`video/mp4`) or wildcards (`image/*`).

use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
enum AcceptToken {
    Extension(String),
    MediaType(String),
    TopLevel(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AcceptList {
    tokens: Vec<AcceptToken>,
}

impl AcceptList {
    pub fn parse(accept: &str) -> Self {
        let tokens = accept
            .split(',')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .map(|t| {
                if let Some(ext) = t.strip_prefix('.') {
                    AcceptToken::Extension(ext.to_string())
                } else if let Some(top) = t.strip_suffix("/*") {
                    AcceptToken::TopLevel(top.to_string())
                } else {
                    AcceptToken::MediaType(t)
                }
            })
            .collect();
        Self { tokens }
    }

    /// An empty list accepts everything.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn matches(&self, filename: &str, content_type: &str) -> bool {
        if self.tokens.is_empty() {
            return true;
        }

        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        let content_type = content_type.trim().to_lowercase();
        let top_level = content_type.split('/').next().unwrap_or_default();

        self.tokens.iter().any(|token| match token {
            AcceptToken::Extension(ext) => extension.as_deref() == Some(ext.as_str()),
            AcceptToken::MediaType(mt) => *mt == content_type,
            AcceptToken::TopLevel(top) => top == top_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_extensions_case_insensitively() {
        let accept = AcceptList::parse(".jpg, .MP4");
        assert!(accept.matches("photo.JPG", "image/jpeg"));
        assert!(accept.matches("clip.mp4", "video/mp4"));
        assert!(!accept.matches("photo.png", "image/png"));
        assert!(!accept.matches("noextension", "image/jpeg"));
    }

    #[test]
    fn matches_media_types_and_wildcards() {
        let accept = AcceptList::parse("image/*,video/webm");
        assert!(accept.matches("a.bin", "image/avif"));
        assert!(accept.matches("a.bin", "video/webm"));
        assert!(!accept.matches("a.bin", "video/mp4"));
    }

    #[test]
    fn empty_list_accepts_everything() {
        let accept = AcceptList::parse(" , ");
        assert!(accept.is_empty());
        assert!(accept.matches("notes.txt", "text/plain"));
    }
}
