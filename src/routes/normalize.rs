//! Path normalization
//!
//! Every path that enters the engine (registration, `navigate`, link hrefs,
//! history state) goes through the same normalizer so the route table only
//! ever compares exact, absolute, query-free paths.

use crate::types::{NavError, Result};
use url::Url;

/// Extensions that mark a path as a full document reference.
pub const PAGE_FILE_EXTENSIONS: &[&str] = &[".html", ".htm"];

/// Resolves raw paths and hrefs against the application origin.
#[derive(Debug, Clone)]
pub struct PathNormalizer {
    origin: Url,
}

impl PathNormalizer {
    /// Create a normalizer for an absolute http(s) origin such as `http://localhost:8080`.
    pub fn new(origin: &str) -> Result<Self> {
        let mut origin = Url::parse(origin)
            .map_err(|e| NavError::InvalidPath(format!("invalid origin '{}': {}", origin, e)))?;

        if origin.cannot_be_a_base() || !matches!(origin.scheme(), "http" | "https") {
            return Err(NavError::InvalidPath(format!(
                "origin must be an absolute http(s) URL, got '{}'",
                origin
            )));
        }

        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);

        Ok(Self { origin })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Resolve `raw` relative to `base_path` on the application origin.
    pub fn resolve(&self, raw: &str, base_path: &str) -> Option<Url> {
        let base = self.origin.join(base_path).ok()?;
        base.join(raw.trim()).ok()
    }

    /// Normalize `raw` to an absolute path, resolving relative paths from the root.
    pub fn normalize(&self, raw: &str) -> String {
        self.normalize_from(raw, "/")
    }

    /// Normalize `raw` to an absolute path, resolving relative paths from `base_path`.
    pub fn normalize_from(&self, raw: &str, base_path: &str) -> String {
        match self.resolve(raw, base_path) {
            Some(url) => url.path().to_string(),
            None => strip_query_and_fragment(raw),
        }
    }

    /// Origin-relative href for a full-page load, keeping query and fragment.
    pub fn href_for(&self, raw: &str) -> String {
        match self.resolve(raw, "/") {
            Some(url) => {
                let mut href = url.path().to_string();
                if let Some(query) = url.query() {
                    href.push('?');
                    href.push_str(query);
                }
                if let Some(fragment) = url.fragment() {
                    href.push('#');
                    href.push_str(fragment);
                }
                href
            }
            None => raw.trim().to_string(),
        }
    }

    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin.origin()
    }
}

fn strip_query_and_fragment(raw: &str) -> String {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    let path = raw[..end].trim();
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Whether `path` looks like a full document reference (`/legacy.html`).
pub fn is_page_file(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    PAGE_FILE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Derive a module name from an href: strip the leading slash and page-file extension.
///
/// `/chat.html` becomes `chat`, `/settings/profile.html` becomes `settings/profile`.
pub fn module_name_for(href: &str) -> String {
    let trimmed = href.trim().trim_start_matches('/');
    let lower = trimmed.to_ascii_lowercase();

    for ext in PAGE_FILE_EXTENSIONS {
        if lower.ends_with(ext) {
            return trimmed[..trimmed.len() - ext.len()].to_string();
        }
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn localhost() -> PathNormalizer {
        PathNormalizer::new("http://localhost").unwrap()
    }

    #[rstest]
    #[case("/chat.html", "/chat.html")]
    #[case("chat.html", "/chat.html")]
    #[case("/chat.html?tab=2", "/chat.html")]
    #[case("/chat.html#history", "/chat.html")]
    #[case("/a/../b.html", "/b.html")]
    #[case("./settings.html", "/settings.html")]
    #[case("", "/")]
    #[case("http://localhost/files.html", "/files.html")]
    fn test_normalize(#[case] raw: &str, #[case] expected: &str) {
        let normalizer = localhost();
        assert_eq!(normalizer.normalize(raw), expected);
    }

    #[test]
    fn test_normalize_relative_to_base() {
        let normalizer = localhost();
        assert_eq!(
            normalizer.normalize_from("profile.html", "/settings/index.html"),
            "/settings/profile.html"
        );
    }

    #[rstest]
    #[case("/login.html?next=/chat.html", "/login.html?next=/chat.html")]
    #[case("reports.htm?q=1#top", "/reports.htm?q=1#top")]
    #[case("/legacy.html", "/legacy.html")]
    fn test_href_for_keeps_query(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(localhost().href_for(raw), expected);
    }

    #[test]
    fn test_origin_validation() {
        assert!(PathNormalizer::new("http://localhost:8080").is_ok());
        assert!(PathNormalizer::new("https://chat.example.com/app/").is_ok());
        assert!(PathNormalizer::new("mailto:someone@example.com").is_err());
        assert!(PathNormalizer::new("not a url").is_err());
    }

    #[test]
    fn test_same_origin() {
        let normalizer = PathNormalizer::new("http://localhost:8080").unwrap();
        let inside = normalizer.resolve("/chat.html", "/").unwrap();
        let outside = normalizer.resolve("https://example.com/", "/").unwrap();

        assert!(normalizer.is_same_origin(&inside));
        assert!(!normalizer.is_same_origin(&outside));
    }

    #[rstest]
    #[case("/index.html", true)]
    #[case("/LEGACY.HTM", true)]
    #[case("/chat", false)]
    #[case("/", false)]
    fn test_is_page_file(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_page_file(path), expected);
    }

    #[rstest]
    #[case("/chat.html", "chat")]
    #[case("/settings/profile.html", "settings/profile")]
    #[case("files", "files")]
    #[case("/Upload.HTML", "Upload")]
    fn test_module_name_for(#[case] href: &str, #[case] expected: &str) {
        assert_eq!(module_name_for(href), expected);
    }
}
