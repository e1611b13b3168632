//! Module-scoped stylesheets
//!
//! Stylesheets are tagged with the owning module's name so teardown can remove
//! exactly the sheets a module brought in. A stylesheet that fails to load is
//! logged and otherwise ignored: missing styles never block rendering.

use crate::runtime::Document;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct StyleManager {
    document: Arc<dyn Document>,
}

impl StyleManager {
    pub fn new(document: Arc<dyn Document>) -> Self {
        Self { document }
    }

    /// Add each stylesheet not already present for `module_name` and wait for all of them.
    ///
    /// Returns the number of stylesheets that were added.
    pub async fn apply(&self, module_name: &str, css_files: &[String]) -> usize {
        let mut seen = HashSet::new();
        let pending: Vec<&String> = css_files
            .iter()
            .filter(|href| seen.insert(href.as_str()))
            .filter(|href| !self.document.has_stylesheet(module_name, href))
            .collect();

        if pending.is_empty() {
            return 0;
        }

        let loads = pending
            .iter()
            .map(|href| self.document.add_stylesheet(module_name, href));
        let results = join_all(loads).await;

        for (href, result) in pending.iter().zip(results) {
            match result {
                Ok(()) => debug!(module = %module_name, href = %href, "Stylesheet applied"),
                Err(e) => warn!(
                    module = %module_name,
                    href = %href,
                    error = %e,
                    "Stylesheet failed to load, continuing without it"
                ),
            }
        }

        pending.len()
    }

    /// Remove every stylesheet tagged with `module_name`.
    pub fn remove(&self, module_name: &str) -> usize {
        let removed = self.document.remove_stylesheets(module_name);
        if removed > 0 {
            debug!(module = %module_name, removed, "Stylesheets removed");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::memory::MemoryDocument;

    fn css(files: &[&str]) -> Vec<String> {
        files.iter().map(|f| f.to_string()).collect()
    }

    #[tokio::test]
    async fn test_apply_is_idempotent() {
        let document = Arc::new(MemoryDocument::new());
        let styles = StyleManager::new(document.clone());

        let added = styles
            .apply("chat", &css(&["/css/chat.css", "/css/chat.css", "/css/emoji.css"]))
            .await;
        assert_eq!(added, 2);

        let added_again = styles.apply("chat", &css(&["/css/chat.css"])).await;
        assert_eq!(added_again, 0);
        assert_eq!(document.stylesheets("chat").len(), 2);
    }

    #[tokio::test]
    async fn test_failed_stylesheet_does_not_block() {
        let document = Arc::new(MemoryDocument::new());
        document.fail_stylesheet("/css/missing.css");
        let styles = StyleManager::new(document.clone());

        let added = styles
            .apply("files", &css(&["/css/missing.css", "/css/files.css"]))
            .await;

        assert_eq!(added, 2);
        assert!(document.has_stylesheet("files", "/css/files.css"));
    }

    #[tokio::test]
    async fn test_remove_scoped_to_module() {
        let document = Arc::new(MemoryDocument::new());
        let styles = StyleManager::new(document.clone());

        styles.apply("chat", &css(&["/css/chat.css"])).await;
        styles.apply("files", &css(&["/css/files.css"])).await;

        assert_eq!(styles.remove("chat"), 1);
        assert_eq!(styles.remove("chat"), 0);
        assert!(document.stylesheets("chat").is_empty());
        assert_eq!(document.stylesheets("files"), vec!["/css/files.css"]);
    }
}
