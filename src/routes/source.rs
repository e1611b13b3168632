//! Declarative route source
//!
//! The route table is seeded from an ordered list of navigation entries (the
//! same list that drives the sidebar). Module names and files are derived from
//! each entry's href by a fixed naming convention.

use super::normalize::{module_name_for, PathNormalizer};
use crate::types::RouteDescriptor;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One declarative navigation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavEntry {
    pub href: String,
    pub label: String,
    #[serde(default)]
    pub require_auth: bool,
    /// Stylesheets scoped to the entry's module.
    #[serde(default)]
    pub css: Vec<String>,
    /// Page title; defaults to `label`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl NavEntry {
    pub fn new(href: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            label: label.into(),
            require_auth: false,
            css: Vec::new(),
            title: None,
        }
    }

    pub fn requiring_auth(mut self) -> Self {
        self.require_auth = true;
        self
    }

    pub fn with_css(mut self, href: impl Into<String>) -> Self {
        self.css.push(href.into());
        self
    }
}

/// Ordered list of navigation entries that seeds the route table.
pub trait RouteSource: Send + Sync {
    fn entries(&self) -> Vec<NavEntry>;
}

impl RouteSource for Vec<NavEntry> {
    fn entries(&self) -> Vec<NavEntry> {
        self.clone()
    }
}

/// Naming convention mapping a module name to its code unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteConvention {
    module_dir: String,
}

impl RouteConvention {
    pub fn new(module_dir: impl Into<String>) -> Self {
        Self {
            module_dir: module_dir.into(),
        }
    }

    /// `{module_dir}/{module_name}.js`
    pub fn module_file_for(&self, module_name: &str) -> String {
        format!("{}/{}.js", self.module_dir.trim_end_matches('/'), module_name)
    }

    /// Build a descriptor for `entry`, already normalized to `path`.
    pub fn descriptor_for(&self, entry: &NavEntry, path: &str) -> RouteDescriptor {
        let module_name = module_name_for(path);
        RouteDescriptor {
            path: path.to_string(),
            module_file: self.module_file_for(&module_name),
            module_name,
            css_files: entry.css.clone(),
            require_auth: entry.require_auth,
            title: entry
                .title
                .clone()
                .unwrap_or_else(|| entry.label.clone()),
        }
    }
}

impl Default for RouteConvention {
    fn default() -> Self {
        Self::new("/js/pages")
    }
}

/// Derive route descriptors from navigation entries.
///
/// Entries pointing off-origin, at the home path, or at the login path are
/// not module routes and are skipped.
pub fn derive_routes(
    entries: &[NavEntry],
    convention: &RouteConvention,
    normalizer: &PathNormalizer,
    home_path: &str,
    login_path: &str,
) -> Vec<RouteDescriptor> {
    let mut routes = Vec::with_capacity(entries.len());

    for entry in entries {
        let Some(url) = normalizer.resolve(&entry.href, "/") else {
            debug!(href = %entry.href, "Skipping nav entry with unparseable href");
            continue;
        };

        if !normalizer.is_same_origin(&url) {
            debug!(href = %entry.href, "Skipping cross-origin nav entry");
            continue;
        }

        let path = url.path().to_string();
        if path == home_path || path == login_path {
            debug!(href = %entry.href, "Skipping nav entry for home/login path");
            continue;
        }

        routes.push(convention.descriptor_for(entry, &path));
    }

    routes
}
