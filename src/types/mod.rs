use serde::{Deserialize, Serialize};

// ============= Route Types =============

/// A registered route: one normalized path mapped to the page module that renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    /// Normalized absolute path (no query, no fragment). Unique registry key.
    pub path: String,
    /// Logical module name; the key the module registers itself under.
    pub module_name: String,
    /// Code unit that defines the module. Loaded lazily, once.
    pub module_file: String,
    /// Stylesheets scoped to this module, in application order.
    #[serde(default)]
    pub css_files: Vec<String>,
    /// Gate navigation behind an authentication check.
    #[serde(default)]
    pub require_auth: bool,
    /// Human-readable page title.
    #[serde(default)]
    pub title: String,
}

impl RouteDescriptor {
    pub fn new(
        path: impl Into<String>,
        module_name: impl Into<String>,
        module_file: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            module_name: module_name.into(),
            module_file: module_file.into(),
            css_files: Vec::new(),
            require_auth: false,
            title: String::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_css(mut self, href: impl Into<String>) -> Self {
        self.css_files.push(href.into());
        self
    }

    pub fn requiring_auth(mut self) -> Self {
        self.require_auth = true;
        self
    }
}

/// The route the engine currently considers active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ActiveRoute {
    /// The home view; no page module is mounted.
    Home { path: String },
    /// A module-backed route.
    Page(RouteDescriptor),
}

impl ActiveRoute {
    pub fn path(&self) -> &str {
        match self {
            ActiveRoute::Home { path } => path,
            ActiveRoute::Page(descriptor) => &descriptor.path,
        }
    }

    pub fn descriptor(&self) -> Option<&RouteDescriptor> {
        match self {
            ActiveRoute::Home { .. } => None,
            ActiveRoute::Page(descriptor) => Some(descriptor),
        }
    }

    pub fn is_home(&self) -> bool {
        matches!(self, ActiveRoute::Home { .. })
    }
}

// ============= Navigation Types =============

/// Options accepted by `Router::navigate`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigateOptions {
    /// Replace the current history entry instead of pushing a new one.
    pub replace: bool,
}

impl NavigateOptions {
    pub fn replace() -> Self {
        Self { replace: true }
    }
}

/// Pipeline state of the navigation executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NavigationPhase {
    #[default]
    Idle,
    Guarding,
    Unmounting,
    Loading,
    Mounting,
    Settled,
    Failed,
}

/// Why a navigation left the virtual routing domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    /// The login page is always a full document load.
    Login,
    /// Unregistered path shaped like a page file.
    LegacyDestination,
    /// Guarded route visited without authentication.
    AuthRequired,
}

/// Terminal result of one pass through the navigation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationOutcome {
    /// A route (or the home view) is mounted and recorded as current.
    Settled { path: String },
    /// A full, non-virtual redirect was issued.
    Redirected { href: String, reason: RedirectReason },
    /// A before-hook cancelled the navigation; nothing changed.
    Vetoed { path: String },
    /// Loading or initializing the module failed; an error view is shown.
    Failed { path: String, error: NavError },
    /// A newer navigation started while this one was suspended.
    Superseded { path: String },
}

impl NavigationOutcome {
    /// `true` only for a settled mount.
    pub fn is_settled(&self) -> bool {
        matches!(self, NavigationOutcome::Settled { .. })
    }

    pub fn path(&self) -> &str {
        match self {
            NavigationOutcome::Settled { path }
            | NavigationOutcome::Vetoed { path }
            | NavigationOutcome::Failed { path, .. }
            | NavigationOutcome::Superseded { path } => path,
            NavigationOutcome::Redirected { href, .. } => href,
        }
    }
}

/// Route transition handed to before-navigation hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteChange {
    pub from: String,
    pub to: String,
}

// ============= Error Types =============

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavError {
    #[error("Failed to load module file '{module_file}': {reason}")]
    ModuleLoad { module_file: String, reason: String },

    #[error("Module '{module_name}' was not registered by '{module_file}'")]
    ModuleNotRegistered {
        module_name: String,
        module_file: String,
    },

    #[error("Module '{module_name}' failed to initialize: {reason}")]
    ModuleInit { module_name: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

pub type Result<T> = std::result::Result<T, NavError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_builder() {
        let descriptor = RouteDescriptor::new("/chat.html", "chat", "/js/pages/chat.js")
            .with_title("Chat")
            .with_css("/css/chat.css")
            .requiring_auth();

        assert_eq!(descriptor.title, "Chat");
        assert_eq!(descriptor.css_files, vec!["/css/chat.css".to_string()]);
        assert!(descriptor.require_auth);
    }

    #[test]
    fn test_active_route_path() {
        let home = ActiveRoute::Home {
            path: "/".to_string(),
        };
        assert_eq!(home.path(), "/");
        assert!(home.is_home());
        assert!(home.descriptor().is_none());

        let page = ActiveRoute::Page(RouteDescriptor::new("/a.html", "a", "/mod-a.js"));
        assert_eq!(page.path(), "/a.html");
        assert!(!page.is_home());
    }

    #[test]
    fn test_outcome_success_flag() {
        assert!(NavigationOutcome::Settled {
            path: "/".to_string()
        }
        .is_settled());
        assert!(!NavigationOutcome::Vetoed {
            path: "/a.html".to_string()
        }
        .is_settled());
        assert!(!NavigationOutcome::Redirected {
            href: "/login.html".to_string(),
            reason: RedirectReason::AuthRequired,
        }
        .is_settled());
    }

    #[test]
    fn test_error_display() {
        let err = NavError::ModuleNotRegistered {
            module_name: "chat".to_string(),
            module_file: "/js/pages/chat.js".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Module 'chat' was not registered by '/js/pages/chat.js'"
        );
    }
}
