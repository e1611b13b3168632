//! UI runtime boundary
//!
//! The engine never touches a concrete document or history implementation.
//! Everything it needs from the host runtime is expressed by the traits in
//! this module:
//!
//! - [`History`] - native back/forward stack and its change notifications
//! - [`Document`] - mount regions, title, scroll, tagged stylesheets, redirects, link events
//! - [`AuthProvider`] - synchronous authentication check for the guard
//! - [`RedirectStore`] - durable single slot for the redirect-after-login path
//!
//! [`memory`] provides a complete in-process runtime used by the CLI and tests;
//! [`store`] provides a file-backed redirect store.

pub mod memory;
pub mod store;

use crate::types::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============= Events =============

/// State object attached to every history entry the engine writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub path: String,
}

impl HistoryEntry {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Delivered when the runtime moves the history pointer (back/forward).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopStateEvent {
    /// State of the entry that became current, if the engine wrote one.
    pub state: Option<HistoryEntry>,
    /// Live location after the move.
    pub location: String,
}

/// Keyboard modifiers held during a link activation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub meta: bool,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.meta || self.ctrl || self.shift || self.alt
    }
}

/// A link activation observed at the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkEvent {
    /// The anchor's `href` attribute as written.
    pub href: String,
    /// Mouse button; `0` is the primary button.
    pub button: i16,
    pub modifiers: Modifiers,
    /// Browsing-context target (`_blank`, `_self`, a named frame).
    pub target: Option<String>,
    /// The link explicitly opted out of interception.
    pub opt_out: bool,
    /// The link carries a `download` attribute.
    pub download: bool,
    /// The link asks for a history replace instead of a push.
    pub replace: bool,
    /// Another handler already prevented the default action.
    pub default_prevented: bool,
}

impl LinkEvent {
    /// A plain primary-button click on `href`.
    pub fn click(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            ..Default::default()
        }
    }
}

/// What a link listener did with an activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDisposition {
    /// Default prevented; the engine navigates virtually.
    Intercepted,
    /// The runtime should perform its default action.
    PassThrough,
}

/// Handle returned when attaching a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

pub type PopStateListener = Arc<dyn Fn(PopStateEvent) + Send + Sync>;
pub type LinkListener = Arc<dyn Fn(&LinkEvent) -> LinkDisposition + Send + Sync>;

/// The two mutually exclusive regions the engine toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Home,
    Page,
}

// ============= Collaborator Traits =============

/// The runtime's native navigation history.
pub trait History: Send + Sync {
    fn push_state(&self, entry: HistoryEntry, url: &str);
    fn replace_state(&self, entry: HistoryEntry, url: &str);
    /// Move the pointer by `delta`; the runtime reports the move to pop listeners.
    fn go(&self, delta: isize);
    /// Current location path.
    fn location(&self) -> String;
    fn len(&self) -> usize;
    fn add_pop_listener(&self, listener: PopStateListener) -> ListenerId;
    fn remove_pop_listener(&self, id: ListenerId);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The document the engine renders into.
#[async_trait]
pub trait Document: Send + Sync {
    fn show_view(&self, view: View);
    /// Replace the inner markup of the page-content region.
    fn set_page_content(&self, html: &str);
    fn set_title(&self, title: &str);
    fn scroll_to_top(&self);
    /// Update "active route" affordances such as the highlighted nav entry.
    fn mark_active_links(&self, path: &str);

    fn has_stylesheet(&self, module_name: &str, href: &str) -> bool;
    /// Insert a stylesheet tagged with `module_name`; resolves when it has loaded.
    async fn add_stylesheet(&self, module_name: &str, href: &str) -> anyhow::Result<()>;
    /// Remove all stylesheets tagged with `module_name`, returning how many were removed.
    fn remove_stylesheets(&self, module_name: &str) -> usize;

    /// Leave virtual routing: full document load of `href`.
    fn redirect(&self, href: &str);

    fn add_link_listener(&self, listener: LinkListener) -> ListenerId;
    fn remove_link_listener(&self, id: ListenerId);
}

pub trait AuthProvider: Send + Sync {
    fn is_authenticated(&self) -> bool;
}

/// Durable single-slot store for the path to resume after login.
pub trait RedirectStore: Send + Sync {
    fn save(&self, path: &str) -> Result<()>;
    fn peek(&self) -> Option<String>;
    /// Read and clear the slot.
    fn take(&self) -> Option<String>;
}
