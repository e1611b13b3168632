//! In-memory UI runtime
//!
//! A headless implementation of every collaborator trait. The CLI's
//! `simulate` command drives the engine on top of it, and the test suites use
//! it to observe exactly what the engine did to the document and history.

use super::{
    AuthProvider, Document, History, HistoryEntry, LinkDisposition, LinkEvent, LinkListener,
    ListenerId, PopStateEvent, PopStateListener, RedirectStore, View,
};
use crate::modules::{ModuleRegistry, ModuleSource, PageModule};
use crate::types::{Result, RouteDescriptor};
use crate::utils::escape_html;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

fn next_listener_id(counter: &AtomicU64) -> ListenerId {
    ListenerId(counter.fetch_add(1, Ordering::SeqCst))
}

// ============= History =============

#[derive(Debug, Clone)]
struct Slot {
    state: Option<HistoryEntry>,
    url: String,
}

#[derive(Debug)]
struct HistoryStack {
    slots: Vec<Slot>,
    index: usize,
}

/// Entry stack with a pointer, like a browser tab's session history.
pub struct MemoryHistory {
    stack: Mutex<HistoryStack>,
    listeners: RwLock<Vec<(ListenerId, PopStateListener)>>,
    next_id: AtomicU64,
}

impl MemoryHistory {
    /// A history with a single entry at `location` that carries no engine state.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            stack: Mutex::new(HistoryStack {
                slots: vec![Slot {
                    state: None,
                    url: location.into(),
                }],
                index: 0,
            }),
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn index(&self) -> usize {
        self.stack.lock().index
    }

    /// URLs of every entry, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.stack
            .lock()
            .slots
            .iter()
            .map(|slot| slot.url.clone())
            .collect()
    }

    pub fn current_state(&self) -> Option<HistoryEntry> {
        let stack = self.stack.lock();
        stack.slots[stack.index].state.clone()
    }

    pub fn pop_listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new("/")
    }
}

impl History for MemoryHistory {
    fn push_state(&self, entry: HistoryEntry, url: &str) {
        let mut stack = self.stack.lock();
        let keep = stack.index + 1;
        stack.slots.truncate(keep);
        stack.slots.push(Slot {
            state: Some(entry),
            url: url.to_string(),
        });
        stack.index = stack.slots.len() - 1;
    }

    fn replace_state(&self, entry: HistoryEntry, url: &str) {
        let mut stack = self.stack.lock();
        let index = stack.index;
        stack.slots[index] = Slot {
            state: Some(entry),
            url: url.to_string(),
        };
    }

    fn go(&self, delta: isize) {
        let event = {
            let mut stack = self.stack.lock();
            let target = stack.index as isize + delta;
            if delta == 0 || target < 0 || target >= stack.slots.len() as isize {
                debug!(delta, "History move out of range, ignoring");
                return;
            }
            stack.index = target as usize;
            let slot = &stack.slots[stack.index];
            PopStateEvent {
                state: slot.state.clone(),
                location: slot.url.clone(),
            }
        };

        let listeners: Vec<PopStateListener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(event.clone());
        }
    }

    fn location(&self) -> String {
        let stack = self.stack.lock();
        stack.slots[stack.index].url.clone()
    }

    fn len(&self) -> usize {
        self.stack.lock().slots.len()
    }

    fn add_pop_listener(&self, listener: PopStateListener) -> ListenerId {
        let id = next_listener_id(&self.next_id);
        self.listeners.write().push((id, listener));
        id
    }

    fn remove_pop_listener(&self, id: ListenerId) {
        self.listeners.write().retain(|(existing, _)| *existing != id);
    }
}

// ============= Document =============

/// One observable mutation of a [`MemoryDocument`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOp {
    ShowView(View),
    SetContent(String),
    SetTitle(String),
    ScrollToTop,
    MarkActive(String),
    AddStylesheet { module: String, href: String },
    RemoveStylesheets { module: String, removed: usize },
    Redirect(String),
    DefaultAction(String),
}

#[derive(Debug)]
struct DocumentState {
    view: View,
    content: String,
    title: String,
    scrolls: usize,
    active_link: Option<String>,
    stylesheets: Vec<(String, String)>,
    failing: HashSet<String>,
    redirects: Vec<String>,
    journal: Vec<DocumentOp>,
}

pub struct MemoryDocument {
    state: Mutex<DocumentState>,
    link_listeners: RwLock<Vec<(ListenerId, LinkListener)>>,
    next_id: AtomicU64,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DocumentState {
                view: View::Home,
                content: String::new(),
                title: String::new(),
                scrolls: 0,
                active_link: None,
                stylesheets: Vec::new(),
                failing: HashSet::new(),
                redirects: Vec::new(),
                journal: Vec::new(),
            }),
            link_listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Make every future load of `href` fail.
    pub fn fail_stylesheet(&self, href: &str) {
        self.state.lock().failing.insert(href.to_string());
    }

    /// Dispatch a link activation to the root listeners.
    ///
    /// When no listener intercepts it, the activation's default action is
    /// recorded in the journal.
    pub fn activate_link(&self, event: &LinkEvent) -> LinkDisposition {
        let listeners: Vec<LinkListener> = self
            .link_listeners
            .read()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            if listener(event) == LinkDisposition::Intercepted {
                return LinkDisposition::Intercepted;
            }
        }

        self.record(DocumentOp::DefaultAction(event.href.clone()));
        LinkDisposition::PassThrough
    }

    pub fn view(&self) -> View {
        self.state.lock().view
    }

    pub fn is_visible(&self, view: View) -> bool {
        self.view() == view
    }

    pub fn content(&self) -> String {
        self.state.lock().content.clone()
    }

    pub fn title(&self) -> String {
        self.state.lock().title.clone()
    }

    pub fn scroll_count(&self) -> usize {
        self.state.lock().scrolls
    }

    pub fn active_link(&self) -> Option<String> {
        self.state.lock().active_link.clone()
    }

    /// Stylesheet hrefs tagged with `module_name`, in insertion order.
    pub fn stylesheets(&self, module_name: &str) -> Vec<String> {
        self.state
            .lock()
            .stylesheets
            .iter()
            .filter(|(module, _)| module == module_name)
            .map(|(_, href)| href.clone())
            .collect()
    }

    pub fn stylesheet_count(&self) -> usize {
        self.state.lock().stylesheets.len()
    }

    pub fn redirects(&self) -> Vec<String> {
        self.state.lock().redirects.clone()
    }

    pub fn last_redirect(&self) -> Option<String> {
        self.state.lock().redirects.last().cloned()
    }

    pub fn journal(&self) -> Vec<DocumentOp> {
        self.state.lock().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.state.lock().journal.clear();
    }

    pub fn link_listener_count(&self) -> usize {
        self.link_listeners.read().len()
    }

    fn record(&self, op: DocumentOp) {
        self.state.lock().journal.push(op);
    }
}

#[async_trait]
impl Document for MemoryDocument {
    fn show_view(&self, view: View) {
        let mut state = self.state.lock();
        state.view = view;
        state.journal.push(DocumentOp::ShowView(view));
    }

    fn set_page_content(&self, html: &str) {
        let mut state = self.state.lock();
        state.content = html.to_string();
        state.journal.push(DocumentOp::SetContent(html.to_string()));
    }

    fn set_title(&self, title: &str) {
        let mut state = self.state.lock();
        state.title = title.to_string();
        state.journal.push(DocumentOp::SetTitle(title.to_string()));
    }

    fn scroll_to_top(&self) {
        let mut state = self.state.lock();
        state.scrolls += 1;
        state.journal.push(DocumentOp::ScrollToTop);
    }

    fn mark_active_links(&self, path: &str) {
        let mut state = self.state.lock();
        state.active_link = Some(path.to_string());
        state.journal.push(DocumentOp::MarkActive(path.to_string()));
    }

    fn has_stylesheet(&self, module_name: &str, href: &str) -> bool {
        self.state
            .lock()
            .stylesheets
            .iter()
            .any(|(module, existing)| module == module_name && existing == href)
    }

    async fn add_stylesheet(&self, module_name: &str, href: &str) -> anyhow::Result<()> {
        let failing = {
            let mut state = self.state.lock();
            state
                .stylesheets
                .push((module_name.to_string(), href.to_string()));
            state.journal.push(DocumentOp::AddStylesheet {
                module: module_name.to_string(),
                href: href.to_string(),
            });
            state.failing.contains(href)
        };
        tokio::task::yield_now().await;

        if failing {
            anyhow::bail!("stylesheet '{}' could not be fetched", href);
        }
        Ok(())
    }

    fn remove_stylesheets(&self, module_name: &str) -> usize {
        let mut state = self.state.lock();
        let before = state.stylesheets.len();
        state.stylesheets.retain(|(module, _)| module != module_name);
        let removed = before - state.stylesheets.len();
        state.journal.push(DocumentOp::RemoveStylesheets {
            module: module_name.to_string(),
            removed,
        });
        removed
    }

    fn redirect(&self, href: &str) {
        let mut state = self.state.lock();
        state.redirects.push(href.to_string());
        state.journal.push(DocumentOp::Redirect(href.to_string()));
    }

    fn add_link_listener(&self, listener: LinkListener) -> ListenerId {
        let id = next_listener_id(&self.next_id);
        self.link_listeners.write().push((id, listener));
        id
    }

    fn remove_link_listener(&self, id: ListenerId) {
        self.link_listeners
            .write()
            .retain(|(existing, _)| *existing != id);
    }
}

// ============= Module Source =============

#[derive(Default)]
struct SourceState {
    units: HashMap<String, Vec<(String, Arc<dyn PageModule>)>>,
    loads: HashMap<String, usize>,
    /// Remaining forced failures per file; `usize::MAX` fails forever.
    failures: HashMap<String, usize>,
    latency: HashMap<String, Duration>,
}

/// Module source backed by a fixed table of module files.
#[derive(Default)]
pub struct StaticModuleSource {
    state: Mutex<SourceState>,
}

impl StaticModuleSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source whose units each define a [`PlaceholderModule`] for one route.
    pub fn placeholders(routes: &[RouteDescriptor], app_title: &str) -> Self {
        let source = Self::new();
        for route in routes {
            let title = if route.title.is_empty() {
                app_title.to_string()
            } else {
                route.title.clone()
            };
            source.add_module(
                &route.module_file,
                &route.module_name,
                Arc::new(PlaceholderModule::new(title)),
            );
        }
        source
    }

    pub fn with_module(
        self,
        module_file: &str,
        module_name: &str,
        module: Arc<dyn PageModule>,
    ) -> Self {
        self.add_module(module_file, module_name, module);
        self
    }

    pub fn add_module(&self, module_file: &str, module_name: &str, module: Arc<dyn PageModule>) {
        self.state
            .lock()
            .units
            .entry(module_file.to_string())
            .or_default()
            .push((module_name.to_string(), module));
    }

    /// A unit that loads successfully but defines no modules.
    pub fn with_empty_unit(self, module_file: &str) -> Self {
        self.state
            .lock()
            .units
            .entry(module_file.to_string())
            .or_default();
        self
    }

    pub fn with_latency(self, module_file: &str, latency: Duration) -> Self {
        self.state
            .lock()
            .latency
            .insert(module_file.to_string(), latency);
        self
    }

    /// Fail every load of `module_file`.
    pub fn fail(&self, module_file: &str) {
        self.fail_times(module_file, usize::MAX);
    }

    /// Fail the next `times` loads of `module_file`.
    pub fn fail_times(&self, module_file: &str, times: usize) {
        self.state
            .lock()
            .failures
            .insert(module_file.to_string(), times);
    }

    /// How many times `module_file` was fetched.
    pub fn load_count(&self, module_file: &str) -> usize {
        self.state
            .lock()
            .loads
            .get(module_file)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ModuleSource for StaticModuleSource {
    async fn load(&self, module_file: &str, registry: &ModuleRegistry) -> anyhow::Result<()> {
        let latency = {
            let mut state = self.state.lock();
            *state.loads.entry(module_file.to_string()).or_insert(0) += 1;
            state.latency.get(module_file).copied()
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let modules = {
            let mut state = self.state.lock();
            if let Some(remaining) = state.failures.get_mut(module_file) {
                if *remaining > 0 {
                    if *remaining != usize::MAX {
                        *remaining -= 1;
                    }
                    anyhow::bail!("network error while fetching '{}'", module_file);
                }
            }
            match state.units.get(module_file) {
                Some(modules) => modules.clone(),
                None => anyhow::bail!("'{}' not found", module_file),
            }
        };

        for (name, module) in modules {
            registry.register(&name, module);
        }
        Ok(())
    }
}

// ============= Auth and Storage =============

/// Authentication flag that can be flipped at runtime.
#[derive(Debug, Default)]
pub struct StaticAuth {
    authenticated: AtomicBool,
}

impl StaticAuth {
    pub fn new(authenticated: bool) -> Self {
        Self {
            authenticated: AtomicBool::new(authenticated),
        }
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        self.authenticated.store(authenticated, Ordering::SeqCst);
    }
}

impl AuthProvider for StaticAuth {
    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct MemoryRedirectStore {
    slot: Mutex<Option<String>>,
}

impl MemoryRedirectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_saved(path: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(path.into())),
        }
    }
}

impl RedirectStore for MemoryRedirectStore {
    fn save(&self, path: &str) -> Result<()> {
        *self.slot.lock() = Some(path.to_string());
        Ok(())
    }

    fn peek(&self) -> Option<String> {
        self.slot.lock().clone()
    }

    fn take(&self) -> Option<String> {
        self.slot.lock().take()
    }
}

// ============= Placeholder Module =============

/// Page module that renders a heading and does nothing else.
#[derive(Debug, Clone)]
pub struct PlaceholderModule {
    title: String,
}

impl PlaceholderModule {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

#[async_trait]
impl PageModule for PlaceholderModule {
    fn html(&self) -> String {
        format!("<section><h1>{}</h1></section>", escape_html(&self.title))
    }

    async fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn cleanup(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
