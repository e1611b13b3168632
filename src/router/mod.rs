//! Router
//!
//! [`Router`] is the public face of the navigation engine. It owns one
//! [`RouterState`], the route and module registries, and the collaborators
//! that connect it to a UI runtime. A router is cheap to clone; clones share
//! the same engine.
//!
//! # Example
//!
//! ```rust,ignore
//! let router = Router::builder()
//!     .with_config(config.app.clone())
//!     .with_route_source(Arc::new(config.clone()))
//!     .with_module_source(source)
//!     .build()?;
//!
//! router.start().await;
//! router.navigate("/chat.html", NavigateOptions::default()).await;
//! ```

pub mod executor;
pub mod hooks;
pub mod links;
pub mod state;

pub use executor::{NavigationRequest, DEFAULT_LOADING_HTML};
pub use hooks::{HookRegistration, HookRegistry, Navigated, NavigationDecision};
pub use links::LinkInterceptor;
pub use state::RouterState;

use crate::modules::{LifecycleManager, ModuleLoader, ModuleRegistry, ModuleSource, StyleManager};
use crate::routes::{derive_routes, RouteRegistry, RouteSource};
use crate::runtime::memory::{MemoryDocument, MemoryHistory, MemoryRedirectStore, StaticAuth};
use crate::runtime::{
    AuthProvider, Document, History, HistoryEntry, LinkDisposition, LinkEvent, ListenerId,
    PopStateEvent, RedirectStore,
};
use crate::types::{
    ActiveRoute, NavError, NavigateOptions, NavigationOutcome, NavigationPhase, Result,
    RouteChange, RouteDescriptor,
};
use crate::utils::toml_config::AppConfig;
use parking_lot::{Mutex, RwLock};
use executor::navigation_span;
use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, Instrument};

const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Work delivered from runtime listeners to the event pump.
#[derive(Debug)]
enum RouterCommand {
    PopState(PopStateEvent),
    Navigate { path: String, replace: bool },
}

/// Listeners and pump task installed by `start()`.
struct Attachment {
    pop_listener: ListenerId,
    link_listener: ListenerId,
    pump: JoinHandle<()>,
}

pub(crate) struct RouterInner {
    config: AppConfig,
    routes: RouteRegistry,
    loader: ModuleLoader,
    styles: StyleManager,
    lifecycle: LifecycleManager,
    hooks: Arc<HookRegistry>,
    links: LinkInterceptor,
    history: Arc<dyn History>,
    document: Arc<dyn Document>,
    auth: Arc<dyn AuthProvider>,
    redirects: Arc<dyn RedirectStore>,
    route_source: Option<Arc<dyn RouteSource>>,
    state: RwLock<RouterState>,
    /// Serializes document writes between suspension points. Taken before `state`.
    render: Mutex<()>,
    events: broadcast::Sender<NavigationOutcome>,
    attachment: Mutex<Option<Attachment>>,
}

impl RouterCommand {
    fn into_request(self) -> (String, NavigationRequest) {
        match self {
            RouterCommand::PopState(event) => {
                let path = event
                    .state
                    .map(|entry| entry.path)
                    .unwrap_or(event.location);
                debug!(path = %path, "History moved");
                (
                    path,
                    NavigationRequest {
                        replace: false,
                        from_pop_state: true,
                    },
                )
            }
            RouterCommand::Navigate { path, replace } => (
                path,
                NavigationRequest {
                    replace,
                    from_pop_state: false,
                },
            ),
        }
    }
}

impl RouterInner {
    fn detach(&self) -> bool {
        let Some(attachment) = self.attachment.lock().take() else {
            return false;
        };
        self.history.remove_pop_listener(attachment.pop_listener);
        self.document.remove_link_listener(attachment.link_listener);
        attachment.pump.abort();
        true
    }
}

impl Drop for RouterInner {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Client-side navigation engine.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    // ============= Route Table =============

    /// Register `descriptor` under the normalized form of `path`, returning the key.
    pub fn register(&self, path: &str, descriptor: RouteDescriptor) -> String {
        self.inner.routes.register(path, descriptor)
    }

    pub fn resolve(&self, path: &str) -> Option<RouteDescriptor> {
        self.inner.routes.resolve(path)
    }

    /// Ordered copy of the route table.
    pub fn routes(&self) -> BTreeMap<String, RouteDescriptor> {
        self.inner.routes.snapshot()
    }

    // ============= Navigation =============

    /// Navigate to `path`. Returns `true` only when the target settled.
    pub async fn navigate(&self, path: &str, options: NavigateOptions) -> bool {
        self.navigate_with_outcome(path, options)
            .await
            .is_settled()
    }

    pub async fn navigate_with_outcome(
        &self,
        path: &str,
        options: NavigateOptions,
    ) -> NavigationOutcome {
        self.inner
            .execute(
                path,
                NavigationRequest {
                    replace: options.replace,
                    from_pop_state: false,
                },
            )
            .await
    }

    /// Step back in the native history; the router follows once the runtime reports the move.
    pub fn back(&self) {
        self.inner.history.go(-1);
    }

    pub fn forward(&self) {
        self.inner.history.go(1);
    }

    pub async fn show_home(&self) -> bool {
        let home = self.inner.config.home_path.clone();
        self.navigate(&home, NavigateOptions::default()).await
    }

    // ============= Hooks =============

    /// Run `hook` before every navigation; returning `Cancel` vetoes it.
    pub fn on_before_navigate<F>(&self, hook: F) -> HookRegistration
    where
        F: Fn(&RouteChange) -> anyhow::Result<NavigationDecision> + Send + Sync + 'static,
    {
        self.inner.hooks.add_before(hook)
    }

    /// Run `hook` after every settled navigation.
    pub fn on_after_navigate<F>(&self, hook: F) -> HookRegistration
    where
        F: Fn(&Navigated) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.inner.hooks.add_after(hook)
    }

    /// Stream of every completed navigation's outcome.
    pub fn subscribe(&self) -> broadcast::Receiver<NavigationOutcome> {
        self.inner.events.subscribe()
    }

    // ============= Introspection =============

    pub fn current_route(&self) -> ActiveRoute {
        self.inner.state.read().current.clone()
    }

    pub fn current_path(&self) -> String {
        self.inner.state.read().current_path().to_string()
    }

    /// True iff `path` normalizes to the current route's path.
    pub fn is_active(&self, path: &str) -> bool {
        let current = self.current_path();
        self.inner.routes.is_active(path, &current)
    }

    pub fn phase(&self) -> NavigationPhase {
        self.inner.state.read().phase
    }

    pub fn state(&self) -> RouterState {
        self.inner.state.read().clone()
    }

    pub fn is_started(&self) -> bool {
        self.inner.state.read().started
    }

    pub fn loaded_module_files(&self) -> Vec<String> {
        self.inner.loader.loaded_files()
    }

    pub fn module_registry(&self) -> Arc<ModuleRegistry> {
        self.inner.loader.registry().clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    // ============= Start / Stop =============

    /// Attach runtime listeners, seed the route table and run the first navigation.
    ///
    /// Calling `start()` again detaches and re-attaches.
    pub async fn start(&self) -> NavigationOutcome {
        self.stop();
        let inner = &self.inner;

        if let Some(source) = &inner.route_source {
            let routes = derive_routes(
                &source.entries(),
                &inner.config.convention(),
                inner.routes.normalizer(),
                &inner.config.home_path,
                &inner.config.login_path,
            );
            let count = routes.len();
            for route in routes {
                let path = route.path.clone();
                inner.routes.register(&path, route);
            }
            info!(count, "Registered routes from route source");
        }

        self.attach();

        let location = inner.history.location();
        let path = inner.routes.normalizer().normalize(&location);
        inner
            .history
            .replace_state(HistoryEntry::new(path.clone()), &location);

        let target = if inner.auth.is_authenticated() {
            match inner.redirects.take() {
                Some(saved) => {
                    info!(path = %saved, "Resuming navigation saved before login");
                    saved
                }
                None => path,
            }
        } else {
            path
        };

        inner.state.write().started = true;
        info!(path = %target, "Router started");

        inner
            .execute(
                &target,
                NavigationRequest {
                    replace: true,
                    from_pop_state: false,
                },
            )
            .await
    }

    /// Detach runtime listeners and stop the event pump.
    pub fn stop(&self) {
        if self.inner.detach() {
            debug!("Router listeners detached");
        }
        self.inner.state.write().started = false;
    }

    fn attach(&self) {
        let (tx, mut rx) = mpsc::unbounded_channel::<RouterCommand>();

        let pop_tx = tx.clone();
        let pop_listener = self
            .inner
            .history
            .add_pop_listener(Arc::new(move |event: PopStateEvent| {
                let _ = pop_tx.send(RouterCommand::PopState(event));
            }));

        let weak = Arc::downgrade(&self.inner);
        let link_weak = weak.clone();
        let link_listener = self
            .inner
            .document
            .add_link_listener(Arc::new(move |event: &LinkEvent| {
                let Some(inner) = link_weak.upgrade() else {
                    return LinkDisposition::PassThrough;
                };
                let current = inner.state.read().current_path().to_string();
                match inner.links.intercept(event, &current) {
                    Some(path) => {
                        debug!(href = %event.href, path = %path, "Intercepted link activation");
                        let _ = tx.send(RouterCommand::Navigate {
                            path,
                            replace: event.replace,
                        });
                        LinkDisposition::Intercepted
                    }
                    None => LinkDisposition::PassThrough,
                }
            }));

        // Commands begin in arrival order; only the rendering tail runs concurrently.
        let pump = tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let (path, request) = command.into_request();
                let span = navigation_span(&path);
                match span.in_scope(|| inner.begin(&path, request)) {
                    ControlFlow::Break(outcome) => {
                        inner.publish(outcome);
                    }
                    ControlFlow::Continue(pending) => {
                        tokio::spawn(async move {
                            let outcome = inner.finish(pending).instrument(span).await;
                            inner.publish(outcome);
                        });
                    }
                }
            }
        });

        *self.inner.attachment.lock() = Some(Attachment {
            pop_listener,
            link_listener,
            pump,
        });
    }
}

// ============= Builder =============

/// Builder for [`Router`]. Collaborators not supplied default to the in-memory runtime.
pub struct RouterBuilder {
    config: AppConfig,
    history: Option<Arc<dyn History>>,
    document: Option<Arc<dyn Document>>,
    auth: Option<Arc<dyn AuthProvider>>,
    redirects: Option<Arc<dyn RedirectStore>>,
    module_source: Option<Arc<dyn ModuleSource>>,
    module_registry: Option<Arc<ModuleRegistry>>,
    route_source: Option<Arc<dyn RouteSource>>,
    event_capacity: usize,
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            history: None,
            document: None,
            auth: None,
            redirects: None,
            module_source: None,
            module_registry: None,
            route_source: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_history(mut self, history: Arc<dyn History>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_document(mut self, document: Arc<dyn Document>) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_redirect_store(mut self, store: Arc<dyn RedirectStore>) -> Self {
        self.redirects = Some(store);
        self
    }

    pub fn with_module_source(mut self, source: Arc<dyn ModuleSource>) -> Self {
        self.module_source = Some(source);
        self
    }

    /// Share a module registry; a fresh one is created otherwise.
    pub fn with_module_registry(mut self, registry: Arc<ModuleRegistry>) -> Self {
        self.module_registry = Some(registry);
        self
    }

    /// Entries registered as routes on every `start()`.
    pub fn with_route_source(mut self, source: Arc<dyn RouteSource>) -> Self {
        self.route_source = Some(source);
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    pub fn build(self) -> Result<Router> {
        let module_source = self.module_source.ok_or_else(|| {
            NavError::Configuration("ModuleSource is required for Router".into())
        })?;

        let mut config = self.config;
        config
            .validate()
            .map_err(|e| NavError::Configuration(e.to_string()))?;

        let normalizer = config
            .normalizer()
            .map_err(|e| NavError::Configuration(e.to_string()))?;
        config.home_path = normalizer.normalize(&config.home_path);
        config.login_path = normalizer.normalize(&config.login_path);

        let history = self
            .history
            .unwrap_or_else(|| Arc::new(MemoryHistory::new(config.home_path.clone())));
        let document = self
            .document
            .unwrap_or_else(|| Arc::new(MemoryDocument::new()));
        let auth = self
            .auth
            .unwrap_or_else(|| Arc::new(StaticAuth::new(false)));
        let redirects = self
            .redirects
            .unwrap_or_else(|| Arc::new(MemoryRedirectStore::new()));
        let registry = self
            .module_registry
            .unwrap_or_else(|| Arc::new(ModuleRegistry::new()));

        let (events, _) = broadcast::channel(self.event_capacity);

        let inner = RouterInner {
            routes: RouteRegistry::new(normalizer.clone()),
            loader: ModuleLoader::new(module_source, registry),
            styles: StyleManager::new(document.clone()),
            lifecycle: LifecycleManager::new(),
            hooks: Arc::new(HookRegistry::new()),
            links: LinkInterceptor::new(normalizer, config.login_path.clone()),
            state: RwLock::new(RouterState::new(&config.home_path)),
            render: Mutex::new(()),
            history,
            document,
            auth,
            redirects,
            route_source: self.route_source,
            events,
            attachment: Mutex::new(None),
            config,
        };

        Ok(Router {
            inner: Arc::new(inner),
        })
    }
}
