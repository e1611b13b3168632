//! Mock page modules and a router harness for testing.
//!
//! [`RecordingModule`] writes every `init`/`cleanup` into a shared journal so
//! tests can assert ordering across modules. [`Harness`] wires a router to the
//! in-memory runtime with a fixed route table.
#![allow(dead_code)]

use async_trait::async_trait;
use pageflow::runtime::memory::{
    MemoryDocument, MemoryHistory, MemoryRedirectStore, StaticAuth, StaticModuleSource,
};
use pageflow::{AppConfig, NavigationOutcome, PageModule, RouteDescriptor, Router};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

pub const APP_TITLE: &str = "Workbench";

/// Shared, ordered record of lifecycle calls (`init:a`, `cleanup:a`, ...).
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

/// Page module that records its lifecycle and can be told to misbehave.
pub struct RecordingModule {
    name: String,
    journal: Journal,
    init_error: Option<String>,
    panic_in_init: bool,
    cleanup_error: bool,
    panic_in_cleanup: bool,
    init_delay: Option<Duration>,
    inits: AtomicUsize,
    cleanups: AtomicUsize,
}

impl RecordingModule {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            journal: journal.clone(),
            init_error: None,
            panic_in_init: false,
            cleanup_error: false,
            panic_in_cleanup: false,
            init_delay: None,
            inits: AtomicUsize::new(0),
            cleanups: AtomicUsize::new(0),
        }
    }

    pub fn failing_init(mut self, reason: &str) -> Self {
        self.init_error = Some(reason.to_string());
        self
    }

    pub fn panicking_init(mut self) -> Self {
        self.panic_in_init = true;
        self
    }

    pub fn erroring_cleanup(mut self) -> Self {
        self.cleanup_error = true;
        self
    }

    pub fn panicking_cleanup(mut self) -> Self {
        self.panic_in_cleanup = true;
        self
    }

    pub fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = Some(delay);
        self
    }

    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn cleanups(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageModule for RecordingModule {
    fn html(&self) -> String {
        format!("<p>{}</p>", self.name)
    }

    async fn init(&self) -> anyhow::Result<()> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        self.journal.lock().push(format!("init:{}", self.name));

        if let Some(delay) = self.init_delay {
            tokio::time::sleep(delay).await;
        }
        if self.panic_in_init {
            panic!("{} init exploded", self.name);
        }
        if let Some(reason) = &self.init_error {
            anyhow::bail!("{}", reason);
        }
        Ok(())
    }

    fn cleanup(&self) -> anyhow::Result<()> {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        self.journal.lock().push(format!("cleanup:{}", self.name));

        if self.panic_in_cleanup {
            panic!("{} cleanup exploded", self.name);
        }
        if self.cleanup_error {
            anyhow::bail!("{} cleanup failed", self.name);
        }
        Ok(())
    }
}

/// Knobs for [`Harness::with_options`].
#[derive(Debug, Clone)]
pub struct HarnessOptions {
    pub location: String,
    pub authenticated: bool,
    pub saved_redirect: Option<String>,
    /// Delay before each `init` of module `a`.
    pub a_init_delay: Option<Duration>,
    /// Latency of loading `/mod-slow.js`.
    pub slow_latency: Duration,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            location: "/".to_string(),
            authenticated: false,
            saved_redirect: None,
            a_init_delay: None,
            slow_latency: Duration::from_millis(50),
        }
    }
}

/// A router on the in-memory runtime with this route table:
///
/// | path | module | file | notes |
/// |------|--------|------|-------|
/// | `/a.html` | `a` | `/mod-a.js` | css `/css/a.css` |
/// | `/b.html` | `b` | `/mod-b.js` | css `/css/b.css` |
/// | `/shared-one.html`, `/shared-two.html` | `shared-one`, `shared-two` | `/mod-shared.js` | one file, two modules |
/// | `/secret.html` | `secret` | `/mod-secret.js` | requires auth |
/// | `/broken.html` | `broken` | `/mod-broken.js` | `init` fails |
/// | `/missing.html` | `missing` | `/mod-missing.js` | file fails to load |
/// | `/ghost.html` | `ghost` | `/mod-ghost.js` | file registers nothing |
/// | `/slow.html` | `slow` | `/mod-slow.js` | load latency |
pub struct Harness {
    pub router: Router,
    pub history: Arc<MemoryHistory>,
    pub document: Arc<MemoryDocument>,
    pub auth: Arc<StaticAuth>,
    pub redirects: Arc<MemoryRedirectStore>,
    pub source: Arc<StaticModuleSource>,
    pub journal: Journal,
    pub modules: HashMap<String, Arc<RecordingModule>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_options(HarnessOptions::default())
    }

    pub fn with_options(options: HarnessOptions) -> Self {
        let journal = journal();
        let mut modules: HashMap<String, Arc<RecordingModule>> = HashMap::new();

        let mut a = RecordingModule::new("a", &journal);
        if let Some(delay) = options.a_init_delay {
            a = a.with_init_delay(delay);
        }
        modules.insert("a".into(), Arc::new(a));
        for name in ["b", "shared-one", "shared-two", "secret", "slow"] {
            modules.insert(name.into(), Arc::new(RecordingModule::new(name, &journal)));
        }
        modules.insert(
            "broken".into(),
            Arc::new(RecordingModule::new("broken", &journal).failing_init("socket refused")),
        );

        let source = StaticModuleSource::new()
            .with_module("/mod-a.js", "a", modules["a"].clone())
            .with_module("/mod-b.js", "b", modules["b"].clone())
            .with_module("/mod-shared.js", "shared-one", modules["shared-one"].clone())
            .with_module("/mod-shared.js", "shared-two", modules["shared-two"].clone())
            .with_module("/mod-secret.js", "secret", modules["secret"].clone())
            .with_module("/mod-broken.js", "broken", modules["broken"].clone())
            .with_module("/mod-slow.js", "slow", modules["slow"].clone())
            .with_latency("/mod-slow.js", options.slow_latency)
            .with_empty_unit("/mod-ghost.js")
            .with_empty_unit("/mod-missing.js");
        source.fail("/mod-missing.js");
        let source = Arc::new(source);

        let history = Arc::new(MemoryHistory::new(options.location.clone()));
        let document = Arc::new(MemoryDocument::new());
        let auth = Arc::new(StaticAuth::new(options.authenticated));
        let redirects = Arc::new(match &options.saved_redirect {
            Some(path) => MemoryRedirectStore::with_saved(path.clone()),
            None => MemoryRedirectStore::new(),
        });

        let config = AppConfig {
            title: APP_TITLE.to_string(),
            ..Default::default()
        };

        let router = Router::builder()
            .with_config(config)
            .with_module_source(source.clone())
            .with_history(history.clone())
            .with_document(document.clone())
            .with_auth(auth.clone())
            .with_redirect_store(redirects.clone())
            .build()
            .expect("router builds");

        for descriptor in route_table() {
            let path = descriptor.path.clone();
            router.register(&path, descriptor);
        }

        Self {
            router,
            history,
            document,
            auth,
            redirects,
            source,
            journal,
            modules,
        }
    }

    pub fn module(&self, name: &str) -> Arc<RecordingModule> {
        self.modules[name].clone()
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().clone()
    }

    pub fn clear_journal(&self) {
        self.journal.lock().clear();
        self.document.clear_journal();
    }
}

fn route_table() -> Vec<RouteDescriptor> {
    vec![
        RouteDescriptor::new("/a.html", "a", "/mod-a.js")
            .with_title("Page A")
            .with_css("/css/a.css"),
        RouteDescriptor::new("/b.html", "b", "/mod-b.js")
            .with_title("Page B")
            .with_css("/css/b.css"),
        RouteDescriptor::new("/shared-one.html", "shared-one", "/mod-shared.js")
            .with_title("Shared One"),
        RouteDescriptor::new("/shared-two.html", "shared-two", "/mod-shared.js")
            .with_title("Shared Two"),
        RouteDescriptor::new("/secret.html", "secret", "/mod-secret.js")
            .with_title("Secret")
            .requiring_auth(),
        RouteDescriptor::new("/broken.html", "broken", "/mod-broken.js").with_title("Broken"),
        RouteDescriptor::new("/missing.html", "missing", "/mod-missing.js").with_title("Missing"),
        RouteDescriptor::new("/ghost.html", "ghost", "/mod-ghost.js").with_title("Ghost"),
        RouteDescriptor::new("/slow.html", "slow", "/mod-slow.js").with_title("Slow"),
    ]
}

/// Wait for the next navigation outcome published by the router.
pub async fn next_outcome(events: &mut broadcast::Receiver<NavigationOutcome>) -> NavigationOutcome {
    tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("navigation settled in time")
        .expect("event stream open")
}
