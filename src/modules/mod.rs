//! Page modules
//!
//! A page module is the unit the engine mounts into the page-content region.
//! Modules are defined by code units (module files) that are loaded on demand
//! through a [`ModuleSource`]; loading a unit registers its modules into the
//! [`ModuleRegistry`] injected at construction time.

pub mod lifecycle;
pub mod loader;
pub mod styles;

pub use lifecycle::{LifecycleManager, MountedModule};
pub use loader::ModuleLoader;
pub use styles::StyleManager;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// The contract every page module implements.
#[async_trait]
pub trait PageModule: Send + Sync {
    /// Markup for the module. Must not depend on engine state.
    fn html(&self) -> String;

    /// Wire up the mounted markup: listeners, timers, subscriptions.
    async fn init(&self) -> anyhow::Result<()>;

    /// Release everything `init` created. Called on every navigation away.
    fn cleanup(&self) -> anyhow::Result<()>;
}

/// Loads a module file and registers the modules it defines.
#[async_trait]
pub trait ModuleSource: Send + Sync {
    async fn load(&self, module_file: &str, registry: &ModuleRegistry) -> anyhow::Result<()>;
}

/// Explicit registry of page modules keyed by logical name.
pub struct ModuleRegistry {
    modules: RwLock<HashMap<String, Arc<dyn PageModule>>>,
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            modules: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, name: &str, module: Arc<dyn PageModule>) {
        if self
            .modules
            .write()
            .insert(name.to_string(), module)
            .is_some()
        {
            debug!(module = %name, "Page module re-registered");
        }
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn PageModule>> {
        self.modules.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.read().contains_key(name)
    }

    /// Get a sorted list of all registered module names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Static(&'static str);

    #[async_trait]
    impl PageModule for Static {
        fn html(&self) -> String {
            self.0.to_string()
        }

        async fn init(&self) -> anyhow::Result<()> {
            Ok(())
        }

        fn cleanup(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_registry_creation() {
        let registry = ModuleRegistry::new();
        assert!(registry.names().is_empty());
        assert!(registry.resolve("chat").is_none());
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = ModuleRegistry::new();
        registry.register("chat", Arc::new(Static("<p>chat</p>")));
        registry.register("files", Arc::new(Static("<p>files</p>")));

        assert!(registry.contains("chat"));
        assert_eq!(registry.resolve("files").unwrap().html(), "<p>files</p>");
        assert_eq!(registry.names(), vec!["chat", "files"]);
    }

    #[test]
    fn test_last_registration_wins() {
        let registry = ModuleRegistry::new();
        registry.register("chat", Arc::new(Static("v1")));
        registry.register("chat", Arc::new(Static("v2")));

        assert_eq!(registry.resolve("chat").unwrap().html(), "v2");
    }
}
