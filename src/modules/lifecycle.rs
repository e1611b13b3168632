//! Lifecycle manager
//!
//! Owns the reference to the currently mounted page module and drives its
//! `init`/`cleanup` contract. Teardown never fails: a `cleanup` that errors or
//! panics is logged and the module is still considered unmounted.

use super::PageModule;
use crate::types::{NavError, Result};
use crate::utils::panic_message;
use futures::FutureExt;
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// A page module together with the name it was resolved under.
#[derive(Clone)]
pub struct MountedModule {
    pub name: String,
    pub module: Arc<dyn PageModule>,
}

impl MountedModule {
    pub fn new(name: impl Into<String>, module: Arc<dyn PageModule>) -> Self {
        Self {
            name: name.into(),
            module,
        }
    }

    fn same_instance(&self, other: &MountedModule) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.module, &other.module)
    }
}

impl std::fmt::Debug for MountedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountedModule")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct LifecycleManager {
    active: Mutex<Option<MountedModule>>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<MountedModule> {
        self.active.lock().clone()
    }

    pub fn is_active(&self, mounted: &MountedModule) -> bool {
        self.active
            .lock()
            .as_ref()
            .is_some_and(|active| active.same_instance(mounted))
    }

    /// Clean up and release the active module, if any.
    pub fn teardown(&self) -> Option<MountedModule> {
        let previous = self.active.lock().take()?;
        run_cleanup(&previous);
        Some(previous)
    }

    /// Make `mounted` the active module and run its `init`.
    pub async fn activate(&self, mounted: MountedModule) -> Result<()> {
        self.mount(mounted.clone());
        self.initialize(&mounted).await
    }

    /// Record `mounted` as the active module without initializing it.
    ///
    /// The module is active before `init` starts so that a partially
    /// initialized module is still cleaned up on the next teardown.
    pub fn mount(&self, mounted: MountedModule) {
        *self.active.lock() = Some(mounted);
    }

    /// Run `init` on a mounted module, turning errors and panics into [`NavError::ModuleInit`].
    pub async fn initialize(&self, mounted: &MountedModule) -> Result<()> {
        debug!(module = %mounted.name, "Initializing page module");

        match AssertUnwindSafe(mounted.module.init()).catch_unwind().await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!(module = %mounted.name, error = %e, "Page module init failed");
                Err(NavError::ModuleInit {
                    module_name: mounted.name.clone(),
                    reason: e.to_string(),
                })
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!(module = %mounted.name, panic = %reason, "Page module init panicked");
                Err(NavError::ModuleInit {
                    module_name: mounted.name.clone(),
                    reason: format!("panicked: {}", reason),
                })
            }
        }
    }

    /// Run `cleanup` on a module that is no longer active.
    ///
    /// Used when a navigation is superseded after its module finished `init`:
    /// the newer navigation's teardown may have run before `init` completed.
    pub fn release_stale(&self, mounted: &MountedModule) {
        if self.is_active(mounted) {
            return;
        }
        debug!(module = %mounted.name, "Releasing superseded page module");
        run_cleanup(mounted);
    }
}

fn run_cleanup(mounted: &MountedModule) {
    debug!(module = %mounted.name, "Cleaning up page module");
    match catch_unwind(AssertUnwindSafe(|| mounted.module.cleanup())) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(module = %mounted.name, error = %e, "Page module cleanup failed, continuing");
        }
        Err(payload) => {
            warn!(
                module = %mounted.name,
                panic = %panic_message(payload.as_ref()),
                "Page module cleanup panicked, continuing"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        inits: AtomicUsize,
        cleanups: AtomicUsize,
        fail_init: bool,
        panic_cleanup: bool,
    }

    #[async_trait]
    impl PageModule for Counting {
        fn html(&self) -> String {
            String::new()
        }

        async fn init(&self) -> anyhow::Result<()> {
            self.inits.fetch_add(1, Ordering::SeqCst);
            if self.fail_init {
                anyhow::bail!("socket refused");
            }
            Ok(())
        }

        fn cleanup(&self) -> anyhow::Result<()> {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
            if self.panic_cleanup {
                panic!("cleanup exploded");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_activate_then_teardown() {
        let module = Arc::new(Counting::default());
        let lifecycle = LifecycleManager::new();

        lifecycle
            .activate(MountedModule::new("chat", module.clone()))
            .await
            .unwrap();
        assert_eq!(lifecycle.active().unwrap().name, "chat");

        let previous = lifecycle.teardown().unwrap();
        assert_eq!(previous.name, "chat");
        assert!(lifecycle.active().is_none());
        assert!(lifecycle.teardown().is_none());
        assert_eq!(module.inits.load(Ordering::SeqCst), 1);
        assert_eq!(module.cleanups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_init_stays_active_for_cleanup() {
        let module = Arc::new(Counting {
            fail_init: true,
            ..Default::default()
        });
        let lifecycle = LifecycleManager::new();

        let err = lifecycle
            .activate(MountedModule::new("chat", module.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, NavError::ModuleInit { .. }));

        lifecycle.teardown();
        assert_eq!(module.cleanups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_cleanup_is_contained() {
        let module = Arc::new(Counting {
            panic_cleanup: true,
            ..Default::default()
        });
        let lifecycle = LifecycleManager::new();
        lifecycle
            .activate(MountedModule::new("files", module.clone()))
            .await
            .unwrap();

        assert!(lifecycle.teardown().is_some());
        assert!(lifecycle.active().is_none());
    }

    #[tokio::test]
    async fn test_mount_precedes_initialize() {
        let module = Arc::new(Counting::default());
        let mounted = MountedModule::new("chat", module.clone());
        let lifecycle = LifecycleManager::new();

        lifecycle.mount(mounted.clone());
        assert!(lifecycle.is_active(&mounted));
        assert_eq!(module.inits.load(Ordering::SeqCst), 0);

        lifecycle.initialize(&mounted).await.unwrap();
        assert_eq!(module.inits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_stale_skips_active_module() {
        let module = Arc::new(Counting::default());
        let mounted = MountedModule::new("chat", module.clone());
        let lifecycle = LifecycleManager::new();
        lifecycle.activate(mounted.clone()).await.unwrap();

        lifecycle.release_stale(&mounted);
        assert_eq!(module.cleanups.load(Ordering::SeqCst), 0);

        lifecycle.teardown();
        lifecycle.release_stale(&mounted);
        assert_eq!(module.cleanups.load(Ordering::SeqCst), 2);
    }
}
