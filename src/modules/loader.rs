//! Module file loader
//!
//! Each module file is loaded at most once. Concurrent requests for the same
//! file share a single in-flight load through a per-file `OnceCell`; a failed
//! load leaves the cell empty so a later navigation retries it.

use super::{ModuleRegistry, ModuleSource};
use crate::types::{NavError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

pub struct ModuleLoader {
    source: Arc<dyn ModuleSource>,
    registry: Arc<ModuleRegistry>,
    files: Mutex<HashMap<String, Arc<OnceCell<()>>>>,
}

impl ModuleLoader {
    pub fn new(source: Arc<dyn ModuleSource>, registry: Arc<ModuleRegistry>) -> Self {
        Self {
            source,
            registry,
            files: Mutex::new(HashMap::new()),
        }
    }

    /// Ensure `module_file` has been loaded.
    pub async fn load(&self, module_file: &str) -> Result<()> {
        let cell = {
            let mut files = self.files.lock();
            files
                .entry(module_file.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        if cell.initialized() {
            debug!(module_file = %module_file, "Module file already loaded");
            return Ok(());
        }

        cell.get_or_try_init(|| async {
            info!(module_file = %module_file, "Loading module file");
            self.source
                .load(module_file, &self.registry)
                .await
                .map_err(|e| {
                    warn!(module_file = %module_file, error = %e, "Module file failed to load");
                    NavError::ModuleLoad {
                        module_file: module_file.to_string(),
                        reason: e.to_string(),
                    }
                })
        })
        .await?;

        Ok(())
    }

    pub fn is_loaded(&self, module_file: &str) -> bool {
        self.files
            .lock()
            .get(module_file)
            .is_some_and(|cell| cell.initialized())
    }

    /// Sorted list of module files that finished loading.
    pub fn loaded_files(&self) -> Vec<String> {
        let mut loaded: Vec<String> = self
            .files
            .lock()
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(file, _)| file.clone())
            .collect();
        loaded.sort();
        loaded
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Source that counts loads and fails the first `failures` attempts.
    struct CountingSource {
        loads: AtomicUsize,
        failures: usize,
    }

    impl CountingSource {
        fn new(failures: usize) -> Self {
            Self {
                loads: AtomicUsize::new(0),
                failures,
            }
        }
    }

    #[async_trait]
    impl ModuleSource for CountingSource {
        async fn load(&self, _module_file: &str, _registry: &ModuleRegistry) -> anyhow::Result<()> {
            let attempt = self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            if attempt < self.failures {
                anyhow::bail!("network unreachable");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_load_once() {
        let source = Arc::new(CountingSource::new(0));
        let loader = ModuleLoader::new(source.clone(), Arc::new(ModuleRegistry::new()));

        loader.load("/mod-a.js").await.unwrap();
        loader.load("/mod-a.js").await.unwrap();

        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
        assert!(loader.is_loaded("/mod-a.js"));
        assert_eq!(loader.loaded_files(), vec!["/mod-a.js"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_loads_share_one_fetch() {
        let source = Arc::new(CountingSource::new(0));
        let loader = ModuleLoader::new(source.clone(), Arc::new(ModuleRegistry::new()));

        let (first, second) = tokio::join!(loader.load("/mod-a.js"), loader.load("/mod-a.js"));

        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let source = Arc::new(CountingSource::new(1));
        let loader = ModuleLoader::new(source.clone(), Arc::new(ModuleRegistry::new()));

        let err = loader.load("/mod-a.js").await.unwrap_err();
        assert!(matches!(err, NavError::ModuleLoad { .. }));
        assert!(err.to_string().contains("network unreachable"));
        assert!(!loader.is_loaded("/mod-a.js"));
        assert!(loader.loaded_files().is_empty());

        loader.load("/mod-a.js").await.unwrap();
        assert!(loader.is_loaded("/mod-a.js"));
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }
}
