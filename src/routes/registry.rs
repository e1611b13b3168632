use super::normalize::PathNormalizer;
use crate::types::RouteDescriptor;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Mapping from normalized path to route descriptor.
///
/// Descriptors are stored by value and handed out as copies, so callers can
/// never mutate the table behind the engine's back.
pub struct RouteRegistry {
    routes: RwLock<HashMap<String, RouteDescriptor>>,
    normalizer: PathNormalizer,
}

impl RouteRegistry {
    pub fn new(normalizer: PathNormalizer) -> Self {
        Self {
            routes: RwLock::new(HashMap::new()),
            normalizer,
        }
    }

    /// Register a descriptor under the normalized form of `path`.
    ///
    /// The stored descriptor's `path` is rewritten to the normalized key. A
    /// second registration for the same path replaces the first.
    pub fn register(&self, path: &str, mut descriptor: RouteDescriptor) -> String {
        let key = self.normalizer.normalize(path);
        descriptor.path = key.clone();

        if let Some(previous) = self.routes.write().insert(key.clone(), descriptor) {
            debug!(
                path = %key,
                previous_module = %previous.module_name,
                "Route re-registered, replacing previous descriptor"
            );
        }

        key
    }

    pub fn resolve(&self, path: &str) -> Option<RouteDescriptor> {
        let key = self.normalizer.normalize(path);
        self.routes.read().get(&key).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        let key = self.normalizer.normalize(path);
        self.routes.read().contains_key(&key)
    }

    /// True iff `path` normalizes to `current_path`.
    pub fn is_active(&self, path: &str, current_path: &str) -> bool {
        self.normalizer.normalize(path) == current_path
    }

    /// Ordered copy of the route table.
    pub fn snapshot(&self) -> BTreeMap<String, RouteDescriptor> {
        self.routes
            .read()
            .iter()
            .map(|(path, descriptor)| (path.clone(), descriptor.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.read().is_empty()
    }

    pub fn normalizer(&self) -> &PathNormalizer {
        &self.normalizer
    }
}
