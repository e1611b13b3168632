//! Navigation hooks
//!
//! Before-hooks run in registration order and may veto a navigation. After-hooks
//! are observational. Hook failures (an `Err` or a panic) are logged and
//! isolated so one broken hook cannot take the pipeline down.

use crate::modules::MountedModule;
use crate::types::RouteChange;
use crate::utils::panic_message;
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Verdict of a before-navigation hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    Proceed,
    Cancel,
}

impl From<bool> for NavigationDecision {
    fn from(proceed: bool) -> Self {
        if proceed {
            NavigationDecision::Proceed
        } else {
            NavigationDecision::Cancel
        }
    }
}

/// Context handed to after-navigation hooks.
#[derive(Debug, Clone)]
pub struct Navigated {
    pub from: String,
    pub to: String,
    /// The mounted module; `None` for the home view.
    pub module: Option<MountedModule>,
}

pub type BeforeNavigateHook =
    Arc<dyn Fn(&RouteChange) -> anyhow::Result<NavigationDecision> + Send + Sync>;
pub type AfterNavigateHook = Arc<dyn Fn(&Navigated) -> anyhow::Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Before,
    After,
}

#[derive(Default)]
struct HookLists {
    before: Vec<(u64, BeforeNavigateHook)>,
    after: Vec<(u64, AfterNavigateHook)>,
}

#[derive(Default)]
pub struct HookRegistry {
    lists: RwLock<HookLists>,
    next_id: AtomicU64,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_before<F>(self: &Arc<Self>, hook: F) -> HookRegistration
    where
        F: Fn(&RouteChange) -> anyhow::Result<NavigationDecision> + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.lists.write().before.push((id, Arc::new(hook)));
        HookRegistration::new(id, HookPhase::Before, self)
    }

    pub fn add_after<F>(self: &Arc<Self>, hook: F) -> HookRegistration
    where
        F: Fn(&Navigated) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.lists.write().after.push((id, Arc::new(hook)));
        HookRegistration::new(id, HookPhase::After, self)
    }

    fn remove(&self, id: u64, phase: HookPhase) -> bool {
        let mut lists = self.lists.write();
        match phase {
            HookPhase::Before => {
                let before = lists.before.len();
                lists.before.retain(|(existing, _)| *existing != id);
                lists.before.len() != before
            }
            HookPhase::After => {
                let before = lists.after.len();
                lists.after.retain(|(existing, _)| *existing != id);
                lists.after.len() != before
            }
        }
    }

    pub fn before_count(&self) -> usize {
        self.lists.read().before.len()
    }

    pub fn after_count(&self) -> usize {
        self.lists.read().after.len()
    }

    /// Run before-hooks until one cancels.
    ///
    /// A hook that errors or panics is logged and counts as `Proceed`.
    pub fn run_before(&self, change: &RouteChange) -> NavigationDecision {
        let hooks: Vec<BeforeNavigateHook> = self
            .lists
            .read()
            .before
            .iter()
            .map(|(_, hook)| hook.clone())
            .collect();

        for hook in hooks {
            match catch_unwind(AssertUnwindSafe(|| hook(change))) {
                Ok(Ok(NavigationDecision::Proceed)) => {}
                Ok(Ok(NavigationDecision::Cancel)) => {
                    debug!(from = %change.from, to = %change.to, "Before-navigate hook cancelled");
                    return NavigationDecision::Cancel;
                }
                Ok(Err(e)) => {
                    warn!(to = %change.to, error = %e, "Before-navigate hook failed, ignoring");
                }
                Err(payload) => {
                    warn!(
                        to = %change.to,
                        panic = %panic_message(payload.as_ref()),
                        "Before-navigate hook panicked, ignoring"
                    );
                }
            }
        }

        NavigationDecision::Proceed
    }

    /// Run every after-hook; failures never stop the remaining hooks.
    pub fn run_after(&self, navigated: &Navigated) {
        let hooks: Vec<AfterNavigateHook> = self
            .lists
            .read()
            .after
            .iter()
            .map(|(_, hook)| hook.clone())
            .collect();

        for hook in hooks {
            match catch_unwind(AssertUnwindSafe(|| hook(navigated))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(to = %navigated.to, error = %e, "After-navigate hook failed");
                }
                Err(payload) => {
                    warn!(
                        to = %navigated.to,
                        panic = %panic_message(payload.as_ref()),
                        "After-navigate hook panicked"
                    );
                }
            }
        }
    }
}

/// Handle for a registered hook.
///
/// Dropping the handle keeps the hook registered; call [`unregister`](Self::unregister)
/// to remove it.
#[derive(Debug)]
pub struct HookRegistration {
    id: u64,
    phase: HookPhase,
    registry: Weak<HookRegistry>,
}

impl HookRegistration {
    fn new(id: u64, phase: HookPhase, registry: &Arc<HookRegistry>) -> Self {
        Self {
            id,
            phase,
            registry: Arc::downgrade(registry),
        }
    }

    pub fn phase(&self) -> HookPhase {
        self.phase
    }

    /// Remove the hook. Returns `false` if it was already gone or the router was dropped.
    pub fn unregister(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.remove(self.id, self.phase),
            None => false,
        }
    }
}
