use crate::types::{ActiveRoute, NavigationPhase};

/// All mutable navigation state of one router instance.
#[derive(Debug, Clone)]
pub struct RouterState {
    pub current: ActiveRoute,
    pub phase: NavigationPhase,
    /// Bumped by every navigation that passes the hook stage.
    pub generation: u64,
    /// Listeners attached and first navigation issued.
    pub started: bool,
}

impl RouterState {
    pub fn new(home_path: &str) -> Self {
        Self {
            current: ActiveRoute::Home {
                path: home_path.to_string(),
            },
            phase: NavigationPhase::Idle,
            generation: 0,
            started: false,
        }
    }

    pub fn current_path(&self) -> &str {
        self.current.path()
    }
}
