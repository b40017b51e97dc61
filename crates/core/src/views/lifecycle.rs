use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Tracks which view is currently active so late responses can be discarded.
///
/// Each navigation calls [`ViewLifecycle::activate`]; tickets issued for
/// earlier views stop being current at that moment.
#[derive(Debug, Clone, Default)]
pub struct ViewLifecycle {
    generation: Arc<AtomicU64>,
}

/// Proof that a piece of async work was started by a particular view.
#[derive(Debug, Clone)]
pub struct ViewTicket {
    generation: u64,
    lifecycle: ViewLifecycle,
}

impl ViewLifecycle {
    /// Create a lifecycle with no active view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tear down the current view and start a new one.
    pub fn activate(&self) -> ViewTicket {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        ViewTicket {
            generation,
            lifecycle: self.clone(),
        }
    }

    /// Tear down the current view without starting another.
    pub fn teardown(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

impl ViewTicket {
    /// Whether the issuing view is still the active one.
    pub fn is_current(&self) -> bool {
        self.lifecycle.generation.load(Ordering::Acquire) == self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_invalidates_older_tickets() {
        let lifecycle = ViewLifecycle::new();
        let first = lifecycle.activate();
        assert!(first.is_current());

        let second = lifecycle.activate();
        assert!(!first.is_current());
        assert!(second.is_current());

        lifecycle.teardown();
        assert!(!second.is_current());
    }

    #[test]
    fn cloned_tickets_share_fate() {
        let lifecycle = ViewLifecycle::new();
        let ticket = lifecycle.activate();
        let copy = ticket.clone();
        lifecycle.activate();
        assert!(!copy.is_current());
    }
}
