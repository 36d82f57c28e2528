//! Readiness state shared between the controller and the probes

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;

/// Thread-safe readiness tracking for the controller's components
///
/// The controller flips these as the store and dispatcher come and go; the
/// probe handlers only read them.
#[derive(Debug)]
pub struct HealthChecker {
    /// Whether the last store ping succeeded
    store_ready: AtomicBool,

    /// Whether the dispatcher is watching the store
    dispatcher_ready: AtomicBool,

    /// Keys waiting for a worker
    queue_depth: AtomicU64,

    max_queue_depth: u64,
}

impl HealthChecker {
    #[must_use]
    pub const fn new(max_queue_depth: u64) -> Self {
        Self {
            store_ready: AtomicBool::new(false),
            dispatcher_ready: AtomicBool::new(false),
            queue_depth: AtomicU64::new(0),
            max_queue_depth,
        }
    }

    pub fn set_store_ready(&self, ready: bool) {
        if self.store_ready.swap(ready, Ordering::Relaxed) != ready {
            tracing::debug!(ready, "Store readiness updated");
        }
    }

    pub fn set_dispatcher_ready(&self, ready: bool) {
        if self.dispatcher_ready.swap(ready, Ordering::Relaxed) != ready {
            tracing::debug!(ready, "Dispatcher readiness updated");
        }
    }

    pub fn set_queue_depth(&self, depth: u64) {
        self.queue_depth.store(depth, Ordering::Relaxed);
    }

    /// Liveness only needs the server to answer; a dead server times out
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        true
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        let status = self.status();
        if !status.ready {
            tracing::debug!(
                store_ready = status.store_ready,
                dispatcher_ready = status.dispatcher_ready,
                queue_depth = status.queue_depth,
                max_queue_depth = status.max_queue_depth,
                "Readiness check failed"
            );
        }
        status.ready
    }

    /// Snapshot of every tracked component
    #[must_use]
    pub fn status(&self) -> HealthStatus {
        let store_ready = self.store_ready.load(Ordering::Relaxed);
        let dispatcher_ready = self.dispatcher_ready.load(Ordering::Relaxed);
        let queue_depth = self.queue_depth.load(Ordering::Relaxed);

        HealthStatus {
            alive: self.is_alive(),
            ready: store_ready && dispatcher_ready && queue_depth < self.max_queue_depth,
            store_ready,
            dispatcher_ready,
            queue_depth,
            max_queue_depth: self.max_queue_depth,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[allow(
    clippy::struct_excessive_bools,
    reason = "Status struct intentionally has multiple boolean fields for clarity"
)]
pub struct HealthStatus {
    pub alive: bool,
    pub ready: bool,
    pub store_ready: bool,
    pub dispatcher_ready: bool,
    pub queue_depth: u64,
    pub max_queue_depth: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ready_until_every_component_is() {
        let checker = HealthChecker::new(10);
        assert!(checker.is_alive());
        assert!(!checker.is_ready());

        checker.set_store_ready(true);
        assert!(!checker.is_ready());

        checker.set_dispatcher_ready(true);
        assert!(checker.is_ready());

        checker.set_store_ready(false);
        assert!(!checker.is_ready());
    }

    #[test]
    fn test_queue_depth_limit() {
        let checker = HealthChecker::new(10);
        checker.set_store_ready(true);
        checker.set_dispatcher_ready(true);

        checker.set_queue_depth(9);
        assert!(checker.is_ready());

        checker.set_queue_depth(10);
        let status = checker.status();
        assert!(!status.ready);
        assert_eq!(status.queue_depth, 10);
        assert_eq!(status.max_queue_depth, 10);
    }
}
