//! Keyed work queue.
//!
//! A key is queued at most once. While a worker holds a key, adding it again
//! only marks it dirty; the key goes back on the queue when the worker calls
//! [`WorkQueue::done`]. This is what keeps two reconciles of the same object
//! from ever running at the same time.

use std::{
    collections::{HashSet, VecDeque},
    sync::Arc,
    time::Duration,
};

use herald_common::ResourceKey;
use parking_lot::Mutex;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct State {
    queue: VecDeque<ResourceKey>,
    queued: HashSet<ResourceKey>,
    processing: HashSet<ResourceKey>,
    dirty: HashSet<ResourceKey>,
    shutting_down: bool,
}

#[derive(Debug, Clone, Default)]
pub struct WorkQueue {
    state: Arc<Mutex<State>>,
    notify: Arc<Notify>,
}

impl WorkQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `key` unless it is already queued
    pub fn add(&self, key: ResourceKey) {
        let mut state = self.state.lock();
        if state.shutting_down {
            return;
        }

        if state.processing.contains(&key) {
            state.dirty.insert(key);
            return;
        }

        if state.queued.insert(key.clone()) {
            state.queue.push_back(key);
            drop(state);
            self.notify.notify_one();
        }
    }

    /// Queue `key` once `delay` has passed
    pub fn add_after(&self, key: ResourceKey, delay: Duration) {
        if delay.is_zero() {
            self.add(key);
            return;
        }

        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(key);
        });
    }

    /// Wait for the next key and mark it as being processed.
    ///
    /// Returns `None` once the queue is shut down.
    pub async fn get(&self) -> Option<ResourceKey> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock();
                if state.shutting_down {
                    return None;
                }

                if let Some(key) = state.queue.pop_front() {
                    state.queued.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
            }
            notified.await;
        }
    }

    /// Release a key returned by [`WorkQueue::get`], requeueing it if it was
    /// added again in the meantime
    pub fn done(&self, key: &ResourceKey) {
        let mut state = self.state.lock();
        state.processing.remove(key);

        if state.dirty.remove(key) && !state.shutting_down && state.queued.insert(key.clone()) {
            state.queue.push_back(key.clone());
            drop(state);
            self.notify.notify_one();
        }
    }

    /// Stop handing out keys and wake every waiting worker
    pub fn shut_down(&self) {
        self.state.lock().shutting_down = true;
        self.notify.notify_waiters();
    }

    /// Number of keys waiting for a worker
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of keys a worker is holding right now
    pub fn in_flight(&self) -> usize {
        self.state.lock().processing.len()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    fn key(name: &str) -> ResourceKey {
        ResourceKey::new("default", name)
    }

    #[tokio::test]
    async fn test_deduplicates_queued_keys() {
        let queue = WorkQueue::new();
        queue.add(key("a"));
        queue.add(key("a"));
        queue.add(key("b"));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.get().await, Some(key("a")));
        assert_eq!(queue.get().await, Some(key("b")));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_key_added_while_processing_is_parked() {
        let queue = WorkQueue::new();
        queue.add(key("a"));

        let held = queue.get().await.expect("key");
        queue.add(key("a"));
        assert!(queue.is_empty(), "must not be handed to a second worker");
        assert_eq!(queue.in_flight(), 1);

        queue.done(&held);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get().await, Some(key("a")));
    }

    #[tokio::test]
    async fn test_done_without_readd_does_not_requeue() {
        let queue = WorkQueue::new();
        queue.add(key("a"));
        let held = queue.get().await.expect("key");
        queue.done(&held);

        assert!(queue.is_empty());
        assert_eq!(queue.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_wakes_waiters() {
        let queue = WorkQueue::new();
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.get().await })
        };

        tokio::task::yield_now().await;
        queue.shut_down();

        assert_eq!(waiter.await.expect("join"), None);
        queue.add(key("late"));
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_after_delays() {
        let queue = WorkQueue::new();
        queue.add_after(key("a"), Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(queue.is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(queue.len(), 1);
    }
}
