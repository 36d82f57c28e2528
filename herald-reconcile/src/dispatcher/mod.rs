//! Dispatch of store changes to reconcilers.
//!
//! The dispatcher watches the store, routes each event to the keys it makes
//! stale, and runs a pool of workers per kind pulling from a [`WorkQueue`].
//! Failed keys are re-queued with exponential backoff; successful ones have
//! their failure count reset.
//!
//! ## Graceful Shutdown
//!
//! On a shutdown signal the queues stop handing out keys and in-flight
//! reconciles are cancelled. A cancelled reconcile stops before its next
//! external call, and never between a confirmed send and recording it.

mod queue;
pub mod routing;

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use dashmap::DashMap;
use herald_common::{
    Kind, ResourceKey, Signal, incoming, internal,
    tracing::{debug, error, info, warn},
};
use herald_store::{ResourceStore, WatchEvent};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;

pub use queue::WorkQueue;

use crate::{Action, ReconcileContext, ReconcileError, Reconciler, RetryPolicy};

mod defaults {
    pub const fn workers() -> usize {
        4
    }

    pub const fn shutdown_timeout_secs() -> u64 {
        30
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Concurrent reconciles per kind
    ///
    /// Default: 4
    #[serde(default = "defaults::workers")]
    pub workers: usize,

    /// Re-enqueue every object this often (in seconds)
    ///
    /// Default: None (only react to changes)
    #[serde(default)]
    pub resync_interval_secs: Option<u64>,

    /// How long to wait for in-flight reconciles on shutdown (in seconds)
    ///
    /// Default: 30 seconds
    #[serde(default = "defaults::shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: defaults::workers(),
            resync_interval_secs: None,
            shutdown_timeout_secs: defaults::shutdown_timeout_secs(),
        }
    }
}

/// A queue, its failure counts and the reconciler draining it
#[derive(Clone)]
struct Controller {
    reconciler: Arc<dyn Reconciler>,
    queue: WorkQueue,
    failures: Arc<DashMap<ResourceKey, u32>>,
    retry: RetryPolicy,
}

impl Controller {
    fn new(reconciler: Arc<dyn Reconciler>, retry: RetryPolicy) -> Self {
        Self {
            reconciler,
            queue: WorkQueue::new(),
            failures: Arc::new(DashMap::new()),
            retry,
        }
    }

    /// Queue a key because its object (or a dependency) changed
    fn enqueue(&self, key: ResourceKey) {
        self.failures.remove(&key);
        self.queue.add(key);
    }

    async fn run_worker(self, cancel: CancellationToken) {
        let kind = self.reconciler.kind();

        while let Some(key) = self.queue.get().await {
            let ctx = ReconcileContext::new(kind, &key, cancel.child_token());

            match self.reconciler.reconcile(&key, &ctx).await {
                Ok(Action::Done) => {
                    self.failures.remove(&key);
                }
                Ok(Action::Backoff) => self.backoff(&key),
                Err(ReconcileError::Cancelled) => {
                    debug!("Reconcile of {kind} {key} cancelled");
                }
                Err(e) => {
                    error!("Reconcile of {kind} {key} failed: {e}");
                    self.backoff(&key);
                }
            }

            self.queue.done(&key);
        }
    }

    fn backoff(&self, key: &ResourceKey) {
        let failures = {
            let mut entry = self.failures.entry(key.clone()).or_insert(0);
            *entry = entry.saturating_add(1);
            *entry
        };

        if !self.retry.should_retry(failures) {
            warn!(
                "Giving up on {} {key} after {failures} failed attempts until it changes",
                self.reconciler.kind()
            );
            return;
        }

        let delay = self.retry.delay_for(failures);
        internal!(
            level = DEBUG,
            "Retrying {key} in {:.1}s (failure {failures})",
            delay.as_secs_f64()
        );
        self.queue.add_after(key.clone(), delay);
    }
}

/// Read-only view of a running dispatcher, for readiness checks
#[derive(Clone)]
pub struct DispatcherHandle {
    running: Arc<AtomicBool>,
    queues: [WorkQueue; 2],
}

impl DispatcherHandle {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Keys waiting for a worker, across all kinds
    pub fn queue_depth(&self) -> usize {
        self.queues.iter().map(WorkQueue::len).sum()
    }
}

pub struct Dispatcher {
    store: Arc<dyn ResourceStore>,
    emails: Controller,
    sender_configs: Controller,
    config: DispatcherConfig,
    running: Arc<AtomicBool>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        emails: Arc<dyn Reconciler>,
        sender_configs: Arc<dyn Reconciler>,
        config: DispatcherConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            emails: Controller::new(emails, retry.clone()),
            sender_configs: Controller::new(sender_configs, retry),
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn handle(&self) -> DispatcherHandle {
        DispatcherHandle {
            running: Arc::clone(&self.running),
            queues: [
                self.emails.queue.clone(),
                self.sender_configs.queue.clone(),
            ],
        }
    }

    const fn controller(&self, kind: Kind) -> Option<&Controller> {
        match kind {
            Kind::Email => Some(&self.emails),
            Kind::SenderConfig => Some(&self.sender_configs),
            Kind::Secret => None,
        }
    }

    /// Queue every email and sender config in the store
    ///
    /// # Errors
    /// If the store cannot be listed
    pub async fn enqueue_all(&self) -> Result<usize, ReconcileError> {
        let mut count = 0;
        for kind in [Kind::SenderConfig, Kind::Email] {
            let Some(controller) = self.controller(kind) else {
                continue;
            };
            for object in self.store.list(kind, None).await? {
                controller.queue.add(object.key());
                count += 1;
            }
        }
        Ok(count)
    }

    async fn route(&self, event: &WatchEvent) {
        incoming!("{:?} {} {}", event.change, event.kind, event.key);

        match routing::targets(&*self.store, event).await {
            Ok(targets) => {
                for key in targets.sender_configs {
                    self.sender_configs.enqueue(key);
                }
                for key in targets.emails {
                    self.emails.enqueue(key);
                }
            }
            Err(e) => {
                error!("Failed to route {} {}: {e}", event.kind, event.key);
                // Fall back to the object itself where it has a queue
                if let Some(controller) = self.controller(event.kind) {
                    controller.enqueue(event.key.clone());
                }
            }
        }
    }

    async fn resync(&self) {
        match self.enqueue_all().await {
            Ok(count) => debug!("Resynced {count} objects"),
            Err(e) => error!("Resync failed: {e}"),
        }
    }

    /// Run until a shutdown signal is received
    ///
    /// # Errors
    /// If the initial listing of the store fails
    pub async fn serve(&self, mut shutdown: broadcast::Receiver<Signal>) -> Result<(), ReconcileError> {
        internal!("Dispatcher starting");

        // Subscribe before listing so nothing between the two is missed
        let mut events = self.store.watch();
        let cancel = CancellationToken::new();
        let mut workers = JoinSet::new();

        for controller in [&self.emails, &self.sender_configs] {
            for _ in 0..self.config.workers.max(1) {
                workers.spawn(controller.clone().run_worker(cancel.clone()));
            }
        }

        let result = self.run(&mut events, &mut shutdown).await;

        self.running.store(false, Ordering::SeqCst);
        self.emails.queue.shut_down();
        self.sender_configs.queue.shut_down();
        cancel.cancel();

        let drain = async { while workers.join_next().await.is_some() {} };
        if tokio::time::timeout(Duration::from_secs(self.config.shutdown_timeout_secs), drain)
            .await
            .is_err()
        {
            warn!("Shutdown timeout exceeded, aborting remaining reconciles");
            workers.abort_all();
        }

        internal!("Dispatcher shutdown complete");
        result
    }

    async fn run(
        &self,
        events: &mut broadcast::Receiver<WatchEvent>,
        shutdown: &mut broadcast::Receiver<Signal>,
    ) -> Result<(), ReconcileError> {
        let count = self.enqueue_all().await?;
        info!("Dispatcher queued {count} existing objects");
        self.running.store(true, Ordering::SeqCst);

        let mut resync = self
            .config
            .resync_interval_secs
            .filter(|secs| *secs > 0)
            .map(|secs| tokio::time::interval(Duration::from_secs(secs)));

        // Skip the first tick to avoid an immediate resync
        if let Some(interval) = resync.as_mut() {
            interval.tick().await;
        }

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => self.route(&event).await,
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Dispatcher missed {missed} watch events, resyncing");
                        self.resync().await;
                    }
                    Err(RecvError::Closed) => {
                        warn!("Store watch closed");
                        break;
                    }
                },
                () = async {
                    match resync.as_mut() {
                        Some(interval) => {
                            interval.tick().await;
                        }
                        None => std::future::pending::<()>().await,
                    }
                } => self.resync().await,
                sig = shutdown.recv() => {
                    match sig {
                        Ok(Signal::Shutdown | Signal::Finalised) => {
                            internal!("Dispatcher received shutdown signal");
                        }
                        Err(e) => {
                            error!("Dispatcher shutdown channel error: {e}");
                        }
                    }
                    break;
                }
            }
        }

        Ok(())
    }
}
