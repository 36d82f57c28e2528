//! Top-level wiring: config, store, reconcilers, dispatcher and probes.

use std::{sync::Arc, time::Duration};

use herald_common::{
    Signal,
    audit::{AuditConfig, AuditLog},
    internal, logging,
    tracing::{debug, error},
};
use herald_health::{HealthChecker, HealthConfig, HealthServer};
use herald_provider::{Providers, ProvidersConfig};
use herald_reconcile::{
    Dispatcher, DispatcherConfig, DispatcherHandle, EmailReconciler, ReconcilerConfig,
    RetryPolicy, SenderConfigReconciler,
};
use herald_store::{ResourceStore, StoreConfig};
use serde::Deserialize;
use tokio::sync::broadcast;

/// How often readiness is refreshed from the store and dispatcher
const MONITOR_INTERVAL: Duration = Duration::from_secs(1);

/// The controller configuration, as read from `herald.config.ron`
#[derive(Debug, Default, Deserialize)]
pub struct Herald {
    #[serde(default)]
    store: StoreConfig,
    #[serde(default, alias = "provider")]
    providers: ProvidersConfig,
    #[serde(default)]
    reconciler: ReconcilerConfig,
    #[serde(default)]
    retry: RetryPolicy,
    #[serde(default)]
    dispatcher: DispatcherConfig,
    #[serde(default)]
    audit: AuditConfig,
    #[serde(default)]
    health: HealthConfig,
}

/// A wired controller, ready to serve
pub struct Runtime {
    store: Arc<dyn ResourceStore>,
    dispatcher: Dispatcher,
    checker: Arc<HealthChecker>,
    health: Option<HealthServer>,
}

impl Herald {
    /// Build the store, providers and reconcilers, and bind the health server
    ///
    /// # Errors
    /// If the store cannot be seeded, a provider cannot be constructed or the
    /// health server cannot bind
    pub async fn build(self) -> anyhow::Result<Runtime> {
        let store = self.store.build().await?;
        let providers = Providers::from_config(&self.providers)?;
        internal!(
            level = INFO,
            "Default email provider is {}",
            providers.default_kind()
        );

        let emails = EmailReconciler::new(
            Arc::clone(&store),
            providers,
            AuditLog::new(self.audit),
            self.reconciler.clone(),
        );
        let sender_configs = SenderConfigReconciler::new(Arc::clone(&store), self.reconciler);
        let dispatcher = Dispatcher::new(
            Arc::clone(&store),
            Arc::new(emails),
            Arc::new(sender_configs),
            self.dispatcher,
            self.retry,
        );

        let checker = Arc::new(HealthChecker::new(self.health.max_queue_depth));
        let health = if self.health.enabled {
            Some(HealthServer::new(&self.health, Arc::clone(&checker)).await?)
        } else {
            None
        };

        Ok(Runtime {
            store,
            dispatcher,
            checker,
            health,
        })
    }

    /// Run this controller until SIGINT or SIGTERM
    ///
    /// # Errors
    /// If the controller fails to start, or the dispatcher stops with an error
    pub async fn run(self) -> anyhow::Result<()> {
        logging::init();
        internal!(level = INFO, "Controller running");

        let runtime = self.build().await?;
        let (shutdown, _) = broadcast::channel(16);

        let signals = tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                if let Err(e) = wait_for_signal().await {
                    error!("Unable to listen for shutdown signals: {e}");
                    return;
                }
                // Nobody listening means everything already stopped
                shutdown.send(Signal::Shutdown).ok();

                if tokio::signal::ctrl_c().await.is_ok() {
                    internal!(level = WARN, "Forcing shutdown");
                    std::process::exit(1);
                }
            }
        });

        let result = runtime.serve(shutdown).await;
        signals.abort();

        internal!(level = INFO, "Shutting down...");
        result
    }
}

impl Runtime {
    pub const fn store(&self) -> &Arc<dyn ResourceStore> {
        &self.store
    }

    pub const fn health(&self) -> &Arc<HealthChecker> {
        &self.checker
    }

    /// Serve until `shutdown` carries a signal, or the dispatcher stops
    ///
    /// # Errors
    /// If the dispatcher or the health server stops with an error
    pub async fn serve(self, shutdown: broadcast::Sender<Signal>) -> anyhow::Result<()> {
        let Self {
            store,
            dispatcher,
            checker,
            health,
        } = self;
        let dispatcher_shutdown = shutdown.subscribe();
        let monitor_shutdown = shutdown.subscribe();
        let health_shutdown = shutdown.subscribe();

        let dispatched = async {
            let result = dispatcher.serve(dispatcher_shutdown).await;
            // Stop the probes and monitor too if the dispatcher gave up on its own
            shutdown.send(Signal::Finalised).ok();
            result
        };

        let probes = async {
            match health {
                Some(server) => server.serve(health_shutdown).await,
                None => Ok(()),
            }
        };

        let monitored = monitor(
            store,
            dispatcher.handle(),
            checker,
            monitor_shutdown,
        );

        let (dispatched, probes, ()) = tokio::join!(dispatched, probes, monitored);
        dispatched?;
        probes?;

        Ok(())
    }
}

/// Keep the health checker in step with the store and dispatcher
async fn monitor(
    store: Arc<dyn ResourceStore>,
    dispatcher: DispatcherHandle,
    checker: Arc<HealthChecker>,
    mut shutdown: broadcast::Receiver<Signal>,
) {
    let mut interval = tokio::time::interval(MONITOR_INTERVAL);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match store.ping().await {
                    Ok(()) => checker.set_store_ready(true),
                    Err(e) => {
                        debug!("Store ping failed: {e}");
                        checker.set_store_ready(false);
                    }
                }
                checker.set_dispatcher_ready(dispatcher.is_running());
                checker.set_queue_depth(
                    u64::try_from(dispatcher.queue_depth()).unwrap_or(u64::MAX),
                );
            }
            _ = shutdown.recv() => break,
        }
    }

    checker.set_dispatcher_ready(false);
}

async fn wait_for_signal() -> anyhow::Result<()> {
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        r = tokio::signal::ctrl_c() => {
            r?;
            internal!(level = INFO, "CTRL+C entered -- Enter it again to force shutdown");
        }
        _ = terminate.recv() => {
            internal!(level = INFO, "Terminate Signal received, shutting down");
        }
    }

    Ok(())
}
