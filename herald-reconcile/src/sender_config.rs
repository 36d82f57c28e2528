use std::sync::Arc;

use async_trait::async_trait;
use herald_common::{
    Kind, ResourceKey, SenderConfig, internal,
    tracing::{Instrument, debug, warn},
};
use herald_store::{ResourceStore, ResourceStoreExt};

use crate::{
    Action, ReconcileContext, ReconcileError, ReconcilerConfig, ResolveError, Resolver,
    reconciler::Reconciler,
};

/// Keeps `EmailSenderConfig.status.error` in step with its credential.
///
/// The error is cleared whenever the credential resolves and set to the
/// resolution failure otherwise.
#[derive(Debug, Clone)]
pub struct SenderConfigReconciler {
    store: Arc<dyn ResourceStore>,
    resolver: Resolver,
    config: ReconcilerConfig,
}

impl SenderConfigReconciler {
    pub fn new(store: Arc<dyn ResourceStore>, config: ReconcilerConfig) -> Self {
        Self {
            resolver: Resolver::new(Arc::clone(&store)),
            store,
            config,
        }
    }

    async fn run(&self, key: &ResourceKey, ctx: &ReconcileContext) -> Result<Action, ReconcileError> {
        for round in 0..=self.config.max_conflict_retries {
            let mut sender: SenderConfig = match self.store.fetch(key).await {
                Ok(sender) => sender,
                Err(e) if e.is_not_found() => {
                    internal!("EmailSenderConfig {key} no longer exists");
                    return Ok(Action::Done);
                }
                Err(e) => return Err(e.into()),
            };

            ctx.check()?;

            let (error, action) = match self.resolver.credential(&sender).await {
                Ok(_) => (String::new(), Action::Done),
                Err(ResolveError::Store(e)) => return Err(e.into()),
                Err(e) => {
                    warn!("EmailSenderConfig {key} is unusable: {e}");
                    (e.to_string(), Action::Backoff)
                }
            };

            if sender.status.error == error {
                return Ok(action);
            }
            sender.status.error = error;

            match self.store.write_status(sender).await {
                Ok(_) => return Ok(action),
                Err(e) if e.is_conflict() => {
                    debug!("Status write for {key} conflicted (round {round}), reloading");
                }
                Err(e) if e.is_not_found() => return Ok(Action::Done),
                Err(e) => return Err(e.into()),
            }
        }

        Err(ReconcileError::ConflictRetriesExhausted(
            self.config.max_conflict_retries + 1,
        ))
    }
}

#[async_trait]
impl Reconciler for SenderConfigReconciler {
    fn kind(&self) -> Kind {
        Kind::SenderConfig
    }

    async fn reconcile(
        &self,
        key: &ResourceKey,
        ctx: &ReconcileContext,
    ) -> Result<Action, ReconcileError> {
        self.run(key, ctx).instrument(ctx.span().clone()).await
    }
}
