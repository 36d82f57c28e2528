//! The email reconciler.
//!
//! One invocation loads the email, returns early if it is already `Sent`,
//! resolves its sender config and credential, calls the selected provider at
//! most once, and records the outcome with a status write checked against the
//! resource version it read. A conflicting write reloads the email and
//! re-decides. Once the provider has answered, that answer is reused, so a
//! lost race never sends twice.

use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use herald_common::{
    EmailIntent, Kind, ResourceKey,
    audit::AuditLog,
    internal, outgoing,
    tracing::{Instrument, debug, warn},
};
use herald_provider::{Mailbox, OutboundMessage, ProviderError, Providers};
use herald_store::{ResourceStore, ResourceStoreExt};

use crate::{
    Action, DeliveryFailure, ReconcileContext, ReconcileError, ReconcilerConfig, ResolveError,
    Resolved, Resolver,
    reconciler::Reconciler,
    status::{Outcome, next_status},
};

#[derive(Debug, Clone)]
pub struct EmailReconciler {
    store: Arc<dyn ResourceStore>,
    resolver: Resolver,
    providers: Providers,
    audit: AuditLog,
    config: ReconcilerConfig,
}

impl EmailReconciler {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        providers: Providers,
        audit: AuditLog,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            resolver: Resolver::new(Arc::clone(&store)),
            store,
            providers,
            audit,
            config,
        }
    }

    /// Drive the email under `key` towards `Sent`
    ///
    /// # Errors
    /// - `Store` for store failures other than a missing object
    /// - `ConflictRetriesExhausted` when every status write lost a race
    /// - `Cancelled` when `ctx` was cancelled before an external call
    pub async fn reconcile_email(
        &self,
        key: &ResourceKey,
        ctx: &ReconcileContext,
    ) -> Result<Action, ReconcileError> {
        self.run(key, ctx).instrument(ctx.span().clone()).await
    }

    async fn run(&self, key: &ResourceKey, ctx: &ReconcileContext) -> Result<Action, ReconcileError> {
        let mut outcome: Option<Outcome> = None;

        for round in 0..=self.config.max_conflict_retries {
            let mut email: EmailIntent = match self.store.fetch(key).await {
                Ok(email) => email,
                Err(e) if e.is_not_found() => {
                    internal!("Email {key} no longer exists");
                    return Ok(Action::Done);
                }
                Err(e) => return Err(e.into()),
            };

            if email.status.is_sent() {
                internal!("Email {key} already sent, nothing to do");
                return Ok(Action::Done);
            }

            let result = match outcome.take() {
                Some(called) => called,
                None => self.attempt(key, &email, ctx).await?,
            };

            // A confirmed send is always recorded
            if !result.is_sent() {
                ctx.check()?;
            }

            let status = next_status(&email.status, &result);
            if status == email.status {
                internal!("Status of {key} unchanged");
                return Ok(result.action());
            }
            email.status = status;

            match self.store.write_status(email).await {
                Ok(written) => {
                    internal!(
                        level = DEBUG,
                        "Recorded {} for {key} at resourceVersion {}",
                        written.status.delivery_status,
                        written.metadata.resource_version
                    );
                    return Ok(result.action());
                }
                Err(e) if e.is_conflict() => {
                    debug!("Status write for {key} conflicted (round {round}), reloading");
                    // Only the provider's answer survives a reload; anything
                    // decided before the call is decided again
                    if result.reached_provider() {
                        outcome = Some(result);
                    }
                }
                Err(e) if e.is_not_found() => {
                    internal!("Email {key} deleted before its status could be written");
                    return Ok(Action::Done);
                }
                Err(e) => return Err(e.into()),
            }
        }

        if outcome.as_ref().is_some_and(Outcome::is_sent) {
            warn!("Email {key} was sent but its status could not be recorded");
        }

        Err(ReconcileError::ConflictRetriesExhausted(
            self.config.max_conflict_retries + 1,
        ))
    }

    /// Resolve dependencies and make the one provider call for this invocation
    async fn attempt(
        &self,
        key: &ResourceKey,
        email: &EmailIntent,
        ctx: &ReconcileContext,
    ) -> Result<Outcome, ReconcileError> {
        ctx.check()?;

        let resolved = match self
            .resolver
            .resolve(&email.metadata.namespace, &email.spec.sender_config_ref)
            .await
        {
            Ok(resolved) => resolved,
            Err(ResolveError::Store(e)) => return Err(e.into()),
            Err(e) => {
                warn!("Could not resolve sender for {key}: {e}");
                return Ok(Outcome::Failed(DeliveryFailure::Resolve(e)));
            }
        };

        let (kind, adapter) = match self
            .providers
            .select(&[
                email.spec.provider.as_str(),
                resolved.config.spec.provider.as_str(),
            ])
        {
            Ok(selected) => selected,
            Err(e) => {
                warn!("{e} for {key}");
                return Ok(Outcome::Failed(DeliveryFailure::Unsupported(e)));
            }
        };

        let message = compose(email, &resolved);
        let timeout = self.config.send_timeout();
        let email_key = key.to_string();

        ctx.check()?;

        self.audit
            .delivery_attempt(&email_key, adapter.name(), &email.spec.recipient_email);
        outgoing!(level = DEBUG, "Sending {key} through {kind}");

        let started = Instant::now();
        let result = tokio::time::timeout(
            timeout,
            adapter.send(&message, &resolved.credential, timeout),
        )
        .await
        .unwrap_or(Err(ProviderError::Timeout(timeout)))
        .and_then(|receipt| {
            if receipt.message_id.is_empty() {
                Err(ProviderError::Other(format!(
                    "{} accepted the message without a message id",
                    receipt.provider
                )))
            } else {
                Ok(receipt)
            }
        });

        match result {
            Ok(receipt) => {
                self.audit.delivery_success(
                    &email_key,
                    receipt.provider,
                    &email.spec.recipient_email,
                    &receipt.message_id,
                    started.elapsed().as_millis(),
                );
                Ok(Outcome::Sent(receipt))
            }
            Err(e) => {
                let failure = DeliveryFailure::Provider(e);
                warn!(
                    "Sending {key} through {kind} failed ({}): {failure}",
                    failure.class()
                );
                self.audit.delivery_failure(
                    &email_key,
                    adapter.name(),
                    &failure.to_string(),
                    failure.is_permanent(),
                );
                Ok(Outcome::Failed(failure))
            }
        }
    }
}

fn compose(email: &EmailIntent, resolved: &Resolved) -> OutboundMessage {
    OutboundMessage {
        from: Mailbox::new(
            resolved.credential.from_address.clone(),
            resolved.config.spec.from_name.clone().unwrap_or_default(),
        ),
        to: vec![Mailbox::new(email.spec.recipient_email.clone(), "")],
        subject: email.spec.subject.clone(),
        text: email.spec.body.clone(),
        html: email.spec.body.clone(),
    }
}

#[async_trait]
impl Reconciler for EmailReconciler {
    fn kind(&self) -> Kind {
        Kind::Email
    }

    async fn reconcile(
        &self,
        key: &ResourceKey,
        ctx: &ReconcileContext,
    ) -> Result<Action, ReconcileError> {
        self.reconcile_email(key, ctx).await
    }
}
