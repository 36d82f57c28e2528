//! Which keys a watch event makes stale.
//!
//! - `Email`: the email itself
//! - `EmailSenderConfig`: the config, and every email in its namespace
//!   referencing it
//! - `Secret`: every config in its namespace referencing it, and their emails

use herald_common::{EmailIntent, Kind, ResourceKey, SenderConfig};
use herald_store::{ResourceStore, ResourceStoreExt, StoreError, WatchEvent};

/// Keys to enqueue, per kind
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Targets {
    pub emails: Vec<ResourceKey>,
    pub sender_configs: Vec<ResourceKey>,
}

/// Work out which objects need reconciling after `event`
///
/// # Errors
/// If the dependents cannot be listed
pub async fn targets<S: ResourceStore + ?Sized>(
    store: &S,
    event: &WatchEvent,
) -> Result<Targets, StoreError> {
    let mut targets = Targets::default();
    let namespace = event.key.namespace.as_str();

    match event.kind {
        Kind::Email => targets.emails.push(event.key.clone()),
        Kind::SenderConfig => {
            targets.sender_configs.push(event.key.clone());
            targets.emails = emails_using(store, namespace, &[event.key.name.as_str()]).await?;
        }
        Kind::Secret => {
            let configs: Vec<SenderConfig> = store.fetch_all(Some(namespace)).await?;
            let using: Vec<&SenderConfig> = configs
                .iter()
                .filter(|config| config.spec.api_token_secret_ref == event.key.name)
                .collect();

            let names: Vec<&str> = using.iter().map(|c| c.metadata.name.as_str()).collect();
            targets.emails = emails_using(store, namespace, &names).await?;
            targets.sender_configs = using.iter().map(|c| c.metadata.key()).collect();
        }
    }

    Ok(targets)
}

async fn emails_using<S: ResourceStore + ?Sized>(
    store: &S,
    namespace: &str,
    config_names: &[&str],
) -> Result<Vec<ResourceKey>, StoreError> {
    if config_names.is_empty() {
        return Ok(Vec::new());
    }

    let emails: Vec<EmailIntent> = store.fetch_all(Some(namespace)).await?;
    Ok(emails
        .into_iter()
        .filter(|email| config_names.contains(&email.spec.sender_config_ref.as_str()))
        .map(|email| email.metadata.key())
        .collect())
}
