use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use herald_common::{Credential, ResourceKey, Secret, SenderConfig, internal};
use herald_store::{ResourceStore, ResourceStoreExt, StoreError};

use crate::ResolveError;

/// A sender config together with the credential it points at
#[derive(Debug, Clone)]
pub struct Resolved {
    pub config: SenderConfig,
    pub credential: Credential,
}

/// Looks up sender configs and decodes their credentials.
///
/// Every call goes back to the store; nothing is cached between reconciles.
#[derive(Debug, Clone)]
pub struct Resolver {
    store: Arc<dyn ResourceStore>,
}

impl Resolver {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    /// Resolve `name` in `namespace` to a sender config and its credential
    ///
    /// # Errors
    /// `SenderConfigNotFound` when the config is missing, any credential error
    /// from [`Resolver::credential`], or `Store` for other store failures
    pub async fn resolve(&self, namespace: &str, name: &str) -> Result<Resolved, ResolveError> {
        let key = ResourceKey::new(namespace, name);
        let config: SenderConfig = self.store.fetch(&key).await.map_err(|e| {
            if e.is_not_found() {
                ResolveError::SenderConfigNotFound(key.clone())
            } else {
                ResolveError::Store(e)
            }
        })?;

        let credential = self.credential(&config).await?;

        Ok(Resolved { config, credential })
    }

    /// Fetch and decode the credential a sender config references
    ///
    /// # Errors
    /// If the reference is empty, the secret is missing, or a field is absent
    /// or malformed
    pub async fn credential(&self, config: &SenderConfig) -> Result<Credential, ResolveError> {
        let secret_ref = config.spec.api_token_secret_ref.trim();
        if secret_ref.is_empty() {
            return Err(ResolveError::MissingSecretRef(config.metadata.key()));
        }

        let key = ResourceKey::new(config.metadata.namespace.clone(), secret_ref);
        let secret: Secret = self
            .store
            .fetch(&key)
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => ResolveError::CredentialNotFound(key.clone()),
                other => ResolveError::Store(other),
            })?;

        let credential = Credential {
            auth_token: decode_field(&secret, Secret::API_TOKEN)?,
            from_address: decode_field(&secret, Secret::FROM_EMAIL)?,
        };

        internal!(level = DEBUG, "Resolved credential from {key}");

        Ok(credential)
    }
}

fn decode_field(secret: &Secret, field: &'static str) -> Result<String, ResolveError> {
    let missing = || ResolveError::MissingField {
        secret: secret.metadata.key(),
        field,
    };

    let raw = secret.data.get(field).ok_or_else(missing)?;
    let bytes = STANDARD
        .decode(raw.trim())
        .map_err(|source| ResolveError::Decode { field, source })?;
    let value = String::from_utf8(bytes).map_err(|_| ResolveError::InvalidUtf8 { field })?;

    let value = value.trim();
    if value.is_empty() {
        return Err(missing());
    }

    Ok(value.to_string())
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use herald_common::{ObjectMeta, SenderConfigSpec};
    use herald_store::MemoryStore;

    use super::*;

    async fn store_with(data: &[(&str, String)]) -> Arc<dyn ResourceStore> {
        let store = MemoryStore::new();
        store
            .apply(
                SenderConfig {
                    metadata: ObjectMeta::new("default", "sender"),
                    spec: SenderConfigSpec {
                        api_token_secret_ref: "token".to_string(),
                        ..Default::default()
                    },
                    ..Default::default()
                }
                .into(),
            )
            .await
            .expect("config");
        store
            .apply(
                Secret {
                    metadata: ObjectMeta::new("default", "token"),
                    data: data
                        .iter()
                        .map(|(k, v)| ((*k).to_string(), v.clone()))
                        .collect(),
                }
                .into(),
            )
            .await
            .expect("secret");
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_resolves_and_decodes() {
        let store = store_with(&[
            ("api-token", STANDARD.encode("mlsn.abc")),
            ("from-email", STANDARD.encode("sender@example.com")),
        ])
        .await;

        let resolved = Resolver::new(store)
            .resolve("default", "sender")
            .await
            .expect("resolved");

        assert_eq!(resolved.credential.auth_token, "mlsn.abc");
        assert_eq!(resolved.credential.from_address, "sender@example.com");
        assert_eq!(resolved.config.metadata.name, "sender");
    }

    #[tokio::test]
    async fn test_missing_config_is_distinct() {
        let store = store_with(&[]).await;
        let error = Resolver::new(store)
            .resolve("default", "other")
            .await
            .expect_err("missing");

        assert!(matches!(error, ResolveError::SenderConfigNotFound(_)));
        assert_eq!(error.to_string(), "EmailSenderConfig not found");
    }

    #[tokio::test]
    async fn test_config_in_other_namespace_is_not_found() {
        let store = store_with(&[]).await;
        let error = Resolver::new(store)
            .resolve("elsewhere", "sender")
            .await
            .expect_err("missing");

        assert!(matches!(error, ResolveError::SenderConfigNotFound(_)));
    }

    #[tokio::test]
    async fn test_malformed_base64() {
        let store = store_with(&[
            ("api-token", "%%% not base64 %%%".to_string()),
            ("from-email", STANDARD.encode("sender@example.com")),
        ])
        .await;

        let error = Resolver::new(store)
            .resolve("default", "sender")
            .await
            .expect_err("malformed");

        assert!(matches!(error, ResolveError::Decode { field: "api-token", .. }));
        assert!(error.is_credential());
    }

    #[tokio::test]
    async fn test_missing_field() {
        let store = store_with(&[("api-token", STANDARD.encode("mlsn.abc"))]).await;

        let error = Resolver::new(store)
            .resolve("default", "sender")
            .await
            .expect_err("missing field");

        assert!(matches!(
            error,
            ResolveError::MissingField {
                field: "from-email",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_non_utf8() {
        let store = store_with(&[
            ("api-token", STANDARD.encode([0xff_u8, 0xfe])),
            ("from-email", STANDARD.encode("sender@example.com")),
        ])
        .await;

        let error = Resolver::new(store)
            .resolve("default", "sender")
            .await
            .expect_err("not utf-8");

        assert!(matches!(error, ResolveError::InvalidUtf8 { field: "api-token" }));
    }

    #[tokio::test]
    async fn test_missing_secret() {
        let store = MemoryStore::new();
        let config = SenderConfig {
            metadata: ObjectMeta::new("default", "sender"),
            spec: SenderConfigSpec {
                api_token_secret_ref: "absent".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        let error = Resolver::new(Arc::new(store))
            .credential(&config)
            .await
            .expect_err("missing");

        assert!(matches!(error, ResolveError::CredentialNotFound(_)));
    }
}
