#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use herald_common::{
    EmailIntent, EmailSpec, EmailStatus, ObjectMeta, ResourceKey, Secret, SenderConfig,
    SenderConfigSpec, audit::AuditLog,
};
use herald_provider::{ProviderKind, Providers, SimulatedConfig, SimulatedProvider};
use herald_reconcile::{EmailReconciler, ReconcilerConfig, SenderConfigReconciler};
use herald_store::{ResourceStore, ResourceStoreExt, TestStore};

pub const NAMESPACE: &str = "default";
pub const EMAIL: &str = "sample-email";
pub const SENDER: &str = "sample-senderconfig";
pub const SECRET: &str = "mailersend-token";
pub const MESSAGE_ID: &str = "simulated-message-id";

pub struct Harness {
    pub store: TestStore,
    pub provider: Arc<SimulatedProvider>,
    pub reconciler: EmailReconciler,
    pub sender_reconciler: SenderConfigReconciler,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_provider(SimulatedProvider::new(&SimulatedConfig::default()))
    }

    pub fn with_provider(provider: SimulatedProvider) -> Self {
        let store = TestStore::new();
        let provider = Arc::new(provider);
        let providers = Providers::new(ProviderKind::Simulated)
            .with(ProviderKind::Simulated, Arc::clone(&provider) as _);
        let shared: Arc<dyn ResourceStore> = Arc::new(store.clone());

        Self {
            reconciler: EmailReconciler::new(
                Arc::clone(&shared),
                providers,
                AuditLog::default(),
                ReconcilerConfig::default(),
            ),
            sender_reconciler: SenderConfigReconciler::new(shared, ReconcilerConfig::default()),
            store,
            provider,
        }
    }

    pub fn email_key() -> ResourceKey {
        ResourceKey::new(NAMESPACE, EMAIL)
    }

    pub fn sender_key() -> ResourceKey {
        ResourceKey::new(NAMESPACE, SENDER)
    }

    pub async fn add_email(&self, name: &str) {
        self.store
            .apply(sample_email(name).into())
            .await
            .expect("email");
    }

    pub async fn add_email_with_status(&self, name: &str, status: EmailStatus) {
        let mut email = sample_email(name);
        email.status = status;
        self.store.apply(email.into()).await.expect("email");
    }

    pub async fn add_sender_config(&self) {
        self.store
            .apply(sample_sender_config().into())
            .await
            .expect("sender config");
    }

    pub async fn add_secret(&self, api_token: &str, from_email: &str) {
        self.store
            .apply(secret(api_token, from_email).into())
            .await
            .expect("secret");
    }

    pub async fn add_valid_secret(&self) {
        self.store
            .apply(valid_secret().into())
            .await
            .expect("secret");
    }

    /// Email, sender config and a decodable secret
    pub async fn happy_path(&self) {
        self.add_email(EMAIL).await;
        self.add_sender_config().await;
        self.add_valid_secret().await;
    }

    pub async fn email(&self, name: &str) -> EmailIntent {
        self.store
            .fetch(&ResourceKey::new(NAMESPACE, name))
            .await
            .expect("email exists")
    }

    pub async fn sender_config(&self) -> SenderConfig {
        self.store
            .fetch(&Self::sender_key())
            .await
            .expect("sender config exists")
    }
}

pub fn sample_sender_config() -> SenderConfig {
    SenderConfig {
        metadata: ObjectMeta::new(NAMESPACE, SENDER),
        spec: SenderConfigSpec {
            api_token_secret_ref: SECRET.to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn secret(api_token: &str, from_email: &str) -> Secret {
    Secret {
        metadata: ObjectMeta::new(NAMESPACE, SECRET),
        data: [
            (Secret::API_TOKEN.to_string(), api_token.to_string()),
            (Secret::FROM_EMAIL.to_string(), from_email.to_string()),
        ]
        .into_iter()
        .collect(),
    }
}

pub fn valid_secret() -> Secret {
    secret(
        &STANDARD.encode("mlsn.test-token"),
        &STANDARD.encode("sender@example.com"),
    )
}

pub fn sample_email(name: &str) -> EmailIntent {
    EmailIntent::new(
        ObjectMeta::new(NAMESPACE, name),
        EmailSpec {
            recipient_email: "recipient@example.com".to_string(),
            subject: "Sample Email".to_string(),
            body: "This is a sample email.".to_string(),
            sender_config_ref: SENDER.to_string(),
            ..Default::default()
        },
    )
}
